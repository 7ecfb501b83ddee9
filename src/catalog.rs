use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::DatasetId;
use crate::error::PipelineError;

/// Ordered allow-list of collection members the pipeline knows how to
/// handle. Injected into the sync coordinator and the loader instead of a
/// global table, so tests can substitute a small fixture set. Dataset order
/// here is the concatenation order of the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub collection_id: String,
    pub datasets: Vec<DatasetEntry>,
    pub expected_towns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub id: DatasetId,
    pub label: String,
}

impl Catalog {
    /// The resale-flat-prices collection on data.gov.sg, restricted to the
    /// extracts from March 2012 onward (26 towns; older extracts carry
    /// towns that no longer transact).
    pub fn hdb_resale() -> Self {
        Self {
            collection_id: "189".to_string(),
            datasets: vec![
                DatasetEntry {
                    id: "d_2d5ff9ea31397b66239f245f57751537".parse().expect("static id"),
                    label: "resale-flat-prices-mar-2012-to-dec-2014".to_string(),
                },
                DatasetEntry {
                    id: "d_ea9ed51da2787afaf8e51f827c304208".parse().expect("static id"),
                    label: "resale-flat-prices-jan-2015-to-dec-2016".to_string(),
                },
                DatasetEntry {
                    id: "d_8b84c4ee58e3cfc0ece0d773c8ca6abc".parse().expect("static id"),
                    label: "resale-flat-prices-jan-2017-onwards".to_string(),
                },
            ],
            expected_towns: 26,
        }
    }

    pub fn load(path: &str) -> Result<Self, PipelineError> {
        let content = fs::read_to_string(path)
            .map_err(|_| PipelineError::CatalogRead(PathBuf::from(path)))?;
        serde_json::from_str(&content).map_err(|err| PipelineError::CatalogParse(err.to_string()))
    }

    pub fn contains(&self, id: &DatasetId) -> bool {
        self.datasets.iter().any(|entry| &entry.id == id)
    }

    pub fn label_of(&self, id: &DatasetId) -> Option<&str> {
        self.datasets
            .iter()
            .find(|entry| &entry.id == id)
            .map(|entry| entry.label.as_str())
    }
}
