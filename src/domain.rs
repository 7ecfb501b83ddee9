use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Opaque data.gov.sg dataset key, e.g. `d_2d5ff9ea31397b66239f245f57751537`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetId {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        if !is_valid {
            return Err(PipelineError::InvalidDatasetId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// One raw resale transaction, carried verbatim from the source extract.
/// Numeric fields stay as strings until aggregation so that a bad value
/// fails there, loudly, with row context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub month: String,
    pub town: String,
    pub floor_area_sqm: String,
    pub resale_price: String,
}

/// One output row of the race artifact, uniquely keyed by (name, date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub date: String,
    pub name: String,
    pub value: i64,
    pub category: String,
}

/// Download preparation state machine:
/// {Requested -> Ready -> Fetched} or {Requested -> Failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Requested,
    Ready,
    Fetched,
    Failed,
}

impl DownloadStatus {
    /// Maps the remote `status` token. Only `DOWNLOAD_SUCCESS` authorizes a
    /// content fetch; anything unrecognized counts as failed.
    pub fn from_token(token: &str) -> Self {
        match token {
            "DOWNLOAD_SUCCESS" => DownloadStatus::Ready,
            "DOWNLOAD_IN_PROGRESS" | "PENDING" => DownloadStatus::Requested,
            _ => DownloadStatus::Failed,
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Requested => write!(f, "requested"),
            DownloadStatus::Ready => write!(f, "ready"),
            DownloadStatus::Fetched => write!(f, "fetched"),
            DownloadStatus::Failed => write!(f, "failed"),
        }
    }
}
