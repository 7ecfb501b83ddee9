use serde::Serialize;
use tracing::info;

use crate::aggregate;
use crate::api::DataGovClient;
use crate::artifact;
use crate::catalog::Catalog;
use crate::error::PipelineError;
use crate::loader;
use crate::store::DataDirectory;
use crate::sync::{SyncOptions, SyncReport, Syncer};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub skip_sync: bool,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub sync: Option<SyncReport>,
    pub records: usize,
    pub rows: usize,
    pub artifact_path: String,
    pub published_path: String,
}

/// The whole fixed pipeline: sync -> load -> aggregate -> write. Owns the
/// store, catalog and remote client; each stage is a plain function over
/// them so the stages stay testable in isolation.
pub struct Pipeline<C: DataGovClient> {
    store: DataDirectory,
    catalog: Catalog,
    client: C,
}

impl<C: DataGovClient> Pipeline<C> {
    pub fn new(store: DataDirectory, catalog: Catalog, client: C) -> Self {
        Self {
            store,
            catalog,
            client,
        }
    }

    pub fn store(&self) -> &DataDirectory {
        &self.store
    }

    pub fn sync(&self, options: SyncOptions) -> Result<SyncReport, PipelineError> {
        Syncer::new(&self.store, &self.catalog, &self.client).sync_collection(options)
    }

    /// Load, aggregate and publish from whatever content is cached on disk.
    pub fn build(&self) -> Result<RunReport, PipelineError> {
        let records = loader::load_all(&self.store, &self.catalog)?;
        let rows = aggregate::aggregate(&records, self.catalog.expected_towns)?;
        info!("{} race data rows", rows.len());

        let primary = self.store.artifact_path();
        let publish = self.store.public_artifact_path();
        artifact::write_artifact(&rows, &primary, &publish)?;

        Ok(RunReport {
            sync: None,
            records: records.len(),
            rows: rows.len(),
            artifact_path: primary.to_string(),
            published_path: publish.to_string(),
        })
    }

    pub fn run(&self, options: RunOptions) -> Result<RunReport, PipelineError> {
        let sync_report = if options.skip_sync {
            None
        } else {
            Some(self.sync(SyncOptions {
                force: options.force,
            })?)
        };
        let mut report = self.build()?;
        report.sync = sync_report;
        Ok(report)
    }
}
