use serde::Serialize;
use tracing::{info, warn};

use crate::api::DataGovClient;
use crate::catalog::Catalog;
use crate::domain::{DatasetId, DownloadStatus};
use crate::error::PipelineError;
use crate::store::{CachedMetadata, DataDirectory};

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Treat every entity as changed regardless of cached tokens.
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Unchanged,
    Downloaded,
    DownloadFailed,
    SkippedUnknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub entity_id: String,
    pub action: SyncAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub collection_changed: bool,
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    pub fn downloads(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.action == SyncAction::Downloaded)
            .count()
    }
}

/// Drives the incremental sync: one collection-level token check fanning out
/// to per-dataset checks, re-downloading content only for datasets whose
/// token moved. Strictly sequential; a failure on one dataset never aborts
/// the others.
pub struct Syncer<'a, C: DataGovClient> {
    store: &'a DataDirectory,
    catalog: &'a Catalog,
    client: &'a C,
}

impl<'a, C: DataGovClient> Syncer<'a, C> {
    pub fn new(store: &'a DataDirectory, catalog: &'a Catalog, client: &'a C) -> Self {
        Self {
            store,
            catalog,
            client,
        }
    }

    pub fn sync_collection(&self, options: SyncOptions) -> Result<SyncReport, PipelineError> {
        self.store.ensure_root()?;
        let collection_id = &self.catalog.collection_id;
        let metadata = self.client.collection_metadata(collection_id)?;

        if !options.force && !self.token_changed(collection_id, &metadata.last_updated_at) {
            info!("collection {collection_id} unchanged, nothing to sync");
            return Ok(SyncReport {
                collection_changed: false,
                outcomes: Vec::new(),
            });
        }

        self.store.store_metadata(
            collection_id,
            &CachedMetadata::new(collection_id, &metadata.last_updated_at, metadata.raw.clone()),
        )?;
        info!(
            "collection {collection_id} changed ({} members)",
            metadata.child_datasets.len()
        );

        let mut outcomes = Vec::new();
        for child in &metadata.child_datasets {
            let Ok(id) = child.parse::<DatasetId>() else {
                warn!("skipping malformed collection member id {child:?}");
                outcomes.push(SyncOutcome {
                    entity_id: child.clone(),
                    action: SyncAction::SkippedUnknown,
                });
                continue;
            };
            if !self.catalog.contains(&id) {
                warn!("skipping unknown collection member {id}");
                outcomes.push(SyncOutcome {
                    entity_id: id.as_str().to_string(),
                    action: SyncAction::SkippedUnknown,
                });
                continue;
            }
            // Remote failures are per-dataset: log and move on so one flaky
            // member cannot starve the rest of the collection.
            let action = match self.sync_dataset(&id, options) {
                Ok(action) => action,
                Err(err) => {
                    warn!("dataset {id} left unsynced: {err}");
                    SyncAction::DownloadFailed
                }
            };
            outcomes.push(SyncOutcome {
                entity_id: id.as_str().to_string(),
                action,
            });
        }

        Ok(SyncReport {
            collection_changed: true,
            outcomes,
        })
    }

    pub fn sync_dataset(
        &self,
        id: &DatasetId,
        options: SyncOptions,
    ) -> Result<SyncAction, PipelineError> {
        self.store.ensure_root()?;
        let label = self.catalog.label_of(id).unwrap_or(id.as_str());
        let metadata = self.client.dataset_metadata(id)?;

        if !options.force && !self.token_changed(id.as_str(), &metadata.last_updated_at) {
            info!("dataset {label} unchanged");
            return Ok(SyncAction::Unchanged);
        }

        // Metadata is persisted before the content fetch. A transient
        // download failure leaves fresh metadata over stale or missing
        // content for one run, which the loader's existence check surfaces;
        // the reverse ordering would re-check a persistently failing
        // dataset forever.
        self.store.store_metadata(
            id.as_str(),
            &CachedMetadata::new(id.as_str(), &metadata.last_updated_at, metadata.raw.clone()),
        )?;

        let poll = self.client.poll_download(id)?;
        let url = match (poll.status, poll.url) {
            (DownloadStatus::Ready, Some(url)) => url,
            (status, url) => {
                warn!(
                    "dataset {label} download not ready: status={} ({}), url={:?}",
                    status, poll.token, url
                );
                return Ok(SyncAction::DownloadFailed);
            }
        };

        info!("downloading {label}");
        let staging = tempfile::Builder::new()
            .prefix("resale-race-download")
            .tempdir_in(self.store.root().as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let temp_path = staging.path().join(format!("{id}.csv"));
        self.client.download(&url, &temp_path)?;

        let temp_path = camino::Utf8PathBuf::from_path_buf(temp_path)
            .map_err(|_| PipelineError::Filesystem("non-utf8 staging path".to_string()))?;
        DataDirectory::copy_file_atomic(&temp_path, &self.store.content_path(id))?;
        info!("dataset {label} {}", DownloadStatus::Fetched);
        Ok(SyncAction::Downloaded)
    }

    fn token_changed(&self, entity_id: &str, remote_token: &str) -> bool {
        match self.store.load_metadata(entity_id) {
            Some(cached) => cached.last_updated_at != remote_token,
            None => true,
        }
    }
}
