use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::json;

use resale_race::api::{CollectionMetadata, DataGovClient, DatasetMetadata, DownloadPoll};
use resale_race::catalog::{Catalog, DatasetEntry};
use resale_race::domain::{DatasetId, DownloadStatus};
use resale_race::error::PipelineError;
use resale_race::store::DataDirectory;
use resale_race::sync::{SyncAction, SyncOptions, Syncer};

struct MockApi {
    collection_token: String,
    child_ids: Vec<String>,
    dataset_tokens: HashMap<String, String>,
    failing_polls: Vec<String>,
    downloads: Mutex<Vec<String>>,
}

impl MockApi {
    fn new(collection_token: &str, datasets: &[(&str, &str)]) -> Self {
        Self {
            collection_token: collection_token.to_string(),
            child_ids: datasets.iter().map(|(id, _)| id.to_string()).collect(),
            dataset_tokens: datasets
                .iter()
                .map(|(id, token)| (id.to_string(), token.to_string()))
                .collect(),
            failing_polls: Vec::new(),
            downloads: Mutex::new(Vec::new()),
        }
    }

    fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

impl DataGovClient for MockApi {
    fn collection_metadata(&self, id: &str) -> Result<CollectionMetadata, PipelineError> {
        Ok(CollectionMetadata {
            last_updated_at: self.collection_token.clone(),
            child_datasets: self.child_ids.clone(),
            raw: json!({ "data": { "collectionMetadata": { "collectionId": id } } }),
        })
    }

    fn dataset_metadata(&self, id: &DatasetId) -> Result<DatasetMetadata, PipelineError> {
        let token = self
            .dataset_tokens
            .get(id.as_str())
            .ok_or_else(|| PipelineError::ApiStatus {
                status: 404,
                message: format!("no such dataset {id}"),
            })?;
        Ok(DatasetMetadata {
            last_updated_at: token.clone(),
            raw: json!({ "data": { "datasetId": id.as_str() } }),
        })
    }

    fn poll_download(&self, id: &DatasetId) -> Result<DownloadPoll, PipelineError> {
        if self.failing_polls.iter().any(|failing| failing == id.as_str()) {
            return Ok(DownloadPoll {
                status: DownloadStatus::Failed,
                token: "DOWNLOAD_FAILED".to_string(),
                url: None,
            });
        }
        Ok(DownloadPoll {
            status: DownloadStatus::Ready,
            token: "DOWNLOAD_SUCCESS".to_string(),
            url: Some(format!("mock://{id}")),
        })
    }

    fn download(&self, url: &str, destination: &Path) -> Result<(), PipelineError> {
        self.downloads.lock().unwrap().push(url.to_string());
        std::fs::write(
            destination,
            "month,town,floor_area_sqm,resale_price\n2020-01,BEDOK,70,350000\n",
        )
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

fn fixture_catalog(ids: &[&str]) -> Catalog {
    Catalog {
        collection_id: "c_test".to_string(),
        datasets: ids
            .iter()
            .map(|id| DatasetEntry {
                id: id.parse().unwrap(),
                label: format!("extract-{id}"),
            })
            .collect(),
        expected_towns: 1,
    }
}

fn store_in(temp: &tempfile::TempDir) -> DataDirectory {
    let root = Utf8PathBuf::from_path_buf(temp.path().join("data")).unwrap();
    let public = Utf8PathBuf::from_path_buf(temp.path().join("public")).unwrap();
    DataDirectory::new(root, public)
}

#[test]
fn first_sync_downloads_everything() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let catalog = fixture_catalog(&["d_one", "d_two"]);
    let api = MockApi::new("v1", &[("d_one", "t1"), ("d_two", "t1")]);

    let report = Syncer::new(&store, &catalog, &api)
        .sync_collection(SyncOptions::default())
        .unwrap();

    assert!(report.collection_changed);
    assert_eq!(report.downloads(), 2);
    assert_eq!(api.download_count(), 2);
    assert!(store.content_exists(&"d_one".parse().unwrap()));
    assert!(store.content_exists(&"d_two".parse().unwrap()));
}

#[test]
fn second_sync_without_upstream_change_is_a_no_op() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let catalog = fixture_catalog(&["d_one"]);
    let api = MockApi::new("v1", &[("d_one", "t1")]);
    let syncer = Syncer::new(&store, &catalog, &api);

    syncer.sync_collection(SyncOptions::default()).unwrap();
    assert_eq!(api.download_count(), 1);

    let report = syncer.sync_collection(SyncOptions::default()).unwrap();
    assert!(!report.collection_changed);
    assert_eq!(api.download_count(), 1);
}

#[test]
fn only_datasets_with_moved_tokens_are_refetched() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let catalog = fixture_catalog(&["d_one", "d_two"]);

    let api = MockApi::new("v1", &[("d_one", "t1"), ("d_two", "t1")]);
    Syncer::new(&store, &catalog, &api)
        .sync_collection(SyncOptions::default())
        .unwrap();

    // Upstream bumps the collection and one member.
    let api = MockApi::new("v2", &[("d_one", "t2"), ("d_two", "t1")]);
    let report = Syncer::new(&store, &catalog, &api)
        .sync_collection(SyncOptions::default())
        .unwrap();

    assert_eq!(api.download_count(), 1);
    let actions: HashMap<_, _> = report
        .outcomes
        .iter()
        .map(|o| (o.entity_id.as_str(), o.action))
        .collect();
    assert_eq!(actions["d_one"], SyncAction::Downloaded);
    assert_eq!(actions["d_two"], SyncAction::Unchanged);
}

#[test]
fn unknown_collection_member_is_skipped_not_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let catalog = fixture_catalog(&["d_one"]);
    let api = MockApi::new("v1", &[("d_one", "t1"), ("d_mystery", "t1")]);

    let report = Syncer::new(&store, &catalog, &api)
        .sync_collection(SyncOptions::default())
        .unwrap();

    let actions: HashMap<_, _> = report
        .outcomes
        .iter()
        .map(|o| (o.entity_id.as_str(), o.action))
        .collect();
    assert_eq!(actions["d_mystery"], SyncAction::SkippedUnknown);
    assert_eq!(actions["d_one"], SyncAction::Downloaded);
}

#[test]
fn failed_poll_leaves_fresh_metadata_and_no_content() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let catalog = fixture_catalog(&["d_one", "d_two"]);
    let mut api = MockApi::new("v1", &[("d_one", "t1"), ("d_two", "t1")]);
    api.failing_polls.push("d_one".to_string());

    let report = Syncer::new(&store, &catalog, &api)
        .sync_collection(SyncOptions::default())
        .unwrap();

    let actions: HashMap<_, _> = report
        .outcomes
        .iter()
        .map(|o| (o.entity_id.as_str(), o.action))
        .collect();
    assert_eq!(actions["d_one"], SyncAction::DownloadFailed);
    assert_eq!(actions["d_two"], SyncAction::Downloaded);

    // Metadata-first ordering: the token is cached even though content
    // never arrived. The loader-stage existence check must catch this.
    let cached = store.load_metadata("d_one").unwrap();
    assert_eq!(cached.last_updated_at, "t1");
    assert!(!store.content_exists(&"d_one".parse().unwrap()));

    let err = resale_race::loader::load_all(&store, &catalog).unwrap_err();
    assert_matches!(err, PipelineError::MissingDatasets(_));
}

#[test]
fn force_redownloads_with_equal_tokens() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let catalog = fixture_catalog(&["d_one"]);
    let api = MockApi::new("v1", &[("d_one", "t1")]);
    let syncer = Syncer::new(&store, &catalog, &api);

    syncer.sync_collection(SyncOptions::default()).unwrap();
    syncer
        .sync_collection(SyncOptions { force: true })
        .unwrap();

    assert_eq!(api.download_count(), 2);
}

#[test]
fn corrupt_dataset_cache_reads_as_absent_and_resyncs() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let catalog = fixture_catalog(&["d_one"]);
    let api = MockApi::new("v1", &[("d_one", "t1")]);
    let syncer = Syncer::new(&store, &catalog, &api);
    syncer.sync_collection(SyncOptions::default()).unwrap();

    let path = store.metadata_path("d_one");
    std::fs::write(path.as_std_path(), b"{ truncated").unwrap();

    // Collection token moved, dataset token did not; the corrupt cache
    // still forces one extra download, then heals.
    let api = MockApi::new("v2", &[("d_one", "t1")]);
    let syncer = Syncer::new(&store, &catalog, &api);
    syncer.sync_collection(SyncOptions::default()).unwrap();
    assert_eq!(api.download_count(), 1);
    assert_eq!(store.load_metadata("d_one").unwrap().last_updated_at, "t1");
}

#[test]
fn remote_failure_on_one_dataset_does_not_abort_the_rest() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let catalog = fixture_catalog(&["d_missing", "d_two"]);
    // d_missing has no metadata upstream: the mock answers 404.
    let mut api = MockApi::new("v1", &[("d_two", "t1")]);
    api.child_ids.insert(0, "d_missing".to_string());

    let report = Syncer::new(&store, &catalog, &api)
        .sync_collection(SyncOptions::default())
        .unwrap();

    let actions: HashMap<_, _> = report
        .outcomes
        .iter()
        .map(|o| (o.entity_id.as_str(), o.action))
        .collect();
    assert_eq!(actions["d_missing"], SyncAction::DownloadFailed);
    assert_eq!(actions["d_two"], SyncAction::Downloaded);
}
