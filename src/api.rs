use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::domain::{DatasetId, DownloadStatus};
use crate::error::PipelineError;

/// Remote metadata for one collection: the opaque version token plus the
/// member dataset ids, in remote order. The raw payload is kept for the
/// on-disk metadata cache.
#[derive(Debug, Clone)]
pub struct CollectionMetadata {
    pub last_updated_at: String,
    pub child_datasets: Vec<String>,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct DatasetMetadata {
    pub last_updated_at: String,
    pub raw: Value,
}

/// Result of the download-preparation poll. `status` is the parsed state
/// machine position; `token` preserves the remote string for logging.
#[derive(Debug, Clone)]
pub struct DownloadPoll {
    pub status: DownloadStatus,
    pub token: String,
    pub url: Option<String>,
}

pub trait DataGovClient: Send + Sync {
    fn collection_metadata(&self, id: &str) -> Result<CollectionMetadata, PipelineError>;
    fn dataset_metadata(&self, id: &DatasetId) -> Result<DatasetMetadata, PipelineError>;
    fn poll_download(&self, id: &DatasetId) -> Result<DownloadPoll, PipelineError>;
    fn download(&self, url: &str, destination: &Path) -> Result<(), PipelineError>;
}

#[derive(Clone)]
pub struct DataGovHttpClient {
    client: Client,
    base_url: String,
}

impl DataGovHttpClient {
    pub fn new() -> Result<Self, PipelineError> {
        Self::with_base_url("https://api-production.data.gov.sg/v2/public/api".to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("resale-race/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PipelineError::ApiHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| PipelineError::ApiHttp(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn fetch_json(&self, url: &str) -> Result<Value, PipelineError> {
        let response = self.send_with_retries(|| self.client.get(url))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "data.gov.sg request failed".to_string());
            return Err(PipelineError::ApiStatus { status, message });
        }
        response
            .json()
            .map_err(|err| PipelineError::ApiHttp(err.to_string()))
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, PipelineError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(PipelineError::ApiHttp(err.to_string()));
                }
            }
        }
    }
}

impl DataGovClient for DataGovHttpClient {
    fn collection_metadata(&self, id: &str) -> Result<CollectionMetadata, PipelineError> {
        let url = format!("{}/collections/{}/metadata", self.base_url, id);
        let raw = self.fetch_json(&url)?;
        parse_collection_metadata(raw)
    }

    fn dataset_metadata(&self, id: &DatasetId) -> Result<DatasetMetadata, PipelineError> {
        let url = format!("{}/datasets/{}/metadata", self.base_url, id);
        let raw = self.fetch_json(&url)?;
        parse_dataset_metadata(raw)
    }

    fn poll_download(&self, id: &DatasetId) -> Result<DownloadPoll, PipelineError> {
        let url = format!("{}/datasets/{}/poll-download", self.base_url, id);
        let raw = self.fetch_json(&url)?;
        parse_download_poll(raw)
    }

    fn download(&self, url: &str, destination: &Path) -> Result<(), PipelineError> {
        let mut response = self.send_with_retries(|| self.client.get(url))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "content download failed".to_string());
            return Err(PipelineError::ApiStatus { status, message });
        }
        let mut file =
            File::create(destination).map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

fn data_object(raw: &Value) -> Result<&Value, PipelineError> {
    raw.get("data")
        .ok_or_else(|| PipelineError::ApiPayload("missing data envelope".to_string()))
}

fn string_field(value: &Value, field: &str) -> Result<String, PipelineError> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| PipelineError::ApiPayload(format!("missing field {field}")))
}

pub fn parse_collection_metadata(raw: Value) -> Result<CollectionMetadata, PipelineError> {
    let body = data_object(&raw)?
        .get("collectionMetadata")
        .ok_or_else(|| PipelineError::ApiPayload("missing collectionMetadata".to_string()))?;
    let last_updated_at = string_field(body, "lastUpdatedAt")?;
    let child_datasets = body
        .get("childDatasets")
        .and_then(|v| v.as_array())
        .map(|array| {
            array
                .iter()
                .filter_map(|v| v.as_str())
                .map(|v| v.to_string())
                .collect()
        })
        .unwrap_or_default();
    Ok(CollectionMetadata {
        last_updated_at,
        child_datasets,
        raw,
    })
}

pub fn parse_dataset_metadata(raw: Value) -> Result<DatasetMetadata, PipelineError> {
    let body = data_object(&raw)?;
    let last_updated_at = string_field(body, "lastUpdatedAt")?;
    Ok(DatasetMetadata {
        last_updated_at,
        raw,
    })
}

pub fn parse_download_poll(raw: Value) -> Result<DownloadPoll, PipelineError> {
    let body = data_object(&raw)?;
    let token = string_field(body, "status")?;
    let url = body
        .get("url")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .filter(|v| !v.is_empty());
    Ok(DownloadPoll {
        status: DownloadStatus::from_token(&token),
        token,
        url,
    })
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
