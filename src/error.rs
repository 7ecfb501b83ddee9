use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("invalid dataset id: {0}")]
    InvalidDatasetId(String),

    #[error("failed to read catalog file at {0}")]
    CatalogRead(PathBuf),

    #[error("failed to parse catalog JSON: {0}")]
    CatalogParse(String),

    #[error("data.gov.sg request failed: {0}")]
    ApiHttp(String),

    #[error("data.gov.sg returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("unexpected data.gov.sg payload: {0}")]
    ApiPayload(String),

    #[error("missing dataset files: {}", .0.join(", "))]
    MissingDatasets(Vec<String>),

    #[error("dataset {dataset} row {row} is missing required column {column}")]
    MissingColumn {
        dataset: String,
        row: u64,
        column: String,
    },

    #[error("unparseable {field} value {value:?} for {town} {month}")]
    InvalidNumber {
        field: String,
        value: String,
        town: String,
        month: String,
    },

    #[error("zero floor area for {town} {month}; refusing to derive price per sqm")]
    ZeroFloorArea { town: String, month: String },

    #[error("expected {expected} distinct towns, found {actual}")]
    TownCardinality { expected: usize, actual: usize },

    #[error("refusing to write empty artifact to {0}")]
    EmptyArtifact(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
