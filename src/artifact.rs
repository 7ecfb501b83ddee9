use camino::Utf8Path;
use tracing::info;

use crate::domain::AggregatedRow;
use crate::error::PipelineError;
use crate::store::DataDirectory;

/// Serializes the aggregated rows to the fixed `date,name,value,category`
/// schema, writing the primary artifact atomically and duplicating it
/// verbatim to the publish path. An empty row set fails the run: a missing
/// artifact is diagnosable, an empty one silently breaks the front-end.
pub fn write_artifact(
    rows: &[AggregatedRow],
    primary: &Utf8Path,
    publish: &Utf8Path,
) -> Result<(), PipelineError> {
    if rows.is_empty() {
        return Err(PipelineError::EmptyArtifact(primary.to_string()));
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| PipelineError::Filesystem(format!("serialize artifact: {err}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| PipelineError::Filesystem(format!("flush artifact: {err}")))?;

    DataDirectory::write_bytes_atomic(primary, &bytes)?;
    info!("race data written to {primary}");
    DataDirectory::copy_file_atomic(primary, publish)?;
    info!("race data published to {publish}");
    Ok(())
}

/// Parses an artifact back into rows. Used by consumers that re-read the
/// published CSV and by round-trip tests.
pub fn read_artifact(path: &Utf8Path) -> Result<Vec<AggregatedRow>, PipelineError> {
    let mut reader = csv::Reader::from_path(path.as_std_path())
        .map_err(|err| PipelineError::Filesystem(format!("open {path}: {err}")))?;
    reader
        .deserialize()
        .collect::<Result<Vec<AggregatedRow>, _>>()
        .map_err(|err| PipelineError::Filesystem(format!("parse {path}: {err}")))
}
