use tracing::info;

use crate::catalog::Catalog;
use crate::domain::TransactionRecord;
use crate::error::PipelineError;
use crate::store::DataDirectory;

const REQUIRED_COLUMNS: [&str; 4] = ["month", "town", "floor_area_sqm", "resale_price"];

/// Reads every cached extract named by the catalog and concatenates the
/// rows in catalog order, so output is reproducible across runs and
/// platforms. Refuses to proceed if any expected file is absent: partial
/// coverage must fail before aggregation, not after.
pub fn load_all(
    store: &DataDirectory,
    catalog: &Catalog,
) -> Result<Vec<TransactionRecord>, PipelineError> {
    let missing: Vec<String> = catalog
        .datasets
        .iter()
        .filter(|entry| !store.content_exists(&entry.id))
        .map(|entry| store.content_path(&entry.id).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingDatasets(missing));
    }

    let mut records = Vec::new();
    for entry in &catalog.datasets {
        let path = store.content_path(&entry.id);
        let mut reader = csv::Reader::from_path(path.as_std_path())
            .map_err(|err| PipelineError::Filesystem(format!("open {path}: {err}")))?;

        // Header-driven lookup: the extracts reorder and add columns across
        // revisions, only the four required ones are contractual.
        let headers = reader
            .headers()
            .map_err(|err| PipelineError::Filesystem(format!("read headers of {path}: {err}")))?
            .clone();
        let mut positions = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, column) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers.iter().position(|header| header == column).ok_or_else(|| {
                PipelineError::MissingColumn {
                    dataset: entry.label.clone(),
                    row: 0,
                    column: column.to_string(),
                }
            })?;
        }
        let [month_at, town_at, area_at, price_at] = positions;

        for (index, row) in reader.records().enumerate() {
            let row =
                row.map_err(|err| PipelineError::Filesystem(format!("read {path}: {err}")))?;
            let field = |position: usize, column: &str| {
                row.get(position)
                    .map(|value| value.to_string())
                    .ok_or_else(|| PipelineError::MissingColumn {
                        dataset: entry.label.clone(),
                        row: index as u64 + 1,
                        column: column.to_string(),
                    })
            };
            records.push(TransactionRecord {
                month: field(month_at, "month")?,
                town: field(town_at, "town")?,
                floor_area_sqm: field(area_at, "floor_area_sqm")?,
                resale_price: field(price_at, "resale_price")?,
            });
        }
        info!("loaded {} ({} rows so far)", entry.label, records.len());
    }

    if let (Some(first), Some(last)) = (
        records.iter().map(|r| r.month.as_str()).min(),
        records.iter().map(|r| r.month.as_str()).max(),
    ) {
        info!("{} records dated from {first} to {last}", records.len());
    }

    Ok(records)
}
