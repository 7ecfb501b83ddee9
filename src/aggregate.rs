use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::domain::{AggregatedRow, TransactionRecord};
use crate::error::PipelineError;
use crate::regions;

/// Collapses transactions into one row per (town, month) bucket.
///
/// The derived metric is the truncated integer price per square metre,
/// averaged across the bucket with the mean truncated toward zero as well.
/// Truncating twice mirrors the published artifact's integer schema and is
/// a deliberate simplification.
pub fn aggregate(
    records: &[TransactionRecord],
    expected_towns: usize,
) -> Result<Vec<AggregatedRow>, PipelineError> {
    let towns: BTreeSet<&str> = records.iter().map(|r| r.town.as_str()).collect();
    if towns.len() != expected_towns {
        return Err(PipelineError::TownCardinality {
            expected: expected_towns,
            actual: towns.len(),
        });
    }

    let mut buckets: BTreeMap<(String, String), Vec<i64>> = BTreeMap::new();
    for record in records {
        let value = price_per_sqm(record)?;
        buckets
            .entry((record.town.clone(), record.month.clone()))
            .or_default()
            .push(value);
    }

    let mut rows = Vec::with_capacity(buckets.len());
    for ((town, month), values) in buckets {
        let mean = values.iter().sum::<i64>() as f64 / values.len() as f64;
        let category = regions::category_of(&town);
        if category == regions::UNKNOWN_CATEGORY {
            warn!("unknown category for {town}");
        }
        rows.push(AggregatedRow {
            date: format!("{month}-01"),
            name: town,
            value: mean as i64,
            category: category.to_string(),
        });
    }
    Ok(rows)
}

fn price_per_sqm(record: &TransactionRecord) -> Result<i64, PipelineError> {
    let price = parse_field(record, "resale_price", &record.resale_price)?;
    let area = parse_field(record, "floor_area_sqm", &record.floor_area_sqm)?;
    if area == 0.0 {
        // A zero area is corrupt input, not a row to skip.
        return Err(PipelineError::ZeroFloorArea {
            town: record.town.clone(),
            month: record.month.clone(),
        });
    }
    Ok((price / area) as i64)
}

fn parse_field(
    record: &TransactionRecord,
    field: &str,
    value: &str,
) -> Result<f64, PipelineError> {
    value
        .parse::<f64>()
        .map_err(|_| PipelineError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
            town: record.town.clone(),
            month: record.month.clone(),
        })
}
