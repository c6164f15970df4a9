use super::coerce::try_coerce_column;
use super::{Column, FlatTable};
use crate::error::{DashboardError, Result};
use serde_json::Value;
use tracing::{debug, warn};

/// Fact-map bucket under which non-grouped tabular reports place all of
/// their detail rows.
pub const DETAIL_FACT_KEY: &str = "T!T";

/// Converts a raw analytics report document into a [`FlatTable`].
///
/// Column names come from the `label` of each `detailColumnInfo` descriptor,
/// in document order and without deduplication; each row cell takes `value`
/// when present and non-null, falling back to `label`, else null. Columns are
/// then coerced to numeric all-or-nothing per column.
///
/// Documents missing the column metadata or the detail row bucket (grouped
/// and summary-only reports, among others) fail with a structure error; no
/// partial table is ever returned. Pure function of its input.
pub fn normalize(raw: &Value) -> Result<FlatTable> {
    let names = column_labels(raw)?;
    let rows = detail_rows(raw, names.len())?;
    debug!(
        "Normalizing report: {} columns, {} detail rows",
        names.len(),
        rows.len()
    );

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells = rows.iter().map(|row| row[idx].clone()).collect();
            Column {
                name,
                values: try_coerce_column(cells),
            }
        })
        .collect();

    Ok(FlatTable { columns })
}

/// Column labels in metadata order. The metadata map is keyed by internal
/// column ids; only the human-readable labels survive into the table.
fn column_labels(raw: &Value) -> Result<Vec<String>> {
    let info = raw
        .get("reportExtendedMetadata")
        .and_then(|m| m.get("detailColumnInfo"))
        .and_then(|v| v.as_object())
        .ok_or_else(|| {
            DashboardError::Structure(
                "missing reportExtendedMetadata.detailColumnInfo".to_string(),
            )
        })?;

    let mut labels = Vec::with_capacity(info.len());
    for (key, descriptor) in info {
        let label = descriptor
            .get("label")
            .and_then(|l| l.as_str())
            .ok_or_else(|| {
                DashboardError::Structure(format!("column descriptor '{key}' has no label"))
            })?;
        labels.push(label.to_string());
    }
    Ok(labels)
}

/// Raw cell values of every detail row, positionally aligned to the columns.
///
/// Rows whose cell count disagrees with the column count are padded with
/// nulls or truncated, uniformly, so positional alignment always holds.
fn detail_rows(raw: &Value, n_columns: usize) -> Result<Vec<Vec<Option<Value>>>> {
    let rows = raw
        .get("factMap")
        .and_then(|m| m.get(DETAIL_FACT_KEY))
        .and_then(|bucket| bucket.get("rows"))
        .and_then(|r| r.as_array())
        .ok_or_else(|| {
            DashboardError::Structure(format!(
                "missing factMap.\"{DETAIL_FACT_KEY}\".rows; not a non-grouped tabular report"
            ))
        })?;

    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let data_cells = row
            .get("dataCells")
            .and_then(|c| c.as_array())
            .ok_or_else(|| DashboardError::Structure(format!("detail row {i} has no dataCells")))?;

        let mut cells: Vec<Option<Value>> = data_cells.iter().map(cell_value).collect();
        if cells.len() != n_columns {
            warn!(
                "Detail row {} has {} cells for {} columns; realigning",
                i,
                cells.len(),
                n_columns
            );
            cells.resize(n_columns, None);
        }
        out.push(cells);
    }
    Ok(out)
}

/// Cell selection: `value` if present and non-null, else `label`, else null.
fn cell_value(cell: &Value) -> Option<Value> {
    match cell.get("value") {
        Some(v) if !v.is_null() => Some(v.clone()),
        _ => match cell.get("label") {
            Some(l) if !l.is_null() => Some(l.clone()),
            _ => None,
        },
    }
}
