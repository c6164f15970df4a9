use crate::error::{DashboardError, Result};
use serde::Serialize;

pub mod coerce;
pub mod normalize;

/// The values of one table column, after column-wide type coercion.
///
/// A column is `Numeric` only when every present cell parsed as a number;
/// otherwise every cell keeps its textual rendering. `None` marks cells that
/// carried neither a value nor a label in the raw report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ColumnValues {
    Text(Vec<Option<String>>),
    Numeric(Vec<Option<f64>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Text(v) => v.len(),
            ColumnValues::Numeric(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnValues::Numeric(_))
    }

    /// Textual rendering of one cell; `None` for null cells.
    pub fn text_at(&self, row: usize) -> Option<String> {
        match self {
            ColumnValues::Text(v) => v.get(row).and_then(|c| c.clone()),
            ColumnValues::Numeric(v) => v.get(row).and_then(|c| c.map(format_number)),
        }
    }

    pub fn number_at(&self, row: usize) -> Option<f64> {
        match self {
            ColumnValues::Numeric(v) => v.get(row).and_then(|c| *c),
            ColumnValues::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

/// A normalized tabular report: ordered, positionally aligned columns.
///
/// Column names come straight from the report metadata and may repeat; lookups
/// by name resolve to the first match.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatTable {
    pub columns: Vec<Column>,
}

impl FlatTable {
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// One row as display strings, `None` for null cells.
    pub fn row_text(&self, row: usize) -> Vec<Option<String>> {
        self.columns.iter().map(|c| c.values.text_at(row)).collect()
    }

    /// Pairs a categorical column with a numeric one, the shape a bar/line
    /// chart consumes. Rows where either cell is null are skipped.
    pub fn series(&self, category: &str, value: &str) -> Result<Vec<(String, f64)>> {
        let cat = self
            .column(category)
            .ok_or_else(|| DashboardError::Column(format!("no column named '{category}'")))?;
        let val = self
            .column(value)
            .ok_or_else(|| DashboardError::Column(format!("no column named '{value}'")))?;
        if !val.values.is_numeric() {
            return Err(DashboardError::Column(format!(
                "column '{value}' is not numeric"
            )));
        }

        let mut pairs = Vec::new();
        for row in 0..self.n_rows() {
            if let (Some(c), Some(v)) = (cat.values.text_at(row), val.values.number_at(row)) {
                pairs.push((c, v));
            }
        }
        Ok(pairs)
    }
}

/// Integral floats print without a trailing ".0" so exported values read the
/// way the report showed them.
pub(crate) fn format_number(x: f64) -> String {
    format!("{x}")
}
