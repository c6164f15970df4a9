use super::ColumnValues;
use serde_json::Value;

/// Column-wide, all-or-nothing numeric coercion.
///
/// The column becomes numeric only if every present cell parses as a number;
/// a single unparseable cell keeps the whole column textual. Never fails and
/// never mixes types within a column. A column with no present cells stays
/// textual, since nothing in it says otherwise.
pub fn try_coerce_column(cells: Vec<Option<Value>>) -> ColumnValues {
    let mut numbers = Vec::with_capacity(cells.len());
    let mut any_present = false;

    for cell in &cells {
        match cell {
            None => numbers.push(None),
            Some(v) => match as_number(v) {
                Some(x) => {
                    numbers.push(Some(x));
                    any_present = true;
                }
                None => return ColumnValues::Text(as_text_column(&cells)),
            },
        }
    }

    if any_present {
        ColumnValues::Numeric(numbers)
    } else {
        ColumnValues::Text(as_text_column(&cells))
    }
}

fn as_text_column(cells: &[Option<Value>]) -> Vec<Option<String>> {
    cells.iter().map(|c| c.as_ref().map(render_text)).collect()
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Display form of a raw cell: strings verbatim, anything else via its JSON
/// rendering.
pub(crate) fn render_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
