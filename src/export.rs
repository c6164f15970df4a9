use crate::error::Result;
use crate::report::FlatTable;
use std::io::Write;

/// Writes the table as CSV: a header row of column names, then one line per
/// row. Null cells become empty fields.
pub fn write_csv<W: Write>(table: &FlatTable, writer: &mut W) -> Result<()> {
    let header: Vec<String> = table
        .columns
        .iter()
        .map(|c| escape_field(&c.name))
        .collect();
    writeln!(writer, "{}", header.join(","))?;

    for row in 0..table.n_rows() {
        let fields: Vec<String> = table
            .row_text(row)
            .into_iter()
            .map(|cell| escape_field(&cell.unwrap_or_default()))
            .collect();
        writeln!(writer, "{}", fields.join(","))?;
    }
    Ok(())
}

pub fn to_csv_string(table: &FlatTable) -> String {
    let mut buf = Vec::new();
    // Writing to a Vec cannot fail
    write_csv(table, &mut buf).expect("in-memory CSV write");
    String::from_utf8(buf).expect("CSV output is UTF-8")
}

/// RFC 4180 quoting: fields holding the delimiter, a quote or a line break
/// are wrapped in quotes, with embedded quotes doubled.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
