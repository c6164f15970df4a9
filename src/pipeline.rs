use crate::client::ReportFetcher;
use crate::error::Result;
use crate::report::{normalize::normalize, FlatTable};
use tracing::info;

/// What a single fetch-and-normalize run produced, for CLI summaries.
#[derive(Debug, Clone)]
pub struct FetchSummary {
    pub report_id: String,
    pub rows: usize,
    pub columns: usize,
}

/// Fetches one report through the given fetcher and normalizes it.
///
/// The raw document is dropped once the table is built; a fresh fetch starts
/// from the API every time.
pub async fn fetch_table(
    fetcher: &dyn ReportFetcher,
    report_id: &str,
) -> Result<(FlatTable, FetchSummary)> {
    let raw = fetcher.fetch_report(report_id).await?;
    let table = normalize(&raw)?;
    let summary = FetchSummary {
        report_id: report_id.to_string(),
        rows: table.n_rows(),
        columns: table.n_columns(),
    };
    info!(
        "Report {} normalized: {} rows, {} columns",
        summary.report_id, summary.rows, summary.columns
    );
    Ok((table, summary))
}
