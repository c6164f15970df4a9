use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crm_insights::client::ReportFetcher;
use crm_insights::report::normalize::normalize;
use crm_insights::{export, pipeline, ColumnValues, DashboardError};

/// Serves canned report documents, standing in for an authenticated client.
struct CannedFetcher {
    document: Value,
}

#[async_trait]
impl ReportFetcher for CannedFetcher {
    async fn fetch_report(&self, _report_id: &str) -> crm_insights::Result<Value> {
        Ok(self.document.clone())
    }
}

fn sales_by_region_doc() -> Value {
    json!({
        "attributes": { "reportName": "Sales by Region" },
        "reportExtendedMetadata": {
            "detailColumnInfo": {
                "ACCOUNT.NAME": { "label": "Account Name", "dataType": "string" },
                "REGION": { "label": "Region", "dataType": "picklist" },
                "SALES": { "label": "Sales", "dataType": "currency" }
            }
        },
        "factMap": {
            "T!T": {
                "rows": [
                    { "dataCells": [
                        { "label": "Acme" },
                        { "label": "East" },
                        { "value": "150", "label": "USD 150.00" }
                    ] },
                    { "dataCells": [
                        { "label": "Globex" },
                        { "label": "West" },
                        { "value": 99.5, "label": "USD 99.50" }
                    ] }
                ]
            }
        }
    })
}

#[tokio::test]
async fn fetch_normalize_export_flow() -> Result<()> {
    let fetcher = CannedFetcher {
        document: sales_by_region_doc(),
    };

    let (table, summary) = pipeline::fetch_table(&fetcher, "00OPr000002rd0TMAQ").await?;
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.columns, 3);
    assert_eq!(table.column_names(), vec!["Account Name", "Region", "Sales"]);

    // Sales carried numeric values everywhere, so the column coerced
    assert_eq!(
        table.column("Sales").unwrap().values,
        ColumnValues::Numeric(vec![Some(150.0), Some(99.5)])
    );
    // Region only ever had labels; it stays textual
    assert!(!table.column("Region").unwrap().values.is_numeric());

    // The chart-facing accessor pairs category and value columns
    let series = table.series("Region", "Sales")?;
    assert_eq!(
        series,
        vec![("East".to_string(), 150.0), ("West".to_string(), 99.5)]
    );

    // Export writes a header plus one line per row
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("report.csv");
    let mut file = std::fs::File::create(&path)?;
    export::write_csv(&table, &mut file)?;
    let csv = std::fs::read_to_string(&path)?;
    assert_eq!(
        csv,
        "Account Name,Region,Sales\nAcme,East,150\nGlobex,West,99.5\n"
    );

    Ok(())
}

#[tokio::test]
async fn grouped_report_fails_without_a_partial_table() {
    // A grouped report keys its fact map by group index; there is no "T!T"
    // bucket to read detail rows from.
    let fetcher = CannedFetcher {
        document: json!({
            "reportExtendedMetadata": {
                "detailColumnInfo": { "REGION": { "label": "Region" } }
            },
            "factMap": {
                "0!T": { "aggregates": [ { "value": 249.5 } ] }
            }
        }),
    };

    let err = pipeline::fetch_table(&fetcher, "whatever").await.unwrap_err();
    assert!(matches!(err, DashboardError::Structure(_)));
}

#[test]
fn normalization_is_deterministic_across_calls() {
    let doc = sales_by_region_doc();
    let first = normalize(&doc).unwrap();
    let second = normalize(&doc).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        export::to_csv_string(&first),
        export::to_csv_string(&second)
    );
}

#[test]
fn mixed_column_is_never_partially_coerced() {
    let doc = json!({
        "reportExtendedMetadata": {
            "detailColumnInfo": { "QTY": { "label": "Quantity" } }
        },
        "factMap": { "T!T": { "rows": [
            { "dataCells": [ { "value": "10" } ] },
            { "dataCells": [ { "value": "20" } ] },
            { "dataCells": [ { "value": "abc" } ] }
        ] } }
    });

    let table = normalize(&doc).unwrap();
    assert_eq!(
        table.column("Quantity").unwrap().values,
        ColumnValues::Text(vec![
            Some("10".to_string()),
            Some("20".to_string()),
            Some("abc".to_string()),
        ])
    );
}
