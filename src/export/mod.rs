//! Delimited export of the year-by-year comparison ledger.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{Verdict, YearSnapshot};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV buffer error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV output was not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// One exported row, rounded to whole currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(rename = "Year")]
    pub year: u32,
    #[serde(rename = "Better")]
    pub better: Verdict,
    #[serde(rename = "Buy_NWI")]
    pub buy_net_worth_impact: i64,
    #[serde(rename = "Rent_NWI")]
    pub rent_net_worth_impact: i64,
    #[serde(rename = "Diff_BuyMinusRent")]
    pub difference: i64,
    #[serde(rename = "Buy_Equity")]
    pub buy_equity: i64,
    #[serde(rename = "Buy_OOP")]
    pub buy_out_of_pocket: i64,
    #[serde(rename = "Rent_Equity")]
    pub rent_equity: i64,
    #[serde(rename = "Rent_OOP")]
    pub rent_out_of_pocket: i64,
}

impl From<&YearSnapshot> for SnapshotRecord {
    fn from(row: &YearSnapshot) -> Self {
        Self {
            year: row.year,
            better: row.verdict,
            buy_net_worth_impact: row.buy_net_worth_impact.round() as i64,
            rent_net_worth_impact: row.rent_net_worth_impact.round() as i64,
            difference: row.difference.round() as i64,
            buy_equity: row.buy_equity.round() as i64,
            buy_out_of_pocket: row.buy_out_of_pocket.round() as i64,
            rent_equity: row.rent_equity.round() as i64,
            rent_out_of_pocket: row.rent_out_of_pocket.round() as i64,
        }
    }
}

/// Serializes snapshots to CSV, one row per snapshot in year order.
pub fn write_csv(rows: &[YearSnapshot]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(SnapshotRecord::from(row))?;
    }
    writer.flush()?;

    let bytes = writer
        .into_inner()
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Parses a previously exported document back into records.
pub fn read_csv(data: &str) -> Result<Vec<SnapshotRecord>, ExportError> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}
