//! The binding export projection: which columns a spreadsheet export
//! carries, in which order, and how the artifact is named.

use chrono::NaiveDate;

use crate::records::ClientRecord;
use crate::upcoming::UpcomingRecord;

/// Sheet name inside the exported workbook.
pub const SHEET_NAME: &str = "Upcoming_BOP";

/// Export columns, in binding order: contact fields first, then the
/// editable follow-up fields.
pub const COLUMNS: [&str; 13] = [
    "FirstName",
    "LastName",
    "Phone",
    "Email",
    "CalledOn",
    "BOP_Date",
    "BOP_Status",
    "Followup_Date",
    "FollowUp_Status",
    "Product",
    "Issued",
    "Comment",
    "Remark",
];

/// Deterministic artifact name for the active range.
pub fn export_filename(start: NaiveDate, end: NaiveDate) -> String {
    format!("Upcoming_BOP_{start}_to_{end}.xlsx")
}

/// Project one record into a row of cells in [`COLUMNS`] order; absent
/// fields become empty cells.
pub fn export_row(record: &ClientRecord) -> Vec<String> {
    fn cell(value: &Option<String>) -> String {
        value.clone().unwrap_or_default()
    }
    vec![
        cell(&record.first_name),
        cell(&record.last_name),
        cell(&record.phone),
        cell(&record.email),
        cell(&record.called_on),
        cell(&record.bop_date),
        cell(&record.bop_status),
        cell(&record.followup_date),
        cell(&record.follow_up_status),
        cell(&record.product),
        cell(&record.issued),
        cell(&record.comment),
        cell(&record.remark),
    ]
}

/// Project the whole upcoming window, preserving its order.
pub fn export_rows(window: &[UpcomingRecord]) -> Vec<Vec<String>> {
    window.iter().map(|entry| export_row(&entry.record)).collect()
}
