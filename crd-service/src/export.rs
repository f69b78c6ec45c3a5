use rust_xlsxwriter::Workbook;

use crd_sdk::export::{COLUMNS, SHEET_NAME, export_rows};
use crd_sdk::upcoming::UpcomingRecord;

use crate::error::AppError;

/// Serialize the upcoming window into a single-sheet workbook with the
/// binding column projection, returning the raw `.xlsx` bytes.
pub fn write_workbook(window: &[UpcomingRecord]) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name(SHEET_NAME)
        .map_err(|e| AppError::Export(format!("invalid sheet name: {e}")))?;

    for (col, name) in COLUMNS.iter().enumerate() {
        sheet
            .write_string(0, col as u16, *name)
            .map_err(|e| AppError::Export(format!("failed to write header: {e}")))?;
    }

    for (i, row) in export_rows(window).iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            sheet
                .write_string((i + 1) as u32, col as u16, cell)
                .map_err(|e| AppError::Export(format!("failed to write row {}: {e}", i + 1)))?;
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| AppError::Export(format!("failed to serialize workbook: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crd_sdk::records::ClientRecord;

    fn entry(id: &str, instant: &str) -> UpcomingRecord {
        UpcomingRecord {
            record: ClientRecord {
                id: id.to_string(),
                created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
                first_name: Some("Ada".into()),
                last_name: Some("Smith".into()),
                phone: None,
                email: None,
                called_on: None,
                bop_date: Some(instant.to_string()),
                bop_status: Some("Confirmed".into()),
                followup_date: None,
                follow_up_status: None,
                product: None,
                issued: None,
                comment: None,
                remark: None,
            },
            bop_instant: instant.parse().unwrap(),
        }
    }

    #[test]
    fn test_workbook_bytes_look_like_a_zip() {
        let window = vec![entry("r1", "2024-01-02T10:00:00Z")];
        let bytes = write_workbook(&window).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_window_still_produces_a_workbook() {
        let bytes = write_workbook(&[]).unwrap();
        assert!(!bytes.is_empty());
    }
}
