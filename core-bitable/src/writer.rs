//! CSV and XLSX writers
//!
//! Both writers receive fully collected rows; the target file is only created
//! once every row is available, so a failed export leaves no partial file.

use std::path::Path;

use rust_xlsxwriter::{DataValidation, Workbook};
use tracing::{debug, warn};

use crate::error::Result;

pub const SHEET_NAME: &str = "Sheet1";

/// Last zero-based row index of an XLSX worksheet
const XLSX_LAST_ROW: u32 = 1_048_575;

const UTF8_BOM: &str = "\u{feff}";

/// Dropdown source for one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDropdown {
    pub column: u16,
    pub options: Vec<String>,
}

/// Header row plus normalized data rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Only honoured by the XLSX writer
    pub dropdowns: Vec<ColumnDropdown>,
}

impl TableData {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            ..Default::default()
        }
    }
}

/// Render the CSV bytes: BOM, header record, one record per row
///
/// Fields are quoted only when they hold a delimiter, quote or line break.
pub fn render_csv(table: &TableData) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(UTF8_BOM.as_bytes().to_vec());

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| std::io::Error::new(e.error().kind(), e.to_string()).into())
}

pub fn write_csv(path: &Path, table: &TableData) -> Result<()> {
    let content = render_csv(table)?;
    std::fs::write(path, content)?;
    debug!(path = %path.display(), rows = table.rows.len(), "Wrote CSV");
    Ok(())
}

pub fn write_xlsx(path: &Path, table: &TableData) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }

    for (index, row) in table.rows.iter().enumerate() {
        let row_number = index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                worksheet.write_string(row_number, col as u16, cell)?;
            }
        }
    }

    for dropdown in &table.dropdowns {
        if dropdown.options.is_empty() {
            continue;
        }

        // Lists longer than the format's 255 character limit are rejected
        let validation = match DataValidation::new()
            .allow_list_strings(dropdown.options.as_slice())
        {
            Ok(validation) => validation,
            Err(e) => {
                warn!(column = dropdown.column, error = %e, "Skipping dropdown");
                continue;
            }
        };

        if let Err(e) = worksheet.add_data_validation(
            1,
            dropdown.column,
            XLSX_LAST_ROW,
            dropdown.column,
            &validation,
        ) {
            warn!(column = dropdown.column, error = %e, "Skipping dropdown");
        }
    }

    workbook.save(path)?;
    debug!(path = %path.display(), rows = table.rows.len(), "Wrote XLSX");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_render_csv_quoting() {
        let mut table = TableData::new(row(&["Note"]));
        table.rows.push(row(&["plain"]));
        table.rows.push(row(&["say \"hi\""]));
        table.rows.push(row(&["line\nbreak"]));
        table.rows.push(row(&[" padded"]));

        let csv = String::from_utf8(render_csv(&table).unwrap()).unwrap();

        assert_eq!(
            csv.trim_start_matches('\u{feff}'),
            "Note\nplain\n\"say \"\"hi\"\"\"\n\"line\nbreak\"\n padded\n"
        );
    }

    #[test]
    fn test_render_csv_has_bom_and_rows() {
        let mut table = TableData::new(row(&["Name", "Tags"]));
        table.rows.push(row(&["Alpha", "Red,Blue"]));
        table.rows.push(row(&["", "x"]));

        let csv = String::from_utf8(render_csv(&table).unwrap()).unwrap();

        assert!(csv.starts_with('\u{feff}'));
        assert_eq!(
            csv.trim_start_matches('\u{feff}'),
            "Name,Tags\nAlpha,\"Red,Blue\"\n,x\n"
        );
    }

    #[test]
    fn test_write_csv_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let table = TableData::new(row(&["Only"]));

        write_csv(&path, &table).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "\u{feff}Only\n");
    }

    #[test]
    fn test_write_xlsx_with_dropdowns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut table = TableData::new(row(&["Name", "Status"]));
        table.rows.push(row(&["Alpha", "Red"]));
        table.dropdowns.push(ColumnDropdown {
            column: 1,
            options: row(&["Red", "Blue"]),
        });

        write_xlsx(&path, &table).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        // XLSX is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_write_xlsx_skips_oversized_dropdown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.xlsx");

        let mut table = TableData::new(row(&["Choice"]));
        table.dropdowns.push(ColumnDropdown {
            column: 0,
            options: (0..100).map(|i| format!("option number {}", i)).collect(),
        });

        write_xlsx(&path, &table).unwrap();
        assert!(path.exists());
    }
}
