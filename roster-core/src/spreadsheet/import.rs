use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use super::SpreadsheetError;
use crate::model::RecordId;

const COL_ID: u32 = 0;
const COL_NAME: u32 = 1;
const COL_STATUS: u32 = 2;
/// ID, Name, Status, Created At, Updated At
const COLUMN_COUNT: u32 = 5;

/// One data row of an uploaded sheet. Timestamps in the sheet are ignored;
/// the store assigns its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    /// 1-based row number as shown by spreadsheet applications
    pub row: u32,
    /// `None` when the id cell is blank or zero: the row always creates a record
    pub id: Option<RecordId>,
    pub name: String,
    pub status: bool,
}

/// An uploaded workbook, read sheet by sheet.
pub struct ImportWorkbook {
    inner: Xlsx<Cursor<Vec<u8>>>,
}

impl ImportWorkbook {
    pub fn open(bytes: Vec<u8>) -> Result<Self, SpreadsheetError> {
        let inner: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
        Ok(Self { inner })
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }

    /// Parse the data rows of a sheet, skipping the header row and blank rows.
    pub fn rows(&mut self, sheet: &str) -> Result<Vec<ImportRow>, SpreadsheetError> {
        let range = self.inner.worksheet_range(sheet)?;
        let Some((last_row, _)) = range.end() else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();
        // Row 0 is the header. Positions are absolute so a blank ID column
        // (which shifts the used range to the right) still reads correctly.
        for r in 1..=last_row {
            let cells: Vec<&Data> = (0..COLUMN_COUNT)
                .map(|c| range.get_value((r, c)).unwrap_or(&Data::Empty))
                .collect();
            if cells.iter().all(|cell| is_blank(cell)) {
                continue;
            }

            let at = CellAt { sheet, row: r + 1 };
            rows.push(ImportRow {
                row: r + 1,
                id: at.id(cells[COL_ID as usize])?,
                name: at.text(cells[COL_NAME as usize]),
                status: at.status(cells[COL_STATUS as usize])?,
            });
        }

        Ok(rows)
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Location used for error reporting while converting cells
struct CellAt<'a> {
    sheet: &'a str,
    row: u32,
}

impl CellAt<'_> {
    fn invalid(&self, column: &'static str, reason: String) -> SpreadsheetError {
        SpreadsheetError::InvalidCell {
            sheet: self.sheet.to_owned(),
            row: self.row,
            column,
            reason,
        }
    }

    fn id(&self, cell: &Data) -> Result<Option<RecordId>, SpreadsheetError> {
        let value: i64 = match cell {
            Data::Empty => return Ok(None),
            Data::Int(i) => *i,
            Data::Float(f) if f.fract() == 0.0 => *f as i64,
            Data::String(s) if s.trim().is_empty() => return Ok(None),
            Data::String(s) => s
                .trim()
                .parse()
                .map_err(|_| self.invalid("ID", format!("'{}' is not an integer", s)))?,
            other => return Err(self.invalid("ID", format!("'{}' is not an integer", other))),
        };

        if value == 0 {
            return Ok(None);
        }
        RecordId::try_from(value)
            .map(Some)
            .map_err(|_| self.invalid("ID", format!("{} is out of range", value)))
    }

    fn text(&self, cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn status(&self, cell: &Data) -> Result<bool, SpreadsheetError> {
        match cell {
            Data::Bool(b) => Ok(*b),
            Data::Int(0) => Ok(false),
            Data::Int(1) => Ok(true),
            Data::Float(f) if *f == 0.0 => Ok(false),
            Data::Float(f) if *f == 1.0 => Ok(true),
            Data::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(self.invalid("Status", format!("'{}' is not a boolean", s))),
            },
            Data::Empty => Err(self.invalid("Status", "value is required".to_owned())),
            other => Err(self.invalid("Status", format!("'{}' is not a boolean", other))),
        }
    }
}
