use reimburse_core::{column_index, column_letter};
use std::fmt;
use std::str::FromStr;

use crate::error::SheetsError;

/// A rectangular A1-notation range, e.g. `'Trip 1'!A19:F21`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub worksheet: Option<String>,
    /// 1-based column indices.
    pub start_col: u32,
    pub end_col: u32,
    /// 1-based row numbers.
    pub start_row: u32,
    pub end_row: u32,
}

impl CellRange {
    pub fn new(
        worksheet: Option<&str>,
        start_col: u32,
        start_row: u32,
        end_col: u32,
        end_row: u32,
    ) -> Self {
        Self { worksheet: worksheet.map(str::to_string), start_col, end_col, start_row, end_row }
    }

    pub fn rows(&self) -> u32 {
        self.end_row + 1 - self.start_row
    }

    pub fn columns(&self) -> u32 {
        self.end_col + 1 - self.start_col
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ws) = &self.worksheet {
            write!(f, "'{}'!", ws.replace('\'', "''"))?;
        }
        write!(
            f,
            "{}{}:{}{}",
            column_letter(self.start_col),
            self.start_row,
            column_letter(self.end_col),
            self.end_row
        )
    }
}

fn parse_cell(cell: &str) -> Option<(u32, u32)> {
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    let col = column_index(letters).ok()?;
    let row: u32 = digits.parse().ok()?;
    (row > 0).then_some((col, row))
}

impl FromStr for CellRange {
    type Err = SheetsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SheetsError::InvalidRange(s.to_string());
        let (worksheet, cells) = match s.rsplit_once('!') {
            Some((ws, cells)) => {
                let ws = ws
                    .strip_prefix('\'')
                    .and_then(|w| w.strip_suffix('\''))
                    .map(|w| w.replace("''", "'"))
                    .unwrap_or_else(|| ws.to_string());
                (Some(ws), cells)
            }
            None => (None, s),
        };
        let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
        let (start_col, start_row) = parse_cell(start).ok_or_else(invalid)?;
        let (end_col, end_row) = parse_cell(end).ok_or_else(invalid)?;
        if end_col < start_col || end_row < start_row {
            return Err(invalid());
        }
        Ok(CellRange { worksheet, start_col, end_col, start_row, end_row })
    }
}
