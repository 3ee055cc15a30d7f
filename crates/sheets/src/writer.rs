use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::SheetsError;
use crate::range::CellRange;

/// Values for one rectangular range, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeUpdate {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

/// Every range written for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteRequest {
    pub updates: Vec<RangeUpdate>,
}

impl WriteRequest {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// An already-authorized handle to the destination sheet.
#[allow(async_fn_in_trait)]
pub trait SheetWriter {
    /// Values of a single-column range, top to bottom. Trailing blank cells
    /// may be omitted.
    async fn read_column(&self, range: &str) -> Result<Vec<String>, SheetsError>;

    async fn write(&self, request: &WriteRequest) -> Result<(), SheetsError>;
}

/// In-memory sheet keyed by `(column, row)`, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySheet {
    cells: Mutex<BTreeMap<(u32, u32), String>>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one cell, e.g. `sheet.set("B", 19, "03/01/2024")`.
    pub fn set(&self, column: &str, row: u32, value: &str) -> Result<(), SheetsError> {
        let col = reimburse_core::column_index(column)?;
        self.lock()?.insert((col, row), value.to_string());
        Ok(())
    }

    pub fn get(&self, column: &str, row: u32) -> Result<Option<String>, SheetsError> {
        let col = reimburse_core::column_index(column)?;
        Ok(self.lock()?.get(&(col, row)).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<(u32, u32), String>>, SheetsError> {
        self.cells
            .lock()
            .map_err(|e| SheetsError::Unclassified(format!("memory sheet poisoned: {e}")))
    }
}

impl SheetWriter for MemorySheet {
    async fn read_column(&self, range: &str) -> Result<Vec<String>, SheetsError> {
        let r: CellRange = range.parse()?;
        let cells = self.lock()?;
        let mut values: Vec<String> = (r.start_row..=r.end_row)
            .map(|row| cells.get(&(r.start_col, row)).cloned().unwrap_or_default())
            .collect();
        // Match the API: trailing blanks are not returned.
        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    async fn write(&self, request: &WriteRequest) -> Result<(), SheetsError> {
        let mut cells = self.lock()?;
        for update in &request.updates {
            let r: CellRange = update.range.parse()?;
            for (dy, row) in update.values.iter().enumerate() {
                for (dx, value) in row.iter().enumerate() {
                    cells.insert((r.start_col + dx as u32, r.start_row + dy as u32), value.clone());
                }
            }
        }
        Ok(())
    }
}
