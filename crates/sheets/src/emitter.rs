use reimburse_core::{column_index, ColumnSchema, DestinationConfig, ReceiptRecord};

use crate::error::SheetsError;
use crate::placement::first_open_row;
use crate::range::CellRange;
use crate::writer::{RangeUpdate, SheetWriter, WriteRequest};

/// Where a batch landed on the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitReport {
    pub start_row: u32,
    pub end_row: u32,
    pub count: usize,
    /// Receipt number given to the first record of the batch.
    pub first_receipt_number: u32,
}

/// Lays out records on the destination template and hands them to a writer.
pub struct RecordEmitter {
    schema: ColumnSchema,
    first_data_row: u32,
    date_column: u32,
    placeholders: Vec<String>,
    scan_rows: u32,
    worksheet: Option<String>,
}

impl RecordEmitter {
    pub fn new(config: &DestinationConfig) -> Result<Self, SheetsError> {
        let schema = config.schema.clone().resolve()?;
        Ok(Self {
            schema,
            first_data_row: config.first_data_row,
            date_column: column_index(&config.date_column)?,
            placeholders: config.placeholders.clone(),
            scan_rows: config.scan_rows.max(1),
            worksheet: config.worksheet.clone(),
        })
    }

    /// 1-based sequence number of the `index`-th record of a batch starting at `start_row`.
    pub fn receipt_number(&self, start_row: u32, index: usize) -> u32 {
        start_row.saturating_sub(self.first_data_row) + 1 + index as u32
    }

    /// The date-column window scanned for free rows.
    pub fn placement_range(&self) -> CellRange {
        CellRange::new(
            self.worksheet.as_deref(),
            self.date_column,
            self.first_data_row,
            self.date_column,
            self.first_data_row + self.scan_rows - 1,
        )
    }

    /// One range per schema segment, covering `records.len()` rows from `start_row`.
    pub fn build(
        &self,
        records: &[ReceiptRecord],
        start_row: u32,
    ) -> Result<WriteRequest, SheetsError> {
        if records.is_empty() {
            return Ok(WriteRequest::default());
        }
        let end_row = start_row + records.len() as u32 - 1;
        let mut updates = Vec::with_capacity(self.schema.segments.len());
        for segment in &self.schema.segments {
            let start_col = column_index(&segment.start)?;
            let end_col = column_index(&segment.end()?)?;
            let values: Vec<Vec<String>> = records
                .iter()
                .enumerate()
                .map(|(i, record)| {
                    let number = self.receipt_number(start_row, i);
                    segment.fields.iter().map(|f| f.render(record, number)).collect::<Vec<String>>()
                })
                .collect();
            let range =
                CellRange::new(self.worksheet.as_deref(), start_col, start_row, end_col, end_row);
            updates.push(RangeUpdate { range: range.to_string(), values });
        }
        Ok(WriteRequest { updates })
    }

    /// Find the first free template row, then write `records` contiguously from there.
    pub async fn emit<W: SheetWriter>(
        &self,
        writer: &W,
        records: &[ReceiptRecord],
    ) -> Result<EmitReport, SheetsError> {
        let window = self.placement_range();
        let cells = writer.read_column(&window.to_string()).await?;
        let start_row = first_open_row(&cells, self.first_data_row, &self.placeholders, self.scan_rows)
            .ok_or_else(|| SheetsError::NoFreeRow(window.to_string()))?;

        let report = EmitReport {
            start_row,
            end_row: start_row + (records.len() as u32).saturating_sub(1),
            count: records.len(),
            first_receipt_number: self.receipt_number(start_row, 0),
        };
        if records.is_empty() {
            return Ok(report);
        }

        let request = self.build(records, start_row)?;
        tracing::info!(
            start_row = report.start_row,
            end_row = report.end_row,
            ranges = request.updates.len(),
            "writing receipts"
        );
        writer.write(&request).await?;
        Ok(report)
    }
}
