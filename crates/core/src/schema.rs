//! Destination column layouts.
//!
//! The spreadsheet template decides which columns receive which field. A
//! layout is a versioned list of segments, each a run of adjacent columns,
//! so formula columns between segments are never written.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::ReceiptRecord;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unknown column schema version: '{0}'")]
    UnknownVersion(String),
    #[error("Invalid column letter: '{0}'")]
    InvalidColumn(String),
    #[error("Column segment starting at {0} has no fields")]
    EmptySegment(String),
    #[error("Column segments overlap at column {0}")]
    Overlap(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ReceiptNumber,
    Date,
    Description,
    ExpenseType,
    LocalAmount,
    Currency,
    Project,
    ReceiptFlag,
}

impl Field {
    /// Cell text for this field of `record`, which is the `receipt_number`-th receipt on the sheet.
    pub fn render(self, record: &ReceiptRecord, receipt_number: u32) -> String {
        match self {
            Field::ReceiptNumber => receipt_number.to_string(),
            Field::Date => record.date.clone(),
            Field::Description => record.description.clone(),
            Field::ExpenseType => record.expense_type().to_string(),
            Field::LocalAmount => record.local_amount_text(),
            Field::Currency => record.currency_text(),
            Field::Project => record.project().to_string(),
            Field::ReceiptFlag => record.receipt_flag().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSegment {
    /// First column letter, e.g. `"A"`.
    pub start: String,
    pub fields: Vec<Field>,
}

impl ColumnSegment {
    pub fn new(start: &str, fields: &[Field]) -> Self {
        Self { start: start.to_string(), fields: fields.to_vec() }
    }

    /// Letter of the last column written by this segment.
    pub fn end(&self) -> Result<String, SchemaError> {
        let start = column_index(&self.start)?;
        let width = self.fields.len() as u32;
        if width == 0 {
            return Err(SchemaError::EmptySegment(self.start.clone()));
        }
        Ok(column_letter(start + width - 1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub version: String,
    /// Left empty in config files to pick the preset named by `version`.
    #[serde(default)]
    pub segments: Vec<ColumnSegment>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self::split_v2()
    }
}

impl ColumnSchema {
    /// Columns A-F and I-J; G and H hold template formulas.
    pub fn split_v2() -> Self {
        use Field::*;
        Self {
            version: "split-v2".to_string(),
            segments: vec![
                ColumnSegment::new(
                    "A",
                    &[ReceiptNumber, Date, Description, ExpenseType, LocalAmount, Currency],
                ),
                ColumnSegment::new("I", &[Project, ReceiptFlag]),
            ],
        }
    }

    /// Four columns B-E, no receipt number or currency.
    pub fn compact_v1() -> Self {
        use Field::*;
        Self {
            version: "compact-v1".to_string(),
            segments: vec![ColumnSegment::new("B", &[Date, Description, ExpenseType, LocalAmount])],
        }
    }

    pub fn preset(version: &str) -> Result<Self, SchemaError> {
        match version {
            "split-v2" => Ok(Self::split_v2()),
            "compact-v1" => Ok(Self::compact_v1()),
            other => Err(SchemaError::UnknownVersion(other.to_string())),
        }
    }

    /// Fill in preset segments when only a version was given, then validate.
    pub fn resolve(self) -> Result<Self, SchemaError> {
        let schema = if self.segments.is_empty() { Self::preset(&self.version)? } else { self };
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut spans = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            let start = column_index(&seg.start)?;
            let end = column_index(&seg.end()?)?;
            spans.push((start, end));
        }
        spans.sort_unstable();
        for pair in spans.windows(2) {
            if pair[1].0 <= pair[0].1 {
                return Err(SchemaError::Overlap(column_letter(pair[1].0)));
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.segments.iter().flat_map(|s| s.fields.iter().copied())
    }
}

/// 1-based index of a column letter: `A` = 1, `Z` = 26, `AA` = 27.
pub fn column_index(letters: &str) -> Result<u32, SchemaError> {
    if letters.is_empty() || letters.len() > 3 {
        return Err(SchemaError::InvalidColumn(letters.to_string()));
    }
    letters.chars().try_fold(0u32, |acc, c| {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return Err(SchemaError::InvalidColumn(letters.to_string()));
        }
        Ok(acc * 26 + (c as u32 - 'A' as u32 + 1))
    })
}

/// Inverse of [`column_index`].
pub fn column_letter(mut index: u32) -> String {
    let mut out = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        out.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    out.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::record::Currency;

    fn full_record() -> ReceiptRecord {
        ReceiptRecord {
            date: "03/14/2024".into(),
            description: "Joe's Coffee Shop".into(),
            local_amount: Amount::parse_receipt_digits("13.50"),
            currency: Some(Currency::Usd),
        }
    }

    #[test]
    fn column_letters_roundtrip() {
        assert_eq!(column_index("A").unwrap(), 1);
        assert_eq!(column_index("j").unwrap(), 10);
        assert_eq!(column_index("AA").unwrap(), 27);
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(28), "AB");
        assert!(column_index("A1").is_err());
        assert!(column_index("").is_err());
    }

    #[test]
    fn split_layout_spans_a_to_f_and_i_to_j() {
        let s = ColumnSchema::split_v2();
        assert_eq!(s.segments[0].end().unwrap(), "F");
        assert_eq!(s.segments[1].start, "I");
        assert_eq!(s.segments[1].end().unwrap(), "J");
        s.validate().unwrap();
    }

    #[test]
    fn compact_layout_spans_b_to_e() {
        let s = ColumnSchema::compact_v1();
        assert_eq!(s.segments.len(), 1);
        assert_eq!(s.segments[0].end().unwrap(), "E");
        assert!(!s.fields().any(|f| f == Field::Currency));
    }

    #[test]
    fn resolve_fills_preset_from_version() {
        let s = ColumnSchema { version: "compact-v1".into(), segments: vec![] }.resolve().unwrap();
        assert_eq!(s, ColumnSchema::compact_v1());

        let err = ColumnSchema { version: "v9".into(), segments: vec![] }.resolve().unwrap_err();
        assert_eq!(err, SchemaError::UnknownVersion("v9".into()));
    }

    #[test]
    fn overlapping_segments_rejected() {
        let s = ColumnSchema {
            version: "custom".into(),
            segments: vec![
                ColumnSegment::new("A", &[Field::Date, Field::Description, Field::LocalAmount]),
                ColumnSegment::new("C", &[Field::Currency]),
            ],
        };
        assert_eq!(s.validate().unwrap_err(), SchemaError::Overlap("C".into()));
    }

    #[test]
    fn empty_segment_rejected() {
        let s = ColumnSchema {
            version: "custom".into(),
            segments: vec![ColumnSegment::new("A", &[])],
        };
        assert_eq!(s.validate().unwrap_err(), SchemaError::EmptySegment("A".into()));
    }

    #[test]
    fn render_covers_every_field() {
        let r = full_record();
        let cells: Vec<String> = ColumnSchema::split_v2().fields().map(|f| f.render(&r, 4)).collect();
        assert_eq!(
            cells,
            vec!["4", "03/14/2024", "Joe's Coffee Shop", "", "13.50", "USD", "", "Y"]
        );
    }
}
