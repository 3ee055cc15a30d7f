use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A monetary amount as printed on a receipt, without symbol or grouping.
///
/// The recognized scale is kept, so `"13.50"` displays as `13.50`, not `13.5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn from_decimal(decimal: Decimal) -> Self {
        Amount(decimal)
    }

    /// Parse OCR'd digits like `"$1,234.56"`, dropping currency glyphs and grouping commas.
    pub fn parse_receipt_digits(s: &str) -> Option<Self> {
        let clean: String = s
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if clean.is_empty() {
            return None;
        }
        Decimal::from_str(&clean).ok().map(Amount)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
