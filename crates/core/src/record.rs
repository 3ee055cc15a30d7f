use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::amount::Amount;

/// Value of the receipt flag column: an OCR'd image is itself the receipt.
pub const RECEIPT_FLAG: &str = "Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Cad,
    Aud,
    Inr,
    Brl,
    Pen,
    Cny,
}

impl Currency {
    pub const ALL: [Currency; 10] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Cad,
        Currency::Aud,
        Currency::Inr,
        Currency::Brl,
        Currency::Pen,
        Currency::Cny,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
            Currency::Inr => "INR",
            Currency::Brl => "BRL",
            Currency::Pen => "PEN",
            Currency::Cny => "CNY",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == s)
            .ok_or_else(|| format!("Unknown currency code: '{s}'"))
    }
}

/// Structured fields recovered from one receipt image.
///
/// Every field is best-effort; an empty value means "not found" and is left
/// for the reviewer to fill in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub date: String,
    pub description: String,
    pub local_amount: Option<Amount>,
    pub currency: Option<Currency>,
}

impl ReceiptRecord {
    /// Reserved for manual entry.
    pub fn expense_type(&self) -> &str {
        ""
    }

    /// Reserved for manual entry.
    pub fn project(&self) -> &str {
        ""
    }

    pub fn receipt_flag(&self) -> &str {
        RECEIPT_FLAG
    }

    pub fn local_amount_text(&self) -> String {
        self.local_amount.map(|a| a.to_string()).unwrap_or_default()
    }

    pub fn currency_text(&self) -> String {
        self.currency.map(|c| c.code().to_string()).unwrap_or_default()
    }
}
