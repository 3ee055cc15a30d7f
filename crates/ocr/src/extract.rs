use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use reimburse_core::{Amount, Currency, ExtractConfig, ReceiptRecord};

use crate::types::RecognitionOutput;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_date,
    r"\b(\d{1,2}[/-]\d{1,2}[/-](?:\d{4}|\d{2}))\b");
re!(re_amount,
    r"(?:[$€£]\s?)?\b((?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2})\b");
re!(re_total_word,
    r"(?i)\btotal\b");
re!(re_currency,
    r"\b(USD|EUR|GBP|JPY|CAD|AUD|INR|BRL|PEN|CNY)\b");

// ── Merchant scoring ─────────────────────────────────────────────────────────

/// Receipt metadata words; a line containing any of them is never the merchant.
pub const MERCHANT_STOPLIST: [&str; 14] = [
    "server",
    "check",
    "guest",
    "amount",
    "tip",
    "total",
    "tax",
    "visa",
    "auth",
    "card",
    "transaction",
    "subtotal",
    "date",
    "receipt",
];

/// Score per word; longer lines are more likely a full business name.
pub const WORD_WEIGHT: f32 = 1.0;

/// Score lost per line of distance from the top of the receipt.
pub const POSITION_PENALTY: f32 = 0.3;

/// Merchant-name score for the `index`-th line (0-based), or `None` when the
/// line is blank or contains a stoplist keyword.
pub fn score_line(line: &str, index: usize) -> Option<f32> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let lower = line.to_lowercase();
    if MERCHANT_STOPLIST.iter().any(|k| lower.contains(k)) {
        return None;
    }
    let words = line
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphabetic))
        .count();
    Some(WORD_WEIGHT * words as f32 - POSITION_PENALTY * index as f32)
}

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor {
    merchant_scan_lines: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(&ExtractConfig::default())
    }
}

impl Extractor {
    pub fn new(config: &ExtractConfig) -> Self {
        Self { merchant_scan_lines: config.merchant_scan_lines }
    }

    /// Extract structured fields from one image's recognition output.
    ///
    /// Date, amount and currency are searched in the full-page text first,
    /// then in the merged line list. Missing fields come back empty.
    pub fn extract(&self, output: &RecognitionOutput) -> ReceiptRecord {
        let joined = output.lines.join("\n");

        let date = extract_date(&output.text)
            .or_else(|| extract_date(&joined))
            .unwrap_or_default();
        let local_amount = extract_amount(&output.text).or_else(|| extract_amount(&joined));
        let currency = extract_currency(&output.text).or_else(|| extract_currency(&joined));

        let lines: Vec<&str> = if output.lines.is_empty() {
            output.text.lines().collect()
        } else {
            output.lines.iter().map(String::as_str).collect()
        };
        let description = self.extract_description(&lines);

        ReceiptRecord { date, description, local_amount, currency }
    }

    /// Convenience for single-pass text.
    pub fn extract_text(&self, ocr_text: &str) -> ReceiptRecord {
        self.extract(&RecognitionOutput::from_text(ocr_text))
    }

    // ── Description ───────────────────────────────────────────────────────────

    fn extract_description(&self, lines: &[&str]) -> String {
        let mut best: Option<(f32, &str)> = None;
        for (i, line) in lines.iter().copied().take(self.merchant_scan_lines).enumerate() {
            if let Some(score) = score_line(line, i) {
                // Strictly greater: earlier lines win ties.
                if best.map_or(true, |(b, _)| score > b) {
                    best = Some((score, line));
                }
            }
        }
        match best {
            Some((_, line)) => line.trim().to_string(),
            None => lines
                .iter()
                .find(|l| !l.trim().is_empty())
                .map(|l| l.to_string())
                .unwrap_or_default(),
        }
    }
}

// ── Pattern fields ────────────────────────────────────────────────────────────

/// First `D[D]/D[D]/YY[YY]` (or `-`-separated) run; no calendar validation.
fn extract_date(text: &str) -> Option<String> {
    re_date()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn amounts_in(text: &str) -> impl Iterator<Item = Amount> + '_ {
    re_amount()
        .captures_iter(text)
        .filter_map(|c| Amount::parse_receipt_digits(c.get(1)?.as_str()))
}

/// The amount on the first line mentioning "total", else the largest amount anywhere.
fn extract_amount(text: &str) -> Option<Amount> {
    text.lines()
        .filter(|l| re_total_word().is_match(l))
        .find_map(|l| amounts_in(l).next())
        .or_else(|| amounts_in(text).max())
}

fn extract_currency(text: &str) -> Option<Currency> {
    let c = re_currency().captures(text)?;
    Currency::from_str(c.get(1)?.as_str()).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
