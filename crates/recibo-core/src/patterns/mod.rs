//! Deterministic regex extraction over Brazilian financial document text.
//!
//! This is the zero-cost stage of the pipeline: pure functions, no I/O.
//! A weighted confidence score decides whether the result is trusted or
//! the document escalates to the AI stage.

mod regexes;

pub use regexes::*;

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use tracing::debug;

use crate::models::extraction::{ExtractionMethod, ExtractionResult};

/// Per-pattern confidence weights. Currency dominates because the amount
/// is the most commercially important field.
pub const WEIGHT_CNPJ: f64 = 0.20;
pub const WEIGHT_CURRENCY: f64 = 0.40;
pub const WEIGHT_DATE: f64 = 0.20;
pub const WEIGHT_MERCHANT: f64 = 0.15;
pub const WEIGHT_BOLETO: f64 = 0.05;

/// Merchant heuristic scans only the top of the document.
const MERCHANT_SCAN_LINES: usize = 10;

/// Intermediate regex-stage result. Lives only inside the pipeline;
/// it is translated into [`ExtractionResult`] when accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegexExtraction {
    /// Merchant name from the uppercase-header heuristic.
    pub merchant: Option<String>,
    /// First document date, normalized to ISO-8601 UTC midnight.
    pub date: Option<String>,
    /// Largest currency amount found (receipts print the total largest).
    pub amount: Option<f64>,
    /// Issuer CNPJ, first occurrence.
    pub cnpj: Option<String>,
    /// Boleto digit line, whitespace stripped.
    pub boleto_code: Option<String>,
    /// Sum of matched-pattern weights, capped at 1.0.
    pub confidence: f64,
    /// Names of the patterns that matched, in scan order.
    pub matched_patterns: Vec<&'static str>,
}

/// Run the regex stage over a PDF text transcript.
///
/// No matches yields confidence 0 with all fields absent: the caller must
/// treat that as "escalate to AI".
pub fn extract_with_patterns(text: &str) -> RegexExtraction {
    let mut result = RegexExtraction::default();

    if let Some(m) = CNPJ.find(text) {
        result.cnpj = Some(m.as_str().to_string());
        result.matched_patterns.push("cnpj");
    }

    // All amounts are parsed and the maximum kept: the largest amount on a
    // receipt is usually the total. This is policy, not an accident.
    let amounts: Vec<f64> = CURRENCY
        .captures_iter(text)
        .filter_map(|caps| parse_brl_amount(&caps[1]))
        .collect();
    if let Some(max) = amounts.iter().copied().fold(None::<f64>, |acc, v| {
        Some(acc.map_or(v, |a| a.max(v)))
    }) {
        result.amount = Some(max);
        result.matched_patterns.push("currency");
    }

    if let Some(caps) = DATE_BR.captures(text) {
        if let Some(iso) = normalize_brazilian_date(&caps[1], &caps[2], &caps[3]) {
            result.date = Some(iso);
            result.matched_patterns.push("date");
        }
    }

    if let Some(m) = BOLETO_LINE.find(text) {
        let code: String = m.as_str().chars().filter(|c| !c.is_whitespace()).collect();
        result.boleto_code = Some(code);
        result.matched_patterns.push("boleto");
    }

    // First uppercase-header line among the first few lines is the merchant.
    for line in text.lines().take(MERCHANT_SCAN_LINES) {
        if let Some(m) = MERCHANT_HEADER.find(line) {
            result.merchant = Some(m.as_str().trim().to_string());
            result.matched_patterns.push("merchant");
            break;
        }
    }

    result.confidence = result
        .matched_patterns
        .iter()
        .map(|name| pattern_weight(name))
        .sum::<f64>()
        .min(1.0);

    debug!(
        confidence = result.confidence,
        patterns = ?result.matched_patterns,
        "regex stage finished"
    );

    result
}

fn pattern_weight(name: &str) -> f64 {
    match name {
        "cnpj" => WEIGHT_CNPJ,
        "currency" => WEIGHT_CURRENCY,
        "date" => WEIGHT_DATE,
        "merchant" => WEIGHT_MERCHANT,
        "boleto" => WEIGHT_BOLETO,
        _ => 0.0,
    }
}

/// Parse a Brazilian-formatted amount (e.g. "1.250,50").
pub fn parse_brl_amount(s: &str) -> Option<f64> {
    let normalized = s.replace('.', "").replace(',', ".");
    normalized.parse::<f64>().ok()
}

/// Normalize DD/MM/YYYY (or DD-MM-YYYY) captures to ISO-8601 UTC midnight.
pub fn normalize_brazilian_date(day: &str, month: &str, year: &str) -> Option<String> {
    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let year: i32 = year.parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let midnight = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);
    Some(midnight.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl RegexExtraction {
    /// Translate an accepted regex result into the pipeline's output
    /// contract, applying the stage's defaults for absent fields.
    pub fn into_extraction_result(self, now: DateTime<Utc>) -> ExtractionResult {
        let raw_data = serde_json::json!({
            "matchedPatterns": self.matched_patterns,
            "cnpj": self.cnpj,
            "boletoCode": self.boleto_code,
        });

        ExtractionResult {
            merchant: Some(
                self.merchant
                    .unwrap_or_else(|| "Não identificado".to_string()),
            ),
            date: Some(
                self.date
                    .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ),
            amount: self.amount.unwrap_or(0.0),
            category: None,
            items: Vec::new(),
            confidence: self.confidence,
            extraction_method: ExtractionMethod::Regex,
            raw_data: Some(raw_data),
            is_multi_transaction: false,
            transactions: Vec::new(),
            statement_info: None,
        }
    }
}
