//! Defensive parsing of model output into the extraction contract.
//!
//! The model is asked for exactly one JSON object but is not guaranteed to
//! comply: fenced blocks, prose around the JSON and malformed amounts all
//! occur in practice. Everything that can be absorbed is absorbed here;
//! what cannot becomes a `DocumentParse` error.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{IngestError, Result};
use crate::models::extraction::{
    ExtractedTransaction, ExtractionMethod, ExtractionResult, LineItem, StatementInfo,
};

/// Default confidence assigned to AI results without an explicit score.
const DEFAULT_AI_CONFIDENCE: f64 = 0.9;

/// Parse raw model text into an [`ExtractionResult`].
///
/// Shape selection is an explicit tagged decode on `isMultiTransaction`;
/// payloads matching neither document shape are rejected.
pub fn parse_ai_response(raw: &str) -> Result<ExtractionResult> {
    let cleaned = strip_code_fences(raw);
    let json_text = if cleaned.trim_start().starts_with('{') {
        cleaned.trim()
    } else {
        first_json_object(cleaned).ok_or_else(|| {
            IngestError::DocumentParse("no JSON object found in model output".to_string())
        })?
    };

    let value: Value = serde_json::from_str(json_text)
        .map_err(|e| IngestError::DocumentParse(format!("invalid JSON: {}", e)))?;

    if value.get("isMultiTransaction").and_then(Value::as_bool) == Some(true) {
        let payload: StatementPayload = serde_json::from_value(value.clone())
            .map_err(|e| IngestError::DocumentParse(format!("invalid statement shape: {}", e)))?;
        Ok(payload.into_result(value))
    } else {
        let payload: SinglePayload = serde_json::from_value(value.clone())
            .map_err(|e| IngestError::DocumentParse(format!("invalid document shape: {}", e)))?;
        if payload.is_empty() {
            return Err(IngestError::DocumentParse(
                "response matched neither document shape".to_string(),
            ));
        }
        Ok(payload.into_result(value))
    }
}

/// Coerce any amount field to a plain number.
///
/// Numbers pass through, null/absent become 0, strings are stripped down
/// to digits/comma/dot and parsed Brazilian-style. Parse failure yields 0
/// silently: a wrong amount is recoverable by the user, a failed document
/// is not. This is deliberate policy.
pub fn normalize_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => normalize_amount_str(s),
        Value::Null => 0.0,
        other => {
            warn!(?other, "non-scalar amount in model output, degrading to 0");
            0.0
        }
    }
}

fn normalize_amount_str(s: &str) -> f64 {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    // Brazilian format uses dot thousands and comma decimals.
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };

    match normalized.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            warn!(amount = s, "unparseable amount in model output, degrading to 0");
            0.0
        }
    }
}

/// Strip a Markdown code fence (``` or ```json) wrapping the output.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Extract the first balanced `{...}` block, string- and escape-aware.
fn first_json_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (idx, c) in input.char_indices().skip_while(|(i, _)| *i < start) {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..=idx]);
                }
            }
            _ => {}
        }
    }
    None
}

fn clamp_confidence(value: Option<f64>) -> f64 {
    value.unwrap_or(DEFAULT_AI_CONFIDENCE).clamp(0.0, 1.0)
}

/// Single receipt/invoice shape as produced by the model.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SinglePayload {
    merchant: Option<String>,
    date: Option<String>,
    amount: Option<Value>,
    category: Option<String>,
    #[serde(default)]
    items: Vec<ItemPayload>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemPayload {
    #[serde(default)]
    description: String,
    quantity: Option<f64>,
    unit_price: Option<Value>,
    total_price: Option<Value>,
}

impl SinglePayload {
    /// An object carrying none of the single-document fields matches
    /// neither shape and must be rejected.
    fn is_empty(&self) -> bool {
        self.merchant.is_none()
            && self.date.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.items.is_empty()
    }

    fn into_result(self, raw: Value) -> ExtractionResult {
        ExtractionResult {
            merchant: self.merchant,
            date: self.date,
            amount: self.amount.as_ref().map(normalize_amount).unwrap_or(0.0),
            category: self.category,
            items: self.items.into_iter().map(ItemPayload::into_item).collect(),
            confidence: clamp_confidence(self.confidence),
            extraction_method: ExtractionMethod::Ai,
            raw_data: Some(raw),
            is_multi_transaction: false,
            transactions: Vec::new(),
            statement_info: None,
        }
    }
}

impl ItemPayload {
    fn into_item(self) -> LineItem {
        LineItem {
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price.as_ref().map(normalize_amount),
            total_price: self.total_price.as_ref().map(normalize_amount).unwrap_or(0.0),
        }
    }
}

/// Multi-transaction statement shape as produced by the model.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementPayload {
    #[serde(default)]
    statement_info: Option<StatementInfoPayload>,
    #[serde(default)]
    transactions: Vec<TransactionPayload>,
    confidence: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementInfoPayload {
    institution: Option<String>,
    card_last_digits: Option<String>,
    due_date: Option<String>,
    total_amount: Option<Value>,
    credit_limit: Option<Value>,
    period_start: Option<String>,
    period_end: Option<String>,
    holder_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionPayload {
    merchant: Option<String>,
    date: Option<String>,
    amount: Option<Value>,
    category: Option<String>,
    description: Option<String>,
    installment_info: Option<String>,
    card_last_digits: Option<String>,
    #[serde(default)]
    is_refund: bool,
}

impl StatementPayload {
    fn into_result(self, raw: Value) -> ExtractionResult {
        let info = self.statement_info.unwrap_or_default();
        let statement_info = StatementInfo {
            institution: info.institution.clone(),
            card_last_digits: info.card_last_digits,
            due_date: info.due_date.clone(),
            total_amount: info.total_amount.as_ref().map(normalize_amount),
            credit_limit: info.credit_limit.as_ref().map(normalize_amount),
            period_start: info.period_start,
            period_end: info.period_end,
            holder_name: info.holder_name,
        };

        // Top-level fields mirror the statement summary so single-document
        // consumers still see something sensible.
        ExtractionResult {
            merchant: info.institution,
            date: info.due_date,
            amount: statement_info.total_amount.unwrap_or(0.0),
            category: None,
            items: Vec::new(),
            confidence: clamp_confidence(self.confidence),
            extraction_method: ExtractionMethod::Ai,
            raw_data: Some(raw),
            is_multi_transaction: true,
            transactions: self
                .transactions
                .into_iter()
                .map(TransactionPayload::into_transaction)
                .collect(),
            statement_info: Some(statement_info),
        }
    }
}

impl TransactionPayload {
    fn into_transaction(self) -> ExtractedTransaction {
        ExtractedTransaction {
            merchant: self.merchant,
            date: self.date,
            amount: self.amount.as_ref().map(normalize_amount).unwrap_or(0.0),
            category: self.category,
            description: self.description,
            installment_info: self.installment_info,
            card_last_digits: self.card_last_digits,
            is_refund: self.is_refund,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_plain_single_document() {
        let raw = r#"{"merchant": "Padaria Estrela", "date": "2025-12-03", "amount": 42.5, "category": "Alimentação", "items": [{"description": "Pão francês", "quantity": 10, "unitPrice": 0.85, "totalPrice": 8.5}]}"#;
        let result = parse_ai_response(raw).unwrap();

        assert_eq!(result.merchant.as_deref(), Some("Padaria Estrela"));
        assert_eq!(result.amount, 42.5);
        assert_eq!(result.extraction_method, ExtractionMethod::Ai);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].total_price, 8.5);
        assert!(!result.is_multi_transaction);
        assert!(result.transactions.is_empty());
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "```json\n{\"merchant\": \"Loja X\", \"amount\": 10}\n```";
        let result = parse_ai_response(raw).unwrap();
        assert_eq!(result.merchant.as_deref(), Some("Loja X"));
        assert_eq!(result.amount, 10.0);
    }

    #[test]
    fn extracts_embedded_object_from_prose() {
        let raw = "Claro! Aqui está o resultado: {\"merchant\": \"Loja Y\", \"amount\": \"R$ 5,00\"} espero ter ajudado.";
        let result = parse_ai_response(raw).unwrap();
        assert_eq!(result.merchant.as_deref(), Some("Loja Y"));
        assert_eq!(result.amount, 5.0);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scanner() {
        let raw = "prefix {\"merchant\": \"Bar {do} Zé\", \"amount\": 1}";
        let result = parse_ai_response(raw).unwrap();
        assert_eq!(result.merchant.as_deref(), Some("Bar {do} Zé"));
    }

    #[test]
    fn no_json_at_all_is_a_parse_error() {
        let err = parse_ai_response("desculpe, não consegui ler o documento").unwrap_err();
        assert!(matches!(err, IngestError::DocumentParse(_)));
    }

    #[test]
    fn empty_object_matches_neither_shape() {
        let err = parse_ai_response("{}").unwrap_err();
        assert!(matches!(err, IngestError::DocumentParse(_)));
    }

    #[test]
    fn statement_payload_maps_all_transactions() {
        let raw = json!({
            "isMultiTransaction": true,
            "statementInfo": {
                "institution": "Nubank",
                "cardLastDigits": "4821",
                "dueDate": "2026-01-10",
                "totalAmount": "R$ 2.345,67"
            },
            "transactions": [
                {"merchant": "iFood", "date": "2025-12-01", "amount": 54.9},
                {"merchant": "Posto Shell", "date": "2025-12-03", "amount": "R$ 180,00",
                 "installmentInfo": "Parcela 2 de 12"},
                {"merchant": "Estorno Amazon", "date": "2025-12-05", "amount": 99.9,
                 "isRefund": true}
            ]
        })
        .to_string();

        let result = parse_ai_response(&raw).unwrap();
        assert!(result.is_multi_transaction);
        assert_eq!(result.transactions.len(), 3);
        assert_eq!(result.merchant.as_deref(), Some("Nubank"));
        assert_eq!(result.date.as_deref(), Some("2026-01-10"));
        assert_eq!(result.amount, 2345.67);
        assert_eq!(result.transactions[1].amount, 180.0);
        assert_eq!(
            result.transactions[1].installment_info.as_deref(),
            Some("Parcela 2 de 12")
        );
        assert!(result.transactions[2].is_refund);
        let info = result.statement_info.unwrap();
        assert_eq!(info.institution.as_deref(), Some("Nubank"));
        assert_eq!(info.total_amount, Some(2345.67));
    }

    #[test]
    fn single_document_has_no_statement_fields() {
        let result = parse_ai_response(r#"{"merchant": "Loja Z", "amount": 1}"#).unwrap();
        assert!(!result.is_multi_transaction);
        assert!(result.transactions.is_empty());
        assert!(result.statement_info.is_none());
    }

    #[test]
    fn amount_normalization_is_idempotent_for_numbers() {
        assert_eq!(normalize_amount(&json!(1200.5)), 1200.5);
        assert_eq!(normalize_amount(&json!(0)), 0.0);
    }

    #[test]
    fn amount_normalization_handles_brl_strings() {
        assert_eq!(normalize_amount(&json!("R$ 1.200,50")), 1200.50);
        assert_eq!(normalize_amount(&json!("1200.50")), 1200.50);
        assert_eq!(normalize_amount(&json!("45,90")), 45.90);
    }

    #[test]
    fn amount_normalization_absorbs_garbage() {
        assert_eq!(normalize_amount(&json!("garbage")), 0.0);
        assert_eq!(normalize_amount(&json!(null)), 0.0);
        assert_eq!(normalize_amount(&json!([1, 2])), 0.0);
    }

    #[test]
    fn raw_value_is_preserved_for_debugging() {
        let result = parse_ai_response(r#"{"merchant": "Loja W", "amount": 3}"#).unwrap();
        let raw = result.raw_data.unwrap();
        assert_eq!(raw["merchant"], "Loja W");
    }
}
