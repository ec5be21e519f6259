//! Extraction result models - the pipeline's unified output contract.

use serde::{Deserialize, Serialize};

/// Which stage of the pipeline produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Deterministic regex stage over PDF text (the zero-cost path).
    Regex,
    /// Multimodal AI generation call.
    Ai,
}

/// Unified output of the ingestion pipeline.
///
/// Constructed once per `process_file` call and immutable after return.
/// The pipeline never persists it; that is the caller's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Merchant/establishment name, if identified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,

    /// Document date as an ISO-8601 string (UTC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Total amount in BRL, normalized to a plain float.
    pub amount: f64,

    /// Suggested category, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Line items, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LineItem>,

    /// Extraction confidence (0.0 - 1.0).
    pub confidence: f64,

    /// Which stage produced this result.
    pub extraction_method: ExtractionMethod,

    /// Debug payload (raw parsed AI response or matched pattern names).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,

    /// True when the document is a multi-transaction statement.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_multi_transaction: bool,

    /// Individual transactions of a statement, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transactions: Vec<ExtractedTransaction>,

    /// Issuer metadata, populated only for statements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_info: Option<StatementInfo>,
}

/// A single line item on a receipt or invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Item description.
    pub description: String,

    /// Quantity, when stated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,

    /// Unit price, when stated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,

    /// Total price for the line. Always a plain number after normalization.
    pub total_price: f64,
}

/// One transaction line of a credit-card statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTransaction {
    /// Merchant for this transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,

    /// Transaction date (ISO-8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Amount, always a plain number after normalization. May be signed
    /// (refunds are negative or flagged via `is_refund`).
    pub amount: f64,

    /// Suggested category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Installment text as printed, e.g. "Parcela 2 de 12".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installment_info: Option<String>,

    /// Last digits of the card used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last_digits: Option<String>,

    /// True when the line is a refund/chargeback.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_refund: bool,
}

/// Issuer metadata for a multi-transaction statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementInfo {
    /// Issuing institution (bank/card brand).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,

    /// Last digits of the statement's card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last_digits: Option<String>,

    /// Payment due date (ISO-8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,

    /// Statement total.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,

    /// Credit limit, when printed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<f64>,

    /// Billing period start (ISO-8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_start: Option<String>,

    /// Billing period end (ISO-8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<String>,

    /// Card holder name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
}
