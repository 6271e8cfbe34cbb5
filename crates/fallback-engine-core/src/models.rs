//! Request/response types and the per-attempt processor outcome.
//!
//! `ProcessorResult` is naturally a tagged union over
//! `{Success(fee), Soft(code), Hard(code), RateLimited, Timeout, CircuitOpen}`;
//! we use a status enum plus discipline instead, matching the teacher's
//! `CircuitState`-as-plain-enum style rather than modelling each variant's
//! payload as a separate struct.

use std::collections::HashMap;
use std::time::SystemTime;

/// One of the three currencies this engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Currency {
    BRL,
    USD,
    MXN,
}

/// A validated, immutable payment request.
///
/// Construct via [`TransactionRequest::validate`] rather than the bare
/// struct literal outside this crate's tests — validation is not re-checked
/// once a value exists.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TransactionRequest {
    pub transaction_id: String,
    pub amount: Decimal2,
    pub currency: Currency,
    pub merchant_id: String,
    pub card_last_four: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A decimal value fixed at 2 fractional digits, stored as integer cents.
///
/// Chosen over a floating point field so fee computation (`amount * fee_rate`,
/// rounded to 2 digits) is exact and reproducible rather than dependent on
/// binary floating point rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Decimal2 {
    cents: i64,
}

impl Decimal2 {
    pub const ZERO: Decimal2 = Decimal2 { cents: 0 };

    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn cents(self) -> i64 {
        self.cents
    }

    pub fn to_f64(self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Multiplies by a fraction and rounds half-away-from-zero to 2 digits,
    /// the "banker-neutral" rounding the spec calls for on fee computation.
    pub fn mul_rate(self, rate: f64) -> Decimal2 {
        let product = self.cents as f64 * rate;
        Decimal2::from_cents(product.round() as i64)
    }
}

impl TryFrom<f64> for Decimal2 {
    type Error = std::convert::Infallible;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Ok(Decimal2::from_cents((value * 100.0).round() as i64))
    }
}

impl From<Decimal2> for f64 {
    fn from(value: Decimal2) -> Self {
        value.to_f64()
    }
}

impl std::fmt::Display for Decimal2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.to_f64())
    }
}

/// Reasons a [`TransactionRequest`] fails the constraints of the data model.
/// Surfaced only at the HTTP boundary; the core engine never raises this.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("transaction_id must be 1-64 chars of alphanumerics, '-' or '_'")]
    InvalidTransactionId,
    #[error("amount must be > 0 and <= 1_000_000.00")]
    InvalidAmount,
    #[error("merchant_id must be 1-64 chars of alphanumerics, '-' or '_'")]
    InvalidMerchantId,
    #[error("card_last_four must be exactly 4 decimal digits")]
    InvalidCardLastFour,
    #[error("metadata serializes to more than 1024 bytes")]
    MetadataTooLarge,
}

fn is_id_charset(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 64
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl TransactionRequest {
    /// Checks every constraint in the data model (§3) and returns the first
    /// violation found. Field order mirrors the spec's declaration order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_id_charset(&self.transaction_id) {
            return Err(ValidationError::InvalidTransactionId);
        }
        if self.amount.cents() <= 0 || self.amount.cents() > 1_000_000_00 {
            return Err(ValidationError::InvalidAmount);
        }
        if !is_id_charset(&self.merchant_id) {
            return Err(ValidationError::InvalidMerchantId);
        }
        if self.card_last_four.len() != 4 || !self.card_last_four.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError::InvalidCardLastFour);
        }
        let serialized =
            serde_json::to_vec(&self.metadata).map_err(|_| ValidationError::MetadataTooLarge)?;
        if serialized.len() > 1024 {
            return Err(ValidationError::MetadataTooLarge);
        }
        Ok(())
    }
}

/// Terminal or transient classification of a single decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineType {
    Soft,
    Hard,
    RateLimit,
}

impl std::fmt::Display for DeclineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeclineType::Soft => write!(f, "soft"),
            DeclineType::Hard => write!(f, "hard"),
            DeclineType::RateLimit => write!(f, "rate_limit"),
        }
    }
}

/// Outcome of a single attempt to charge a processor.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ProcessorStatus {
    Success,
    SoftDecline,
    HardDecline,
    RateLimited,
    Timeout,
    /// Synthesized by the engine when a breaker rejects the call. A
    /// processor implementation must never return this variant (§6.2).
    CircuitOpen,
}

impl ProcessorStatus {
    pub fn as_tag(&self) -> &'static str {
        match self {
            ProcessorStatus::Success => "success",
            ProcessorStatus::SoftDecline => "soft_decline",
            ProcessorStatus::HardDecline => "hard_decline",
            ProcessorStatus::RateLimited => "rate_limited",
            ProcessorStatus::Timeout => "timeout",
            ProcessorStatus::CircuitOpen => "circuit_open",
        }
    }

    /// Whether this outcome counts as a breaker failure (everything except
    /// success and the engine-synthesized circuit-open bypass).
    pub fn is_breaker_failure(&self) -> bool {
        !matches!(self, ProcessorStatus::Success | ProcessorStatus::CircuitOpen)
    }
}

/// Result of one `charge` call, produced by a processor (except
/// `CircuitOpen`, which the engine synthesizes itself).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProcessorResult {
    pub processor_name: String,
    pub status: ProcessorStatus,
    pub amount: Decimal2,
    pub fee: Option<Decimal2>,
    pub fee_rate: Option<f64>,
    pub decline_code: Option<String>,
    pub decline_type: Option<DeclineType>,
    pub latency_ms: u64,
    pub raw_response: Option<String>,
}

impl ProcessorResult {
    pub fn success(name: &str, amount: Decimal2, fee_rate: f64, latency_ms: u64) -> Self {
        Self {
            processor_name: name.to_string(),
            status: ProcessorStatus::Success,
            amount,
            fee: Some(amount.mul_rate(fee_rate)),
            fee_rate: Some(fee_rate),
            decline_code: None,
            decline_type: None,
            latency_ms,
            raw_response: None,
        }
    }

    pub fn decline(
        name: &str,
        status: ProcessorStatus,
        decline_type: DeclineType,
        code: &str,
        amount: Decimal2,
        latency_ms: u64,
    ) -> Self {
        Self {
            processor_name: name.to_string(),
            status,
            amount,
            fee: None,
            fee_rate: None,
            decline_code: Some(code.to_string()),
            decline_type: Some(decline_type),
            latency_ms,
            raw_response: None,
        }
    }

    pub fn timeout(name: &str, amount: Decimal2, latency_ms: u64) -> Self {
        Self {
            processor_name: name.to_string(),
            status: ProcessorStatus::Timeout,
            amount,
            fee: None,
            fee_rate: None,
            decline_code: None,
            decline_type: None,
            latency_ms,
            raw_response: None,
        }
    }

    pub(crate) fn circuit_open(name: &str, amount: Decimal2) -> Self {
        Self {
            processor_name: name.to_string(),
            status: ProcessorStatus::CircuitOpen,
            amount,
            fee: None,
            fee_rate: None,
            decline_code: None,
            decline_type: None,
            latency_ms: 0,
            raw_response: None,
        }
    }
}

/// Overall terminal outcome of `FallbackEngine::process`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Approved,
    Declined,
}

/// The single terminal result of a `process` call (§3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TransactionResponse {
    pub transaction_id: String,
    pub status: ResponseStatus,
    pub processor_used: Option<String>,
    pub amount: Decimal2,
    pub currency: Currency,
    pub fee: Option<Decimal2>,
    pub fee_rate: Option<f64>,
    pub decline_reason: Option<String>,
    pub decline_type: Option<DeclineType>,
    pub attempts: u32,
    pub processors_tried: Vec<String>,
    pub retry_log: Vec<String>,
    pub latency_ms: u64,
    pub processed_at: SystemTime,
}
