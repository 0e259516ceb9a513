use chrono::{DateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Per-lock checkout configuration, keyed by lock address in the paywall config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_payments: Option<RecurringPayments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_inputs: Option<Vec<MetadataInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_recipients: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_builder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_required: Option<bool>,
}

impl LockConfig {
    /// Overlay every field set in `patch` onto `self`. `order` is never taken from the patch.
    pub fn merged_with(mut self, patch: LockConfig) -> Self {
        if patch.network.is_some() {
            self.network = patch.network;
        }
        if patch.name.is_some() {
            self.name = patch.name;
        }
        if patch.recurring_payments.is_some() {
            self.recurring_payments = patch.recurring_payments;
        }
        if patch.metadata_inputs.is_some() {
            self.metadata_inputs = patch.metadata_inputs;
        }
        if patch.max_recipients.is_some() {
            self.max_recipients = patch.max_recipients;
        }
        if patch.recipient.is_some() {
            self.recipient = patch.recipient;
        }
        if patch.data_builder.is_some() {
            self.data_builder = patch.data_builder;
        }
        if patch.email_required.is_some() {
            self.email_required = patch.email_required;
        }
        self
    }
}

/// Number of automatic renewals, or unlimited (`"forever"` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurringPayments {
    Count(u64),
    Forever,
}

impl Serialize for RecurringPayments {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            RecurringPayments::Count(n) => s.serialize_u64(*n),
            RecurringPayments::Forever => s.serialize_str("forever"),
        }
    }
}

impl<'de> Deserialize<'de> for RecurringPayments {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_u64()
                .map(RecurringPayments::Count)
                .ok_or_else(|| D::Error::custom(format!("invalid recurring payments count: {n}"))),
            Value::String(s) => s.parse().map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "expected a number or \"forever\", got {other}"
            ))),
        }
    }
}

impl std::str::FromStr for RecurringPayments {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("forever") {
            return Ok(Self::Forever);
        }
        s.parse::<u64>()
            .map(Self::Count)
            .map_err(|_| format!("recurring payments must be a number or \"forever\": {s}"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataInputType {
    #[default]
    Text,
    Date,
    Color,
    Email,
    Url,
    Hidden,
    Checkbox,
    Tel,
}

/// An extra field collected from the buyer at checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub public: bool,
    #[serde(rename = "type", default)]
    pub input_type: MetadataInputType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchaser: Option<Purchaser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<SupplierProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptDetails>,
}

impl ReceiptResponse {
    pub fn is_empty(&self) -> bool {
        self.receipt.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReceiptNumber {
    Number(u64),
    Text(String),
}

impl fmt::Display for ReceiptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiptNumber::Number(n) => write!(f, "{n}"),
            ReceiptNumber::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDetails {
    /// Transaction hash.
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_transferred: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<ReceiptNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_address: Option<String>,
}

/// Billing details of the buyer. Unknown fields are carried through on save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchaser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A lock manager's billing identity ("receipts base").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_performed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Stored remotely. Always serialized so that clearing the rate is sent as `null`.
    #[serde(default)]
    pub vat_basis_points_rate: Option<u32>,
    /// Derived locally from the basis points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_rate_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Success,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub status: JobStatus,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub result: Vec<String>,
}

/// Background receipts export job reported by the receipts status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub payload: JobPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.payload.status.is_terminal()
    }
}

/// A lock as listed by the indexer for a manager account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSummary {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
}
