use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;

// ============ HubSpot Property Names ============

/// Contact properties written and read by this service.
pub mod properties {
    pub const EMAIL: &str = "email";
    pub const OBJECT_ID: &str = "hs_object_id";
    pub const FIRSTNAME: &str = "firstname";
    pub const LASTNAME: &str = "lastname";

    pub const RESULT: &str = "kickbox_result";
    pub const REASON: &str = "kickbox_reason";
    pub const DISPOSABLE: &str = "kickbox_disposable";
    pub const ACCEPT_ALL: &str = "kickbox_accept_all";
    pub const ROLE: &str = "kickbox_role";
    pub const FREE: &str = "kickbox_free";
    pub const SENDEX: &str = "kickbox_sendex";
    pub const DID_YOU_MEAN: &str = "kickbox_did_you_mean";
    pub const SUCCESS: &str = "kickbox_success";
    pub const EMAIL_NORMALIZED: &str = "kickbox_email_normalized";
    pub const VERIFICATION_DATE: &str = "kickbox_verification_date";
    /// Legacy property still requested by the card; never written.
    pub const VERIFIED_EMAIL: &str = "kickbox_verified_email";

    /// Every `kickbox_*` property the card reads back.
    pub const KICKBOX_ALL: [&str; 12] = [
        RESULT,
        REASON,
        DISPOSABLE,
        ACCEPT_ALL,
        ROLE,
        FREE,
        SENDEX,
        DID_YOU_MEAN,
        SUCCESS,
        EMAIL_NORMALIZED,
        VERIFICATION_DATE,
        VERIFIED_EMAIL,
    ];
}

// ============ Kickbox Models ============

/// Body of `GET /v2/verify` as returned by Kickbox.
///
/// Every field is kept as raw JSON so that a missing or oddly typed field can
/// never fail deserialization; the normalizer decides how each one degrades.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawVerificationResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub reason: Option<Value>,
    #[serde(default)]
    pub role: Option<Value>,
    #[serde(default)]
    pub free: Option<Value>,
    #[serde(default)]
    pub disposable: Option<Value>,
    #[serde(default)]
    pub accept_all: Option<Value>,
    #[serde(default)]
    pub did_you_mean: Option<Value>,
    #[serde(default)]
    pub sendex: Option<Value>,
    /// Provider-normalized address.
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub success: Option<Value>,
    /// Present and truthy when Kickbox rejected the request.
    #[serde(default)]
    pub error: Option<Value>,
}

impl RawVerificationResponse {
    /// Returns the provider-side error when the `error` field is truthy.
    pub fn provider_error(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Rebuilds a raw response from stored contact properties.
    ///
    /// HubSpot hands every value back as a string; the normalizer copes with
    /// that, so the read-back path and the live path share one normalization.
    pub fn from_crm_properties(contact: &CrmContact) -> Self {
        let field = |name: &str| contact.property(name).map(|v| Value::String(v.to_string()));

        Self {
            result: field(properties::RESULT),
            reason: field(properties::REASON),
            role: field(properties::ROLE),
            free: field(properties::FREE),
            disposable: field(properties::DISPOSABLE),
            accept_all: field(properties::ACCEPT_ALL),
            did_you_mean: field(properties::DID_YOU_MEAN),
            sendex: field(properties::SENDEX),
            email: field(properties::EMAIL_NORMALIZED),
            success: field(properties::SUCCESS),
            error: None,
        }
    }

    /// Rebuilds a raw response from the result fields of a function body.
    pub fn from_output_fields(body: &Value) -> Self {
        let field = |name: &str| body.get(name).cloned();

        Self {
            result: field(properties::RESULT),
            reason: field(properties::REASON),
            role: field(properties::ROLE),
            free: field(properties::FREE),
            disposable: field(properties::DISPOSABLE),
            accept_all: field(properties::ACCEPT_ALL),
            did_you_mean: field(properties::DID_YOU_MEAN),
            sendex: field(properties::SENDEX),
            email: field(properties::EMAIL_NORMALIZED),
            success: field(properties::SUCCESS),
            error: None,
        }
    }
}

// ============ Canonical Result ============

/// Normalized verification outcome, created once per invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    /// `deliverable`, `undeliverable`, `risky`, `unknown`, or `""` when absent.
    pub result: String,
    /// Raw reason code. Display contexts default it to `"N/A"`; the patch does not.
    pub reason: Option<String>,
    pub disposable: bool,
    pub accept_all: bool,
    pub role: bool,
    pub free: bool,
    pub success: bool,
    /// Deliverability score, nominally in `[0, 1]` but not range-checked.
    pub sendex: Option<f64>,
    pub did_you_mean: Option<String>,
    pub email_normalized: Option<String>,
    pub verified_at: DateTime<Utc>,
}

impl VerificationResult {
    /// `verified_at` in the `toISOString` shape HubSpot date-time properties accept.
    pub fn verification_date(&self) -> String {
        self.verified_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

// ============ Property Patch ============

/// Partial contact update: property name to string value, only for determinable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertyPatch(BTreeMap<String, String>);

impl PropertyPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the value only when it is determinable.
    pub fn insert_opt(&mut self, name: &str, value: Option<String>) {
        if let Some(value) = value {
            self.0.insert(name.to_string(), value);
        }
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============ Outbound Result Fields ============

/// Result fields returned to callers after a verification.
///
/// Booleans and `sendex` keep their native JSON types here; only the CRM
/// patch stringifies them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VerificationOutput {
    pub kickbox_result: String,
    pub kickbox_reason: Option<String>,
    pub kickbox_disposable: bool,
    pub kickbox_accept_all: bool,
    pub kickbox_role: bool,
    pub kickbox_free: bool,
    pub kickbox_sendex: Option<f64>,
    pub kickbox_did_you_mean: Option<String>,
    pub kickbox_success: bool,
    pub kickbox_email_normalized: Option<String>,
    pub kickbox_verification_date: String,
}

impl From<&VerificationResult> for VerificationOutput {
    fn from(result: &VerificationResult) -> Self {
        Self {
            kickbox_result: result.result.clone(),
            kickbox_reason: result.reason.clone(),
            kickbox_disposable: result.disposable,
            kickbox_accept_all: result.accept_all,
            kickbox_role: result.role,
            kickbox_free: result.free,
            kickbox_sendex: result.sendex,
            kickbox_did_you_mean: result.did_you_mean.clone(),
            kickbox_success: result.success,
            kickbox_email_normalized: result.email_normalized.clone(),
            kickbox_verification_date: result.verification_date(),
        }
    }
}

// ============ HubSpot Models ============

/// Contact as returned by `GET /crm/v3/objects/contacts/{id}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CrmContact {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Option<String>>,
}

impl CrmContact {
    /// Non-empty value of a property. HubSpot reports unset properties as
    /// `null` or `""`; both read as absent.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|v| v.as_deref())
            .filter(|v| !v.is_empty())
    }

    pub fn email(&self) -> Option<&str> {
        self.property(properties::EMAIL)
    }

    /// Contact id from `hs_object_id`, falling back to the record id.
    pub fn object_id(&self) -> Option<&str> {
        self.property(properties::OBJECT_ID)
            .or(Some(self.id.as_str()).filter(|id| !id.is_empty()))
    }
}
