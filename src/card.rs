use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::coercion::non_empty;
use crate::models::{properties, CrmContact, RawVerificationResponse};
use crate::normalizer::{display_reason, normalize};

pub const NO_EMAIL_MESSAGE: &str = "No email found for this contact. Cannot verify.";
pub const NO_CONTACT_ID_MESSAGE: &str = "Could not load contact ID. Cannot verify.";
const ALSO_NO_CONTACT_ID: &str = " Also, could not load contact ID.";

/// Properties the card reads for one contact.
pub fn card_properties() -> Vec<&'static str> {
    let mut names = vec![properties::EMAIL, properties::OBJECT_ID];
    names.extend(properties::KICKBOX_ALL);
    names
}

/// Tag colour for a verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusVariant {
    Success,
    Danger,
    Warning,
    Neutral,
    Default,
}

impl StatusVariant {
    pub fn for_result(result: &str) -> Self {
        match result.to_ascii_lowercase().as_str() {
            "deliverable" => StatusVariant::Success,
            "undeliverable" => StatusVariant::Danger,
            "risky" => StatusVariant::Warning,
            "unknown" => StatusVariant::Neutral,
            _ => StatusVariant::Default,
        }
    }
}

/// Display-ready verification fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CardVerification {
    pub status_label: String,
    pub status_variant: StatusVariant,
    pub reason: String,
    pub reason_label: String,
    pub sendex: f64,
    pub sendex_percent: String,
    pub success: bool,
    pub disposable: bool,
    pub accept_all: bool,
    pub role: bool,
    pub free: bool,
    pub did_you_mean: Option<String>,
    pub email_normalized: Option<String>,
    pub verified_email: Option<String>,
    pub verification_date: Option<String>,
}

impl CardVerification {
    /// Builds the view from raw fields. `None` when no result was ever stored.
    fn build(raw: &RawVerificationResponse, verification_date: Option<String>) -> Option<Self> {
        let normalized = normalize(raw);
        if normalized.result.is_empty() {
            return None;
        }

        let reason = display_reason(&normalized).to_string();
        let sendex = normalized.sendex.unwrap_or(0.0);
        let email_normalized = non_empty(normalized.email_normalized.clone());

        Some(Self {
            status_label: normalized.result.to_uppercase(),
            status_variant: StatusVariant::for_result(&normalized.result),
            reason_label: reason.replace('_', " "),
            reason,
            sendex,
            sendex_percent: format!("{:.2}%", sendex * 100.0),
            success: normalized.success,
            disposable: normalized.disposable,
            accept_all: normalized.accept_all,
            role: normalized.role,
            free: normalized.free,
            did_you_mean: non_empty(normalized.did_you_mean.clone()),
            verified_email: email_normalized.clone(),
            email_normalized,
            verification_date: verification_date.and_then(|d| display_date(&d)),
        })
    }

    /// Read-back path: every stored property value is a string.
    pub fn from_contact(contact: &CrmContact) -> Option<Self> {
        Self::build(
            &RawVerificationResponse::from_crm_properties(contact),
            contact
                .property(properties::VERIFICATION_DATE)
                .map(str::to_string),
        )
    }

    /// Live path: the body of a successful verify-email call.
    pub fn from_function_body(body: &Value) -> Option<Self> {
        Self::build(
            &RawVerificationResponse::from_output_fields(body),
            body.get(properties::VERIFICATION_DATE)
                .and_then(Value::as_str)
                .map(str::to_string),
        )
    }
}

/// Stored dates are ISO strings, or epoch milliseconds from older writes.
fn display_date(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<i64>() {
        Ok(millis) => DateTime::<Utc>::from_timestamp_millis(millis)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .or_else(|| Some(value.to_string())),
        Err(_) => Some(value.to_string()),
    }
}

/// Side-panel card state for one contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CardView {
    pub contact_id: Option<String>,
    pub contact_email: Option<String>,
    /// Whether the verify action can be offered.
    pub can_verify: bool,
    pub error: Option<String>,
    pub verification: Option<CardVerification>,
}

impl CardView {
    pub fn from_contact(contact: &CrmContact) -> Self {
        let contact_id = contact.object_id().map(str::to_string);
        let contact_email = contact.email().map(str::to_string);

        let error = match (&contact_email, &contact_id) {
            (None, None) => Some(format!("{}{}", NO_EMAIL_MESSAGE, ALSO_NO_CONTACT_ID)),
            (None, Some(_)) => Some(NO_EMAIL_MESSAGE.to_string()),
            (Some(_), None) => Some(NO_CONTACT_ID_MESSAGE.to_string()),
            (Some(_), Some(_)) => None,
        };

        Self {
            can_verify: error.is_none(),
            verification: CardVerification::from_contact(contact),
            contact_id,
            contact_email,
            error,
        }
    }
}
