use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::VerificationOutput;

// ============ Inputs ============

/// Body of a serverless-style function call: `{"parameters": {...}}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct FunctionRequest {
    #[serde(default)]
    pub parameters: FunctionParameters,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunctionParameters {
    #[serde(default)]
    pub email: Option<String>,

    /// HubSpot record id; accepted as a string or a number.
    #[serde(default, deserialize_with = "optional_id")]
    #[schema(value_type = Option<String>)]
    pub contact_id: Option<String>,

    /// Alias used by the contact lookup function.
    #[serde(default, deserialize_with = "optional_id")]
    #[schema(value_type = Option<String>)]
    pub object_id: Option<String>,
}

/// Workflow action event: `{"object": {"objectId": 123}, "inputFields": {...}}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEvent {
    #[serde(default)]
    pub object: WorkflowObject,

    #[serde(default)]
    pub input_fields: WorkflowInputFields,

    /// Present on input-field actions; echoed back with the completion.
    #[serde(default)]
    pub callback_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowObject {
    #[serde(default, deserialize_with = "optional_id")]
    #[schema(value_type = Option<String>)]
    pub object_id: Option<String>,

    #[serde(default)]
    pub object_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct WorkflowInputFields {
    #[serde(default)]
    pub email: Option<String>,
}

/// Ids arrive as JSON strings from the card and as numbers from workflows.
fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ============ Outputs ============

/// `{statusCode, body}` returned by the on-demand and direct contexts.
/// `body` is itself a JSON document serialized to a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEnvelope {
    pub status_code: u16,
    pub body: String,
}

impl FunctionEnvelope {
    pub fn new(status_code: u16, body: &impl Serialize) -> Self {
        Self {
            status_code,
            // Serializing plain structs and json! values cannot fail.
            body: serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Parses `body` back into JSON.
    pub fn body_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Success body of the function contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSuccessBody {
    pub message: String,
    #[serde(flatten)]
    pub verification: VerificationOutput,
}

/// Failure body of the function contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionErrorBody {
    pub error: String,
    pub message: String,
    /// Verification that succeeded but could not be written to HubSpot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationOutput>,
}

/// Output fields after a verification in a workflow context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedOutputFields {
    #[serde(flatten)]
    pub verification: VerificationOutput,
    #[serde(rename = "verifiedContactId")]
    pub verified_contact_id: String,
    #[serde(rename = "verifiedEmail")]
    pub verified_email: String,
}

/// Output fields when the enrolled contact had no email to verify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedOutputFields {
    pub kickbox_result: String,
    pub kickbox_reason: String,
    pub kickbox_success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputFields {
    Verified(VerifiedOutputFields),
    Skipped(SkippedOutputFields),
}

/// `{outputFields, message}` returned by the auto-enrolled workflow context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowOutput {
    #[schema(value_type = Object)]
    pub output_fields: OutputFields,
    pub message: String,
}

/// Completion signalled by the input-field workflow context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowCompletion {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub output_fields: Option<OutputFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
}

/// Contact fields returned by the lookup function.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactDataBody {
    pub email: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}
