//! Verification pipeline shared by every invocation context.
//!
//! One invocation runs these steps strictly in order:
//! 1. Resolve the contact email (skipped when the caller supplied one)
//! 2. Call Kickbox
//! 3. Reject provider-side errors
//! 4. Normalize the raw response
//! 5. Build the HubSpot property patch
//! 6. Update the contact
//! 7. Shape the response for the calling context
//!
//! Configuration and input validation happen before step 1, so a rejected
//! invocation makes no network call. Nothing is retried.
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{Config, Credentials};
use crate::errors::AppError;
use crate::hubspot_client::HubSpotClient;
use crate::invocation_models::{
    FunctionEnvelope, FunctionErrorBody, FunctionSuccessBody, OutputFields, SkippedOutputFields,
    VerifiedOutputFields, WorkflowCompletion, WorkflowOutput,
};
use crate::kickbox_client::KickboxClient;
use crate::models::{properties, PropertyPatch, VerificationOutput, VerificationResult};
use crate::normalizer::normalize;
use crate::property_mapper::to_property_patch;

pub const FUNCTION_SUCCESS_MESSAGE: &str = "Email verified and contact updated successfully!";
pub const MISSING_FUNCTION_INPUT_MESSAGE: &str = "Missing 'email' or 'contactId' in request.";
pub const MISSING_CONTACT_ID_MESSAGE: &str = "Contact ID is missing from the request. Cannot proceed.";

/// The calling context of one invocation. Contexts differ only in how the
/// contact and email are obtained and how the outcome is shaped.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationContext {
    /// Button on the CRM card; the card already knows both values.
    OnDemand {
        contact_id: Option<String>,
        email: Option<String>,
    },
    /// Direct function call; the email is looked up when not supplied.
    Direct {
        contact_id: Option<String>,
        email: Option<String>,
    },
    /// Workflow action run for every enrolled contact.
    WorkflowAuto { object_id: Option<String> },
    /// Workflow action with an optional email input field.
    WorkflowInputField {
        object_id: Option<String>,
        email: Option<String>,
        callback_id: Option<String>,
    },
}

/// Where the address to verify comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum EmailSource {
    Supplied(String),
    ResolveFromCrm,
}

/// Validated input of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationPlan {
    pub contact_id: String,
    pub email: EmailSource,
}

/// A verification that reached the CRM update step.
#[derive(Debug, Clone)]
pub struct Verification {
    pub contact_id: String,
    pub email: String,
    pub result: VerificationResult,
    pub patch: PropertyPatch,
}

impl Verification {
    pub fn output(&self) -> VerificationOutput {
        VerificationOutput::from(&self.result)
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Verified(Verification),
    /// The contact has no email; nothing was verified or written.
    Skipped { contact_id: String },
}

/// A failed invocation.
#[derive(Debug, Clone)]
pub struct Failure {
    pub error: AppError,
    /// Set when Kickbox succeeded but the HubSpot update did not.
    pub unpersisted: Option<Verification>,
}

impl Outcome {
    /// Contexts other than the auto-enrolled workflow cannot complete without
    /// an email, so a skip becomes a validation failure for them.
    fn require_verified(self) -> Result<Verification, Failure> {
        match self {
            Outcome::Verified(verification) => Ok(verification),
            Outcome::Skipped { contact_id } => {
                let error = AppError::Validation(format!(
                    "Contact {} has no email. Cannot verify.",
                    contact_id
                ));
                error.log();
                Err(error.into())
            }
        }
    }
}

impl From<AppError> for Failure {
    fn from(error: AppError) -> Self {
        Self {
            error,
            unpersisted: None,
        }
    }
}

/// Response of one invocation, in the shape its context expects.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResponse {
    Function(FunctionEnvelope),
    /// `Err` is the terminal failure signal of the auto-enrolled workflow.
    Workflow(Result<WorkflowOutput, AppError>),
    Completion(WorkflowCompletion),
}

impl InvocationContext {
    pub fn name(&self) -> &'static str {
        match self {
            InvocationContext::OnDemand { .. } => "on_demand",
            InvocationContext::Direct { .. } => "direct",
            InvocationContext::WorkflowAuto { .. } => "workflow_auto",
            InvocationContext::WorkflowInputField { .. } => "workflow_input_field",
        }
    }

    /// Validates the input. Pure: no network access.
    pub fn plan(&self) -> Result<InvocationPlan, AppError> {
        match self {
            InvocationContext::OnDemand { contact_id, email } => {
                match (present(contact_id), present(email)) {
                    (Some(contact_id), Some(email)) => Ok(InvocationPlan {
                        contact_id,
                        email: EmailSource::Supplied(email),
                    }),
                    _ => Err(AppError::Validation(MISSING_FUNCTION_INPUT_MESSAGE.to_string())),
                }
            }
            InvocationContext::Direct { contact_id, email } => Ok(InvocationPlan {
                contact_id: required_id(contact_id)?,
                email: email_source(email),
            }),
            InvocationContext::WorkflowAuto { object_id } => Ok(InvocationPlan {
                contact_id: required_id(object_id)?,
                email: EmailSource::ResolveFromCrm,
            }),
            InvocationContext::WorkflowInputField {
                object_id, email, ..
            } => Ok(InvocationPlan {
                contact_id: required_id(object_id)?,
                email: email_source(email),
            }),
        }
    }

    /// Shapes an outcome for this context.
    pub fn respond(&self, result: Result<Outcome, Failure>) -> InvocationResponse {
        match self {
            InvocationContext::OnDemand { .. } | InvocationContext::Direct { .. } => {
                InvocationResponse::Function(function_envelope(
                    result.and_then(Outcome::require_verified),
                ))
            }
            InvocationContext::WorkflowAuto { .. } => {
                InvocationResponse::Workflow(result.map(workflow_output).map_err(|f| f.error))
            }
            InvocationContext::WorkflowInputField { callback_id, .. } => {
                let completion = match result.and_then(Outcome::require_verified) {
                    Ok(verification) => {
                        let output = verified_output(verification);
                        WorkflowCompletion {
                            success: true,
                            message: output.message,
                            output_fields: Some(output.output_fields),
                            callback_id: callback_id.clone(),
                        }
                    }
                    Err(failure) => WorkflowCompletion {
                        success: false,
                        message: failure.error.message(),
                        output_fields: None,
                        callback_id: callback_id.clone(),
                    },
                };
                InvocationResponse::Completion(completion)
            }
        }
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required_id(value: &Option<String>) -> Result<String, AppError> {
    present(value).ok_or_else(|| AppError::Validation(MISSING_CONTACT_ID_MESSAGE.to_string()))
}

fn email_source(email: &Option<String>) -> EmailSource {
    present(email).map_or(EmailSource::ResolveFromCrm, EmailSource::Supplied)
}

fn function_envelope(result: Result<Verification, Failure>) -> FunctionEnvelope {
    match result {
        Ok(verification) => FunctionEnvelope::new(
            200,
            &FunctionSuccessBody {
                message: FUNCTION_SUCCESS_MESSAGE.to_string(),
                verification: verification.output(),
            },
        ),
        Err(failure) => FunctionEnvelope::new(
            failure.error.status_code().as_u16(),
            &FunctionErrorBody {
                error: failure.error.kind().to_string(),
                message: failure.error.message(),
                verification: failure.unpersisted.as_ref().map(Verification::output),
            },
        ),
    }
}

fn verified_output(verification: Verification) -> WorkflowOutput {
    WorkflowOutput {
        message: format!(
            "Email verified for contact {} ({}). Result: {}",
            verification.contact_id, verification.email, verification.result.result
        ),
        output_fields: OutputFields::Verified(VerifiedOutputFields {
            verification: verification.output(),
            verified_contact_id: verification.contact_id,
            verified_email: verification.email,
        }),
    }
}

fn workflow_output(outcome: Outcome) -> WorkflowOutput {
    match outcome {
        Outcome::Verified(verification) => verified_output(verification),
        Outcome::Skipped { contact_id } => WorkflowOutput {
            message: skipped_message(&contact_id),
            output_fields: OutputFields::Skipped(SkippedOutputFields {
                kickbox_result: "no_email".to_string(),
                kickbox_reason: "Contact has no email property".to_string(),
                kickbox_success: false,
            }),
        },
    }
}

fn skipped_message(contact_id: &str) -> String {
    format!(
        "Contact {} has no email. No verification performed.",
        contact_id
    )
}

/// Kickbox and HubSpot clients bound to validated credentials.
#[derive(Clone)]
pub struct VerificationPipeline {
    kickbox: KickboxClient,
    hubspot: HubSpotClient,
}

impl VerificationPipeline {
    /// Validates both secrets and builds the clients.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let credentials = Credentials::from_config(config)?;
        let kickbox = KickboxClient::new(
            config.kickbox_base_url.clone(),
            credentials.kickbox_api_key,
            config.http_timeout(),
        )?;
        let hubspot = HubSpotClient::new(
            config.hubspot_base_url.clone(),
            credentials.hubspot_access_token,
            config.http_timeout(),
        )?;

        Ok(Self::from_clients(kickbox, hubspot))
    }

    pub fn from_clients(kickbox: KickboxClient, hubspot: HubSpotClient) -> Self {
        Self { kickbox, hubspot }
    }

    pub fn hubspot(&self) -> &HubSpotClient {
        &self.hubspot
    }

    /// Runs one invocation end to end and shapes the response.
    pub async fn invoke(&self, context: InvocationContext) -> InvocationResponse {
        let result = match context.plan() {
            Ok(plan) => self.execute(&plan).await,
            Err(error) => Err(error.into()),
        };
        if let Err(failure) = &result {
            failure.error.log();
        }
        context.respond(result)
    }

    /// Steps 1-6 for a validated plan.
    pub async fn execute(&self, plan: &InvocationPlan) -> Result<Outcome, Failure> {
        let contact_id = plan.contact_id.clone();
        tracing::info!("Starting verification for contact {}", contact_id);

        // Step 1: Resolve email
        let email = match &plan.email {
            EmailSource::Supplied(email) => email.clone(),
            EmailSource::ResolveFromCrm => {
                tracing::info!("Step 1: Fetching email for contact {}", contact_id);
                let contact = self
                    .hubspot
                    .get_contact(&contact_id, &[properties::EMAIL, properties::OBJECT_ID])
                    .await?;

                match contact.email() {
                    Some(email) => email.to_string(),
                    None => {
                        tracing::warn!(
                            "Contact {} has no email. Skipping Kickbox verification.",
                            contact_id
                        );
                        return Ok(Outcome::Skipped { contact_id });
                    }
                }
            }
        };

        // Step 2: Call Kickbox
        tracing::info!("Step 2: Verifying {} with Kickbox", email);
        let raw = self.kickbox.verify(&email).await?;

        // Step 3: Reject provider-side errors
        if let Some(error) = raw.provider_error() {
            tracing::error!("Kickbox returned an error: {}", error);
            return Err(AppError::Provider(format!("Kickbox API error: {}", error)).into());
        }

        // Steps 4-5: Normalize and map
        let result = normalize(&raw);
        let patch = to_property_patch(&result);
        tracing::info!(
            "Step 5: Kickbox result for {}: {} ({} properties to write)",
            email,
            result.result,
            patch.len()
        );

        let verification = Verification {
            contact_id,
            email,
            result,
            patch,
        };

        // Step 6: Update HubSpot
        tracing::info!("Step 6: Writing results to contact {}", verification.contact_id);
        if let Err(error) = self
            .hubspot
            .update_contact(&verification.contact_id, &verification.patch)
            .await
        {
            tracing::error!(
                "Verification of {} succeeded but HubSpot update failed",
                verification.email
            );
            return Err(Failure {
                error,
                unpersisted: Some(verification),
            });
        }

        Ok(Outcome::Verified(verification))
    }
}

/// Entry point for hosts that hold the pipeline construction result.
///
/// A configuration error is reported in the context's shape before any
/// other step, including input validation.
pub async fn dispatch(
    pipeline: Result<&VerificationPipeline, &AppError>,
    context: InvocationContext,
) -> InvocationResponse {
    let span = tracing::info_span!(
        "invocation",
        id = %Uuid::new_v4(),
        context = context.name()
    );

    async move {
        match pipeline {
            Ok(pipeline) => pipeline.invoke(context).await,
            Err(error) => {
                error.log();
                context.respond(Err(error.clone().into()))
            }
        }
    }
    .instrument(span)
    .await
}

/// Failure body for callers that never reached the pipeline (bad JSON, auth).
pub fn function_error(error: &AppError) -> FunctionEnvelope {
    FunctionEnvelope::new(error.status_code().as_u16(), &error.body())
}
