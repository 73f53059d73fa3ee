use crate::card::{card_properties, CardView};
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::invocation_models::{
    ContactDataBody, FunctionEnvelope, FunctionRequest, WorkflowCompletion, WorkflowEvent,
    WorkflowOutput,
};
use crate::models::properties;
use crate::pipeline::{dispatch, function_error, InvocationContext, InvocationResponse, VerificationPipeline};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;

pub const FUNCTION_TOKEN_HEADER: &str = "x-function-token";

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Pipeline, or the configuration error every invocation reports.
    pub pipeline: Result<VerificationPipeline, AppError>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let pipeline = VerificationPipeline::new(&config);
        Self { config, pipeline }
    }

    fn pipeline(&self) -> Result<&VerificationPipeline, &AppError> {
        self.pipeline.as_ref()
    }
}

impl IntoResponse for InvocationResponse {
    fn into_response(self) -> Response {
        match self {
            InvocationResponse::Function(envelope) => envelope.into_response(),
            InvocationResponse::Workflow(Ok(output)) => (StatusCode::OK, Json(output)).into_response(),
            // Already logged by the pipeline.
            InvocationResponse::Workflow(Err(error)) => {
                (error.status_code(), Json(error.body())).into_response()
            }
            InvocationResponse::Completion(completion) => {
                (StatusCode::OK, Json(completion)).into_response()
            }
        }
    }
}

impl IntoResponse for FunctionEnvelope {
    /// The HTTP status mirrors `statusCode`.
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "kickbox-hubspot-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/functions/verify-email
///
/// On-demand verification from the contact card. Both `email` and
/// `contactId` are required; the contact is not read from HubSpot.
#[utoipa::path(
    post,
    path = "/api/v1/functions/verify-email",
    tag = "functions",
    request_body = FunctionRequest,
    responses(
        (status = 200, description = "Verified and written to HubSpot", body = FunctionEnvelope),
        (status = 400, description = "Missing email or contactId", body = FunctionEnvelope),
        (status = 500, description = "Missing API key or access token", body = FunctionEnvelope),
        (status = 502, description = "Kickbox or HubSpot failed", body = FunctionEnvelope)
    )
)]
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<FunctionRequest>, JsonRejection>,
) -> Result<InvocationResponse, AppError> {
    tracing::info!("POST /functions/verify-email");
    validate_function_token(&state, &headers)?;

    let parameters = read_payload(payload).parameters;
    let context = InvocationContext::OnDemand {
        contact_id: parameters.contact_id,
        email: parameters.email,
    };

    Ok(dispatch(state.pipeline(), context).await)
}

/// POST /api/v1/functions/verify-contact
///
/// Direct verification of one contact; the email is looked up in HubSpot
/// when the caller does not supply it.
#[utoipa::path(
    post,
    path = "/api/v1/functions/verify-contact",
    tag = "functions",
    request_body = FunctionRequest,
    responses(
        (status = 200, description = "Verified and written to HubSpot", body = FunctionEnvelope),
        (status = 400, description = "Missing contactId, or contact has no email", body = FunctionEnvelope),
        (status = 502, description = "Kickbox or HubSpot failed", body = FunctionEnvelope)
    )
)]
pub async fn verify_contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<FunctionRequest>, JsonRejection>,
) -> Result<InvocationResponse, AppError> {
    tracing::info!("POST /functions/verify-contact");
    validate_function_token(&state, &headers)?;

    let parameters = read_payload(payload).parameters;
    let context = InvocationContext::Direct {
        contact_id: parameters.contact_id.or(parameters.object_id),
        email: parameters.email,
    };

    Ok(dispatch(state.pipeline(), context).await)
}

/// POST /api/v1/workflows/verify-email
///
/// Workflow action run for every enrolled contact. A contact without an
/// email completes with `kickbox_result = "no_email"`; any other failure is
/// returned as an error response so the workflow marks the action failed.
#[utoipa::path(
    post,
    path = "/api/v1/workflows/verify-email",
    tag = "workflows",
    request_body = WorkflowEvent,
    responses(
        (status = 200, description = "Verified or skipped", body = WorkflowOutput),
        (status = 400, description = "Missing objectId"),
        (status = 502, description = "Kickbox or HubSpot failed")
    )
)]
pub async fn workflow_verify_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<WorkflowEvent>, JsonRejection>,
) -> Result<InvocationResponse, AppError> {
    tracing::info!("POST /workflows/verify-email");
    validate_function_token(&state, &headers)?;

    let event = read_payload(payload);
    let context = InvocationContext::WorkflowAuto {
        object_id: event.object.object_id,
    };

    Ok(dispatch(state.pipeline(), context).await)
}

/// POST /api/v1/workflows/verify-email-input
///
/// Workflow action with an optional email input field. Always answers 200
/// with a completion payload; `success` tells the workflow the outcome.
#[utoipa::path(
    post,
    path = "/api/v1/workflows/verify-email-input",
    tag = "workflows",
    request_body = WorkflowEvent,
    responses((status = 200, description = "Completion payload", body = WorkflowCompletion))
)]
pub async fn workflow_verify_email_input(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<WorkflowEvent>, JsonRejection>,
) -> Result<InvocationResponse, AppError> {
    tracing::info!("POST /workflows/verify-email-input");
    validate_function_token(&state, &headers)?;

    let event = read_payload(payload);
    let context = InvocationContext::WorkflowInputField {
        object_id: event.object.object_id,
        email: event.input_fields.email,
        callback_id: event.callback_id,
    };

    Ok(dispatch(state.pipeline(), context).await)
}

/// POST /api/v1/functions/get-contact-data
///
/// Returns `email`, `firstname` and `lastname` of one contact.
#[utoipa::path(
    post,
    path = "/api/v1/functions/get-contact-data",
    tag = "functions",
    request_body = FunctionRequest,
    responses(
        (status = 200, description = "Contact fields", body = FunctionEnvelope),
        (status = 400, description = "Missing objectId", body = FunctionEnvelope),
        (status = 500, description = "Lookup failed", body = FunctionEnvelope)
    )
)]
pub async fn get_contact_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<FunctionRequest>, JsonRejection>,
) -> Result<FunctionEnvelope, AppError> {
    tracing::info!("POST /functions/get-contact-data");
    validate_function_token(&state, &headers)?;

    let pipeline = match state.pipeline() {
        Ok(pipeline) => pipeline,
        Err(error) => {
            error.log();
            return Ok(function_error(error));
        }
    };

    let parameters = read_payload(payload).parameters;
    let Some(object_id) = parameters
        .object_id
        .or(parameters.contact_id)
        .filter(|id| !id.trim().is_empty())
    else {
        return Ok(FunctionEnvelope::new(
            400,
            &json!({ "error": "Object ID is required" }),
        ));
    };

    let lookup = [properties::EMAIL, properties::FIRSTNAME, properties::LASTNAME];
    match pipeline.hubspot().get_contact(&object_id, &lookup).await {
        Ok(contact) => {
            let field = |name: &str| contact.property(name).map(str::to_string);
            Ok(FunctionEnvelope::new(
                200,
                &ContactDataBody {
                    email: field(properties::EMAIL),
                    firstname: field(properties::FIRSTNAME),
                    lastname: field(properties::LASTNAME),
                },
            ))
        }
        Err(e) => {
            e.log();
            Ok(FunctionEnvelope::new(
                500,
                &json!({
                    "error": "Failed to fetch contact data",
                    "details": e.message(),
                }),
            ))
        }
    }
}

/// GET /api/v1/contacts/:id/verification
///
/// Card view of the verification results stored on a contact.
#[utoipa::path(
    get,
    path = "/api/v1/contacts/{id}/verification",
    tag = "contacts",
    params(("id" = String, Path, description = "HubSpot contact id")),
    responses(
        (status = 200, description = "Card view", body = CardView),
        (status = 502, description = "HubSpot read failed")
    )
)]
pub async fn contact_verification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CardView>, AppError> {
    tracing::info!("GET /contacts/{}/verification", id);
    validate_function_token(&state, &headers)?;

    let pipeline = state.pipeline().map_err(|e| e.clone())?;
    let contact = pipeline
        .hubspot()
        .get_contact(&id, &card_properties())
        .await
        .with_context(|| format!("Loading verification card for contact {}", id))?;

    Ok(Json(CardView::from_contact(&contact)))
}

/// Malformed or missing bodies read as empty input so the pipeline reports
/// the missing fields in the context's own shape.
fn read_payload<T: DeserializeOwned + Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(value)) => value,
        Err(rejection) => {
            tracing::warn!("Unreadable request body: {}", rejection.body_text());
            T::default()
        }
    }
}

/// Validate the function token from the x-function-token header
fn validate_function_token(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    // No secret configured: open access (warned at startup)
    let Some(ref expected) = state.config.function_secret else {
        return Ok(());
    };

    let token = headers
        .get(FUNCTION_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", FUNCTION_TOKEN_HEADER)))?;

    if !constant_time_compare(token, expected) {
        tracing::warn!("Invalid function token received");
        return Err(AppError::Unauthorized("Invalid function token".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
