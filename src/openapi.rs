use utoipa::OpenApi;

use crate::card::{CardVerification, CardView, StatusVariant};
use crate::handlers;
use crate::invocation_models::{
    ContactDataBody, FunctionEnvelope, FunctionParameters, FunctionRequest, WorkflowCompletion,
    WorkflowEvent, WorkflowInputFields, WorkflowObject, WorkflowOutput,
};
use crate::models::VerificationOutput;

/// OpenAPI document served at `/api-docs/openapi.json` and rendered at `/docs`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kickbox HubSpot API",
        description = "Kickbox email verification for HubSpot contacts"
    ),
    paths(
        handlers::health,
        handlers::verify_email,
        handlers::verify_contact,
        handlers::workflow_verify_email,
        handlers::workflow_verify_email_input,
        handlers::get_contact_data,
        handlers::contact_verification,
    ),
    components(schemas(
        FunctionRequest,
        FunctionParameters,
        FunctionEnvelope,
        WorkflowEvent,
        WorkflowObject,
        WorkflowInputFields,
        WorkflowOutput,
        WorkflowCompletion,
        ContactDataBody,
        VerificationOutput,
        CardView,
        CardVerification,
        StatusVariant,
    )),
    tags(
        (name = "functions", description = "Card and direct function calls"),
        (name = "workflows", description = "Workflow actions"),
        (name = "contacts", description = "Stored verification results"),
        (name = "system", description = "Liveness")
    )
)]
pub struct ApiDoc;
