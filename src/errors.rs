use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
///
/// Every failure of a verification invocation lands in exactly one of these
/// variants; the invocation context decides how it is shaped for the caller.
#[derive(Debug)]
pub enum AppError {
    /// A required secret (provider API key, CRM access token) is missing.
    Configuration(String),
    /// A required input field is missing or blank.
    Validation(String),
    /// Transport failure, non-2xx status or explicit `error` field from Kickbox.
    Provider(String),
    /// Reading the contact from HubSpot failed.
    CrmRead(String),
    /// Writing the property patch to HubSpot failed.
    CrmWrite(String),
    /// Missing or invalid function token.
    Unauthorized(String),
    /// Internal server error.
    Internal(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Stable tag used as the `error` field of failure bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration_error",
            AppError::Validation(_) => "validation_error",
            AppError::Provider(_) => "provider_error",
            AppError::CrmRead(_) => "crm_read_error",
            AppError::CrmWrite(_) => "crm_write_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Internal(_) => "internal_error",
            AppError::WithContext { source, .. } => source.kind(),
        }
    }

    /// HTTP status reported for this error, both by axum responses and by the
    /// `statusCode` field of function envelopes.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Provider(_) | AppError::CrmRead(_) | AppError::CrmWrite(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::WithContext { source, .. } => source.status_code(),
        }
    }

    /// The caller-facing message, without the variant prefix used by `Display`.
    pub fn message(&self) -> String {
        match self {
            AppError::Configuration(msg)
            | AppError::Validation(msg)
            | AppError::Provider(msg)
            | AppError::CrmRead(msg)
            | AppError::CrmWrite(msg)
            | AppError::Unauthorized(msg)
            | AppError::Internal(msg) => msg.clone(),
            AppError::WithContext { source, context } => {
                format!("{}: {}", context, source.message())
            }
        }
    }

    /// `{error, message}` JSON body shared by every failure response.
    pub fn body(&self) -> serde_json::Value {
        json!({
            "error": self.kind(),
            "message": self.message(),
        })
    }

    /// Logs the error at a level matching its severity.
    pub fn log(&self) {
        match self {
            AppError::Validation(msg) => tracing::warn!("Validation error: {}", msg),
            AppError::Unauthorized(msg) => tracing::warn!("Unauthorized access: {}", msg),
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source)
            }
            other => tracing::error!("{}", other),
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Provider(msg) => write!(f, "Provider error: {}", msg),
            AppError::CrmRead(msg) => write!(f, "CRM read error: {}", msg),
            AppError::CrmWrite(msg) => write!(f, "CRM write error: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// This is the terminal failure signal of the workflow contexts: the body
    /// carries only `error` and `message`, never partial output fields.
    fn into_response(self) -> Response {
        self.log();

        (self.status_code(), Json(self.body())).into_response()
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::Configuration(msg) => AppError::Configuration(msg.clone()),
            AppError::Validation(msg) => AppError::Validation(msg.clone()),
            AppError::Provider(msg) => AppError::Provider(msg.clone()),
            AppError::CrmRead(msg) => AppError::CrmRead(msg.clone()),
            AppError::CrmWrite(msg) => AppError::CrmWrite(msg.clone()),
            AppError::Unauthorized(msg) => AppError::Unauthorized(msg.clone()),
            AppError::Internal(msg) => AppError::Internal(msg.clone()),
            AppError::WithContext { source, context } => AppError::WithContext {
                source: source.clone(),
                context: context.clone(),
            },
        }
    }
}

// Errors compare by what the caller sees.
impl PartialEq for AppError {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.message() == other.message()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
