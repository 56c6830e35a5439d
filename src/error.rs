use crate::domain::payment::{ErrorEnvelope, ErrorPayload};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Upper bound on provider text echoed back to clients.
pub const MAX_PROVIDER_MESSAGE_CHARS: usize = 200;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{provider} not configured. Use Cash on Delivery instead.")]
    GatewayConfig { provider: &'static str },

    #[error("{provider} error: {message}")]
    GatewayRequest { provider: &'static str, message: String },

    /// No answer within the configured timeout; the provider may still have
    /// opened a session.
    #[error("{provider} error: gateway timeout")]
    GatewayTimeout { provider: &'static str },

    #[error("{message}")]
    GatewayRejected { provider: &'static str, message: String },

    #[error("Invalid webhook signature")]
    Authentication,

    #[error("Order not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Store(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn gateway_request(provider: &'static str, message: impl AsRef<str>) -> Self {
        PaymentError::GatewayRequest {
            provider,
            message: truncate_message(message.as_ref()),
        }
    }

    pub fn gateway_rejected(provider: &'static str, message: impl AsRef<str>) -> Self {
        PaymentError::GatewayRejected {
            provider,
            message: truncate_message(message.as_ref()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::Validation(_)
            | PaymentError::InvalidInput(_)
            | PaymentError::GatewayConfig { .. }
            | PaymentError::GatewayRejected { .. } => StatusCode::BAD_REQUEST,
            PaymentError::GatewayRequest { .. } | PaymentError::GatewayTimeout { .. } => {
                StatusCode::BAD_GATEWAY
            }
            PaymentError::Authentication => StatusCode::UNAUTHORIZED,
            PaymentError::NotFound => StatusCode::NOT_FOUND,
            PaymentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "VALIDATION_ERROR",
            PaymentError::InvalidInput(_) => "INVALID_INPUT",
            PaymentError::GatewayConfig { .. } => "GATEWAY_NOT_CONFIGURED",
            PaymentError::GatewayRequest { .. } => "GATEWAY_REQUEST_FAILED",
            PaymentError::GatewayTimeout { .. } => "GATEWAY_TIMEOUT",
            PaymentError::GatewayRejected { .. } => "GATEWAY_REJECTED",
            PaymentError::Authentication => "INVALID_SIGNATURE",
            PaymentError::NotFound => "NOT_FOUND",
            PaymentError::Store(_) => "INTERNAL_ERROR",
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        // storage internals stay in the logs
        let message = match self {
            PaymentError::Store(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        ErrorEnvelope {
            error: ErrorPayload {
                code: self.code().to_string(),
                message,
                details: None,
            },
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        if let PaymentError::Store(e) = &self {
            tracing::error!(error = %e, "storage failure");
        }
        (self.status_code(), Json(self.envelope())).into_response()
    }
}

pub fn truncate_message(message: &str) -> String {
    message.chars().take(MAX_PROVIDER_MESSAGE_CHARS).collect()
}
