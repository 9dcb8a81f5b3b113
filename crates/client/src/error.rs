//! Error taxonomy for the client layer.
//!
//! `ApiError` describes what went wrong talking to the server. `ClientError`
//! is what a user-initiated operation returns; every variant can be turned
//! into one sentence for a notification via [`ClientError::user_message`].

use serde_json::Value as JsonValue;
use thiserror::Error;

use gudang_core::DomainError;

use crate::stock_out::StockOutError;

/// Failure of a single HTTP exchange.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Transport-level failure; no response was received.
    #[error("network error: {cause}")]
    Network { cause: String },

    /// HTTP 401: the caller must (re-)authenticate.
    #[error("authentication required")]
    AuthRequired { body: Option<JsonValue> },

    /// Any other status outside `[200, 300)`.
    #[error("API error ({status})")]
    Status { status: u16, body: Option<JsonValue> },

    /// A 2xx response whose body did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Decode(String),

    /// The request body could not be serialized; nothing was sent.
    #[error("request body: {0}")]
    Encode(String),
}

impl ApiError {
    pub fn network(cause: impl Into<String>) -> Self {
        Self::Network {
            cause: cause.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// The server answered 2xx, so any write it was asked for happened.
    pub fn is_undecodable_success(&self) -> bool {
        matches!(self, ApiError::Decode(_))
    }

    /// Build the error for a non-2xx status, singling out 401.
    pub fn from_status(status: u16, body: Option<JsonValue>) -> Self {
        if status == 401 {
            Self::AuthRequired { body }
        } else {
            Self::Status { status, body }
        }
    }

    /// HTTP status, when the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Network { .. } => None,
            ApiError::AuthRequired { .. } => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Decode(_) | ApiError::Encode(_) => None,
        }
    }

    pub fn body(&self) -> Option<&JsonValue> {
        match self {
            ApiError::AuthRequired { body } | ApiError::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, ApiError::AuthRequired { .. })
    }

    /// First human-readable message found in an error body.
    ///
    /// The server answers with `{"detail": "..."}` for generic failures and
    /// `{"field": ["msg", ...]}` for validation failures.
    pub fn server_message(&self) -> Option<String> {
        first_message(self.body()?)
    }

    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network { .. } => {
                "Cannot reach the server. Check that it is running.".to_string()
            }
            ApiError::AuthRequired { .. } => "Authentication required. Please log in.".to_string(),
            ApiError::Status { status, .. } => match self.server_message() {
                Some(msg) => msg,
                None => format!("The server rejected the request (status {status})."),
            },
            ApiError::Decode(_) => "The server sent an unexpected response.".to_string(),
            ApiError::Encode(_) => "The request could not be prepared.".to_string(),
        }
    }
}

fn first_message(body: &JsonValue) -> Option<String> {
    match body {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.clone()),
        JsonValue::Array(items) => items.iter().find_map(first_message),
        JsonValue::Object(map) => map
            .get("detail")
            .and_then(first_message)
            .or_else(|| map.values().find_map(first_message)),
        _ => None,
    }
}

/// Error returned by a user-initiated operation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A client-side precondition failed before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("page must be 1 or greater, got {0}")]
    InvalidPage(i64),

    /// The current user lacks the role the action needs.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    StockOut(#[from] StockOutError),
}

impl From<DomainError> for ClientError {
    fn from(value: DomainError) -> Self {
        ClientError::Validation(value.to_string())
    }
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_auth_required(&self) -> bool {
        match self {
            ClientError::Api(e) => e.is_auth_required(),
            ClientError::StockOut(e) => e.api_error().is_some_and(ApiError::is_auth_required),
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api(e) => e.user_message(),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::InvalidPage(page) => format!("Page {page} does not exist."),
            ClientError::Forbidden(msg) => msg.clone(),
            ClientError::InvalidCredentials => "Wrong username or password.".to_string(),
            ClientError::StockOut(e) => e.user_message(),
        }
    }
}
