//! Centralized error types for the control hub.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to the HTTP status codes of the query interface
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::actions::ActionParseError;
use crate::player::TagError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for TagError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidName(_) => "tag_invalid_name",
            Self::NonFinite(_) => "tag_non_finite",
        }
    }
}

impl ErrorCode for ActionParseError {
    fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty_command",
            Self::UnknownKeyword(_) => "unknown_keyword",
            Self::MissingPayload(_) => "missing_payload",
            Self::UnexpectedPayload(_) => "unexpected_payload",
            Self::InvalidPayload { .. } => "invalid_payload",
        }
    }
}

/// Application-wide error type for the control hub.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum HubError {
    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested queue item is not in the mirror.
    ///
    /// Answered with `204 No Content` and an empty body.
    #[error("Item not found: {0}")]
    ItemNotFound(u32),

    /// The item's tag list could not be serialized.
    #[error("Tag serialization failed: {0}")]
    TagSerialization(String),

    /// A JSON document could not be built.
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// The HTTP/WebSocket listener failed.
    #[error("Server error: {0}")]
    Server(String),

    /// mDNS daemon or service registration failed.
    #[error("Service announcement failed: {0}")]
    Announcer(String),

    /// The hub configuration was rejected at construction.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The hub is inactive or already dropped.
    #[error("Control hub is not serving")]
    Unavailable,
}

impl HubError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::ItemNotFound(_) => "item_not_found",
            Self::TagSerialization(_) => "tag_serialization_failed",
            Self::Encoding(_) => "encoding_failed",
            Self::Server(_) => "server_error",
            Self::Announcer(_) => "announcer_error",
            Self::Config(_) => "invalid_config",
            Self::Unavailable => "hub_unavailable",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ItemNotFound(_) => StatusCode::NO_CONTENT,
            Self::Encoding(_) | Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for hub-wide operations.
pub type HubResult<T> = Result<T, HubError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::NO_CONTENT {
            return status.into_response();
        }
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<TagError> for HubError {
    fn from(err: TagError) -> Self {
        Self::TagSerialization(err.to_string())
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}
