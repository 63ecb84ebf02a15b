//! Error handling for Lectern Core.
//!
//! This module provides:
//! - A single crate error type with machine-readable codes
//! - HTTP status code mapping for API responses
//! - Severity-driven logging with tracing integration
//! - Metrics integration for error tracking
//!
//! Authorization denials are *not* errors. The gate returns them as
//! [`PolicyDecision::Deny`](crate::rbac::PolicyDecision) values; this type
//! covers configuration, storage and session failures. Only the HTTP access
//! layer turns a deny into a `Forbidden` response at the boundary.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lectern_core::error::{ErrorCode, LecternError, Result};
//!
//! fn select(slug: &str) -> Result<()> {
//!     Err(LecternError::new(ErrorCode::UnknownProject, format!("Unknown project: {}", slug)))
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

use crate::rbac::registry::CatalogError;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Lectern operations.
pub type Result<T> = std::result::Result<T, LecternError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Catalog Errors (1000-1099)
    UnknownRole,
    DuplicateRole,
    MissingProjectRole,
    InvalidCatalog,

    // Permission Errors (1100-1199)
    MalformedPermissionCache,
    ProjectNotPermitted,
    UnknownProject,

    // Storage Errors (2000-2099)
    StorageError,
    RecordNotFound,

    // Authentication/Authorization (4000-4099)
    Unauthorized,
    Forbidden,
    InvalidToken,
    TokenExpired,

    // Configuration Errors (5000-5099)
    ConfigurationError,
    MissingConfiguration,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::UnknownRole => 1000,
            Self::DuplicateRole => 1001,
            Self::MissingProjectRole => 1002,
            Self::InvalidCatalog => 1003,

            Self::MalformedPermissionCache => 1100,
            Self::ProjectNotPermitted => 1101,
            Self::UnknownProject => 1102,

            Self::StorageError => 2000,
            Self::RecordNotFound => 2004,

            Self::Unauthorized => 4000,
            Self::Forbidden => 4001,
            Self::InvalidToken => 4002,
            Self::TokenExpired => 4003,

            Self::ConfigurationError => 5000,
            Self::MissingConfiguration => 5001,
        }
    }

    /// Get the HTTP status code for this error.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::RecordNotFound | Self::UnknownProject => StatusCode::NOT_FOUND,

            Self::Unauthorized | Self::InvalidToken | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            Self::Forbidden | Self::ProjectNotPermitted => StatusCode::FORBIDDEN,

            Self::StorageError => StatusCode::SERVICE_UNAVAILABLE,

            Self::UnknownRole
            | Self::DuplicateRole
            | Self::MissingProjectRole
            | Self::InvalidCatalog
            | Self::MalformedPermissionCache
            | Self::ConfigurationError
            | Self::MissingConfiguration => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "catalog",
            1100..=1199 => "permission",
            2000..=2099 => "storage",
            4000..=4099 => "authentication",
            5000..=5099 => "configuration",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// User errors (bad input, unknown records)
    Low,
    /// Session problems (expired or invalid tokens)
    Medium,
    /// Broken data or configuration
    High,
    /// Failures that abort startup or indicate a bug
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::RecordNotFound
            | ErrorCode::UnknownProject
            | ErrorCode::ProjectNotPermitted
            | ErrorCode::Forbidden => Self::Low,

            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                Self::Medium
            }

            ErrorCode::MalformedPermissionCache | ErrorCode::StorageError => Self::High,

            ErrorCode::UnknownRole
            | ErrorCode::DuplicateRole
            | ErrorCode::MissingProjectRole
            | ErrorCode::InvalidCatalog
            | ErrorCode::ConfigurationError
            | ErrorCode::MissingConfiguration => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Additional structured details about an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Additional context key-value pairs
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Related entity ID (user, role, project)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Related entity type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    fn is_empty(&self) -> bool {
        self.context.is_empty() && self.entity_id.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Lectern Core.
#[derive(Error, Debug)]
pub struct LecternError {
    /// Machine-readable error code
    code: ErrorCode,

    /// User-friendly error message (safe to expose to clients)
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// Additional structured details
    details: ErrorDetails,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for LecternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl LecternError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create an error with both user and internal messages.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// Create a not found error.
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let entity_id = entity_id.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("{} not found: {}", entity_type, entity_id),
        )
        .with_details(ErrorDetails::new().with_entity(&entity_type, &entity_id))
    }

    /// Create a storage error, for [`UserStore`](crate::rbac::UserStore)
    /// implementations over external storage.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::StorageError, "The user store is unavailable", message)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Add error details.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    /// Add context to details.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.context.insert(key.into(), v);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    source = ?self.source,
                    "Lectern error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    "Lectern error"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    "Lectern error"
                );
            }
        }
    }

    fn record_metrics(&self) {
        counter!(
            crate::telemetry::metrics::ERRORS_TOTAL,
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
            "severity" => format!("{:?}", self.severity()),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Whether the request was successful (always false for errors)
    pub success: bool,

    /// Error information
    pub error: ErrorInfo,
}

/// Detailed error information for API responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&LecternError> for ErrorResponse {
    fn from(error: &LecternError) -> Self {
        Self {
            success: false,
            error: ErrorInfo {
                code: error.code,
                numeric_code: error.code.numeric_code(),
                message: error.user_message.to_string(),
                details: if error.details.is_empty() {
                    None
                } else {
                    Some(error.details.clone())
                },
                timestamp: chrono::Utc::now(),
            },
        }
    }
}

impl IntoResponse for LecternError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.http_status();
        let response = ErrorResponse::from(&self);

        (status, Json(response)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<CatalogError> for LecternError {
    fn from(error: CatalogError) -> Self {
        let code = match &error {
            CatalogError::UnknownRole { .. } => ErrorCode::UnknownRole,
            CatalogError::DuplicateRole(_) => ErrorCode::DuplicateRole,
            CatalogError::MissingProjectRole(_) => ErrorCode::MissingProjectRole,
            _ => ErrorCode::InvalidCatalog,
        };
        Self::with_internal(code, "The role catalog is invalid", error.to_string())
            .with_source(error)
    }
}

impl From<jsonwebtoken::errors::Error> for LecternError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        let (code, user_msg) = match error.kind() {
            ErrorKind::ExpiredSignature => (ErrorCode::TokenExpired, "The session has expired"),
            ErrorKind::InvalidKeyFormat => {
                (ErrorCode::ConfigurationError, "Session signing key is invalid")
            }
            _ => (ErrorCode::InvalidToken, "The session token is invalid"),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
