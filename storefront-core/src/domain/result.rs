//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Expected business outcomes that the UI shows a specific message for
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rejection {
    #[error("This item is already in your wishlist")]
    DuplicateWishlistEntry,

    #[error("Select at least one item to check out")]
    EmptyCheckout,

    #[error("Please sign in to check out")]
    NotAuthenticated,
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// Device storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// A remote call failed or returned a non-2xx status
    #[error("Network error: {message}")]
    Network {
        status: Option<u16>,
        message: String,
    },

    #[error("{0}")]
    Rejected(Rejection),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A versioned write lost against a concurrent writer
    #[error("Write conflict on '{0}'")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a network error without an HTTP status
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: msg.into(),
        }
    }

    /// Create a network error for an HTTP status
    pub fn http(status: u16, msg: impl Into<String>) -> Self {
        Self::Network {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Error::Rejected(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. })
    }

    /// Short message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            Error::Rejected(r) => r.to_string(),
            Error::Network { .. } => "Something went wrong. Please try again.".to_string(),
            Error::NotFound(_) => "That item is no longer in your cart".to_string(),
            _ => "Something went wrong".to_string(),
        }
    }
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        Error::Rejected(rejection)
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for serialization to UI callers)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            rejection: None,
            context: None,
        }
    }

    /// Create a successful result with context
    pub fn ok_with_context(data: T, context: HashMap<String, serde_json::Value>) -> Self {
        Self {
            context: Some(context),
            ..Self::ok(data)
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            rejection: None,
            context: None,
        }
    }

    /// Create a failed result for a business rejection
    pub fn rejected(rejection: Rejection) -> Self {
        Self {
            rejection: Some(rejection),
            ..Self::fail(rejection.to_string())
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(Error::Rejected(r)) => Self::rejected(r),
            Err(e) => Self::fail(e.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_operation_result_fail() {
        let result: OperationResult<i32> = OperationResult::fail("Something went wrong");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error, Some("Something went wrong".to_string()));
    }

    #[test]
    fn test_rejection_is_distinguishable() {
        let err: Result<i32> = Err(Rejection::DuplicateWishlistEntry.into());
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert_eq!(result.rejection, Some(Rejection::DuplicateWishlistEntry));
        assert!(result.error.unwrap().contains("wishlist"));
    }

    #[test]
    fn test_network_errors_show_generic_notice() {
        let err: Result<i32> = Err(Error::http(503, "Service Unavailable"));
        let result: OperationResult<i32> = err.into();
        assert!(result.rejection.is_none());
        assert!(result.error.unwrap().contains("try again"));
    }

    #[test]
    fn test_rejection_serializes_camel_case() {
        let json = serde_json::to_string(&Rejection::EmptyCheckout).unwrap();
        assert_eq!(json, r#""emptyCheckout""#);
    }
}
