//! Explicit success/failure outcome for webhook processing.
//!
//! Callers inspect `is_success` instead of matching on errors; business
//! validation failures and transport failures surface through the same
//! shape.

use serde::{Deserialize, Serialize};

/// Tagged outcome of a processing operation.
///
/// Serializes as `{"isSuccess": ..., "message": ..., "data": ...}` with
/// absent fields omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult<T> {
    pub is_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> OperationResult<T> {
    /// Successful outcome carrying a payload.
    pub fn success(data: T) -> Self {
        Self {
            is_success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Failed outcome carrying a human-readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}
