//! Provider callback validation.

use crate::error::CallbackError;
use std::collections::HashMap;

/// Outcome of inspecting the callback query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResult {
    Success { code: String },
    Failure(CallbackError),
}

impl CallbackResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn into_result(self) -> Result<String, CallbackError> {
        match self {
            Self::Success { code } => Ok(code),
            Self::Failure(error) => Err(error),
        }
    }
}

/// Extract the authorization code from decoded callback parameters.
///
/// An `error` parameter always wins, even when a `code` came along with it.
/// The code is returned exactly as received.
pub fn parse_callback(query: &HashMap<String, String>) -> CallbackResult {
    if let Some(error) = query.get("error") {
        return CallbackResult::Failure(CallbackError::ProviderError {
            error: error.clone(),
            description: query.get("error_description").cloned(),
        });
    }

    match query.get("code") {
        Some(code) => CallbackResult::Success { code: code.clone() },
        None => CallbackResult::Failure(CallbackError::MissingCode),
    }
}
