//! UI/backend events and error modeling for the catalog GUI.

use client_core::{CatalogOperation, CatalogSnapshot, FetchOutcome};

pub enum UiEvent {
    Info(String),
    Error(UiError),
    Snapshot(CatalogSnapshot),
    FetchFailed(String),
    /// A fetch-type command finished, whatever its outcome.
    FetchSettled(FetchOutcome),
    MutationFinished {
        operation: CatalogOperation,
        result: Result<(), String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Validation,
    Rejected,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Fetch,
    Create,
    Update,
    Delete,
    General,
}

impl From<CatalogOperation> for UiErrorContext {
    fn from(operation: CatalogOperation) -> Self {
        match operation {
            CatalogOperation::Fetch => UiErrorContext::Fetch,
            CatalogOperation::Create => UiErrorContext::Create,
            CatalogOperation::Update => UiErrorContext::Update,
            CatalogOperation::Delete => UiErrorContext::Delete,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("rejected by backend")
            || message_lower.contains("no success status")
        {
            UiErrorCategory::Rejected
        } else if message_lower.contains("invalid product")
            || message_lower.contains("must be")
            || message_lower.contains("cannot be")
            || message_lower.contains("not valid")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("error status")
            || message_lower.contains("request failed")
            || message_lower.contains("unavailable")
            || message_lower.contains("disconnected")
            || message_lower.contains("startup failure")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn title(&self) -> &'static str {
        match (self.context, self.category) {
            (UiErrorContext::BackendStartup, _) => "Backend worker failed to start",
            (_, UiErrorCategory::Transport) => "Could not reach the catalog service",
            (_, UiErrorCategory::Validation) => "Please check the product details",
            (UiErrorContext::Create, _) => "Failed to add product",
            (UiErrorContext::Update, _) => "Failed to update product",
            (UiErrorContext::Delete, _) => "Failed to delete product",
            _ => "Something went wrong",
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category == UiErrorCategory::Transport
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_rejection_wins_over_validation_wording() {
        let err = UiError::from_message(
            CatalogOperation::Update.into(),
            "update product rejected by backend: price must be greater than 0",
        );
        assert_eq!(err.category(), UiErrorCategory::Rejected);
        assert_eq!(err.context(), UiErrorContext::Update);
        assert_eq!(err.title(), "Failed to update product");
        assert!(!err.is_retryable());
    }

    #[test]
    fn form_errors_are_validation() {
        let err = UiError::from_message(
            UiErrorContext::Create,
            "invalid product: product name must be at least 3 characters",
        );
        assert_eq!(err.category(), UiErrorCategory::Validation);
        assert_eq!(err.title(), "Please check the product details");
    }

    #[test]
    fn transport_failures_are_retryable() {
        let err = UiError::from_message(
            UiErrorContext::Fetch,
            "fetch products failed: records list returned an error status",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
        assert!(err.is_retryable());

        let err = UiError::from_message(
            UiErrorContext::General,
            "Backend command processor disconnected (possible startup/runtime failure)",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
    }

    #[test]
    fn startup_failures_have_their_own_title() {
        let err = UiError::from_message(
            UiErrorContext::BackendStartup,
            "backend worker startup failure: backend url must use http:// or https://",
        );
        assert_eq!(err.title(), "Backend worker failed to start");
        assert_eq!(err.message(), "backend worker startup failure: backend url must use http:// or https://");
    }

    #[test]
    fn unrecognised_messages_fall_back_to_unknown() {
        let err = UiError::from_message(UiErrorContext::General, "boom");
        assert_eq!(err.category(), UiErrorCategory::Unknown);
        assert_eq!(err.title(), "Something went wrong");
    }
}
