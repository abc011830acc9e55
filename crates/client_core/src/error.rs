use std::fmt;

use thiserror::Error;

use crate::forms::FormError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOperation {
    Fetch,
    Create,
    Update,
    Delete,
}

impl fmt::Display for CatalogOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CatalogOperation::Fetch => "fetch products",
            CatalogOperation::Create => "create product",
            CatalogOperation::Update => "update product",
            CatalogOperation::Delete => "delete product",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid product: {0}")]
    Validation(#[from] FormError),
    #[error("{operation} rejected by backend: {message}")]
    Rejected {
        operation: CatalogOperation,
        message: String,
    },
    #[error("{operation} failed: {source}")]
    Transport {
        operation: CatalogOperation,
        source: anyhow::Error,
    },
}

impl CatalogError {
    pub fn rejected(operation: CatalogOperation, reason: Option<String>) -> Self {
        Self::Rejected {
            operation,
            message: reason.unwrap_or_else(|| "no success status in response".to_string()),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CatalogError::Validation(_))
    }
}
