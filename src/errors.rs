use serde::Serialize;

use crate::models::ProductId;

/// Failures talking to the remote product catalog.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Catalog responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode catalog response: {0}")]
    Decode(String),

    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),
}

impl CatalogError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Timeout
        } else if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else {
            CatalogError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for CatalogError {
    fn from(err: url::ParseError) -> Self {
        CatalogError::InvalidUrl(err.to_string())
    }
}

/// Outcomes of the scan workflow that are surfaced to the operator.
///
/// None of these are fatal: every variant leaves the controller ready to
/// scan again, or keeps the draft for resubmission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ScanError {
    #[error("Invalid barcode '{raw}'")]
    InvalidFormat { raw: String },

    #[error("Catalog did not respond in time")]
    NetworkTimeout,

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Missing required fields: {}", fields.join(", "))]
    ValidationIncomplete { fields: Vec<String> },
}

impl ScanError {
    /// Whether the operator can usefully repeat the same action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkTimeout | Self::NetworkError { .. })
    }
}

impl From<CatalogError> for ScanError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Timeout => ScanError::NetworkTimeout,
            other => ScanError::NetworkError {
                message: other.to_string(),
            },
        }
    }
}

/// Failures of the list, edit and stock operations.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Product {0} not found")]
    NotFound(ProductId),

    #[error("Product {product} has no stock entry {stock_id}")]
    UnknownStock { product: ProductId, stock_id: i64 },

    #[error("Stock {stock_id} would drop to {quantity}")]
    NegativeQuantity { stock_id: i64, quantity: i64 },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl From<ScanError> for InventoryError {
    fn from(err: ScanError) -> Self {
        InventoryError::ValidationError(err.to_string())
    }
}

/// Access gate failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No operators are configured")]
    NoOperatorsConfigured,

    #[error("Access key is empty")]
    EmptyKey,

    #[error("Access key is not recognised")]
    InvalidKey,
}
