use thiserror::Error;

/// Product info error types
#[derive(Debug, Error)]
pub enum ProductInfoError {
    /// A billing region label did not resolve to a known region
    #[error("couldn't find region: {0}")]
    RegionNotFound(String),
    /// A billing record could not be parsed
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    /// A vendor's refresh could not fetch its data
    #[error("failed to fetch product info from {vendor}: {message}")]
    VendorFetchFailure { vendor: String, message: String },
    /// The vendor does not support the requested operation
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// Nothing cached (or registered) under the requested key
    #[error("not found: {0}")]
    NotFound(String),
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProductInfoError>;

impl ProductInfoError {
    /// Wrap any adapter error as a fetch failure of `vendor`
    pub fn vendor_fetch(vendor: &str, err: impl std::fmt::Display) -> Self {
        Self::VendorFetchFailure {
            vendor: vendor.to_string(),
            message: err.to_string(),
        }
    }
}

/// Stable label for metrics and logs
pub fn error_type_name(error: &ProductInfoError) -> &'static str {
    match error {
        ProductInfoError::RegionNotFound(_) => "region_not_found",
        ProductInfoError::MalformedRecord(_) => "malformed_record",
        ProductInfoError::VendorFetchFailure { .. } => "vendor_fetch_failure",
        ProductInfoError::UnsupportedOperation(_) => "unsupported_operation",
        ProductInfoError::NotFound(_) => "not_found",
        ProductInfoError::Config(_) => "config_error",
        ProductInfoError::Http(_) => "http_request_error",
        ProductInfoError::Io(_) => "io_error",
        ProductInfoError::Json(_) => "json_error",
    }
}
