//! Error types for the trustpay-rs library.
//!
//! Every operation surfaces failures unchanged through [`TrustPayError`]; the
//! client never retries or recovers locally.

use thiserror::Error;

/// Failure to produce a signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// No secret key was configured, or it was empty
    #[error("no secret key configured")]
    MissingKey,
}

/// Main error type for TrustPay operations.
#[derive(Error, Debug)]
pub enum TrustPayError {
    /// Transport-level failure (connection, TLS, timeout)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error parsing URL
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// The token endpoint rejected the client credentials
    #[error("Authentication failed with status {status}: {body}")]
    AuthenticationError {
        /// HTTP status returned by the token endpoint
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Currency is not accepted by the operation; raised before any request is sent
    #[error("Currency not supported: {0}. Supported currencies: EUR")]
    UnsupportedCurrency(String),

    /// A placeholder of the order XML template was not bound
    #[error("Missing order XML field: {0}")]
    PayloadBuildError(String),

    /// A payment endpoint answered with a non-200 status
    #[error("TrustPay error (status {status}): {body}")]
    PaymentError {
        /// HTTP status returned by the provider
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Signing failed
    #[error("Signing error: {0}")]
    SigningError(#[from] SigningError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for TrustPay operations.
pub type Result<T> = std::result::Result<T, TrustPayError>;
