//! # trustpay-rs
//!
//! A typed Rust client for the TrustPay payment API.
//!
//! The client authenticates with OAuth2 client credentials, signs refunds and
//! merchant redirects with the merchant's HMAC secret, and submits bank-wire
//! orders as ISO 20022 `pain.001.001.03` documents.
//!
//! ## Features
//!
//! - **API Banking**: account details and outgoing SEPA bank-wire orders
//! - **Payments API**: card and redirect-bank (Trustly, instant bank transfer) payments
//! - **Refunds**: HMAC-signed refunds of earlier payments
//! - **Token caching**: one token request per client, or per configurable TTL
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_decimal::Decimal;
//! use trustpay::client::{ClientConfig, TrustPayClient};
//! use trustpay::types::{Credentials, TransferRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials::new("api-user", "api-password", "2107920199", "4107000001")
//!     .with_secret_key("merchant-secret");
//! let client = TrustPayClient::new(ClientConfig::new(credentials))?;
//!
//! let transfer = TransferRequest::new(
//!     Decimal::new(2500, 2),
//!     "EUR",
//!     "Jan Novak",
//!     "SK3112000000198742637541",
//!     "Invoice 42",
//! )
//! .with_bank_bic("GIBASKBX");
//!
//! let order = client.send_money(&transfer).await?;
//! println!("Order accepted: {}", order.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! All operations return [`TrustPayError`]. Non-200 responses become
//! [`TrustPayError::PaymentError`] carrying the status and raw body; currency
//! checks and signing happen before any request is sent.
//!
//! ## Security
//!
//! - Credentials and the secret key are redacted from `Debug` output
//! - [`signature::verify_signature`] is a plain comparison, not constant-time

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod auth;
pub mod client;
pub mod errors;
pub mod order_xml;
pub mod signature;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use auth::TokenPolicy;
pub use client::{ClientConfig, TrustPayClient, DEFAULT_BASE_API_URL};
pub use errors::{Result, SigningError, TrustPayError};
pub use order_xml::{build_credit_transfer_xml, CreditTransfer};
pub use signature::{verify_signature, Signature, SignaturePayload, Signer};
pub use types::{
    AccountDetails, Credentials, Currency, InstantBankTransferDetails, OrderResponse,
    PaymentMethodDetails, PaymentRequest, PaymentResponse, RefundRequest, RefundResponse,
    TransferRequest, TrustlyDetails,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_accessibility() {
        let credentials = Credentials::new("user", "pass", "A1", "P1");
        let client = TrustPayClient::new(ClientConfig::new(credentials)).unwrap();
        assert_eq!(client.credentials().account_id, "A1");
        assert_eq!(DEFAULT_BASE_API_URL, "https://api.trustpay.eu");
    }
}
