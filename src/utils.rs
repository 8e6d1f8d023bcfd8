//! Utility functions for TrustPay operations.
//!
//! Helpers for identifiers, amount and timestamp formatting, and the Basic
//! authorization header used by the token endpoint.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Generates an order message id of the form `{account_id}-{12 hex chars}`.
///
/// # Examples
///
/// ```
/// use trustpay::utils::generate_message_id;
///
/// let id = generate_message_id("2107920199");
/// assert_eq!(id.len(), "2107920199".len() + 13);
/// assert!(id.starts_with("2107920199-"));
/// ```
pub fn generate_message_id(account_id: &str) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let suffix: [u8; 6] = rng.gen();
    format!("{}-{}", account_id, hex::encode(suffix))
}

/// Renders an amount with exactly two decimal places.
///
/// Rounds to cents, half away from zero, keeping exactly two decimal places.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use trustpay::utils::round_amount;
///
/// assert_eq!(round_amount(Decimal::new(10005, 3)), Decimal::new(1001, 2));
/// assert_eq!(round_amount(Decimal::new(10, 0)).to_string(), "10.00");
/// ```
pub fn round_amount(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Rounds half away from zero, the way amounts are quoted to TrustPay.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use trustpay::utils::format_amount;
///
/// assert_eq!(format_amount(Decimal::new(100, 0)), "100.00");
/// assert_eq!(format_amount(Decimal::new(9995, 3)), "10.00");
/// ```
pub fn format_amount(amount: Decimal) -> String {
    round_amount(amount).to_string()
}

/// ISO-8601 timestamp truncated to whole seconds (`2024-01-31T08:15:00`).
pub fn format_creation_date_time(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// ISO-8601 calendar date (`2024-01-31`).
pub fn format_execution_date(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Builds the value of a Basic `Authorization` header.
///
/// # Examples
///
/// ```
/// use trustpay::utils::basic_auth_header;
///
/// assert_eq!(basic_auth_header("user", "pass"), "Basic dXNlcjpwYXNz");
/// ```
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let encoded = BASE64.encode(format!("{}:{}", username, password).as_bytes());
    format!("Basic {}", encoded)
}

/// Builds the value of a bearer `Authorization` header.
pub fn bearer_auth_header(token: &str) -> String {
    format!("bearer {}", token)
}
