//! Example TrustPay client.
//!
//! Looks up the merchant account and, if `TRANSFER_IBAN` is set, sends a
//! small bank-wire transfer to it.
//!
//! Run with:
//! ```bash
//! cargo run --example client
//! ```
//!
//! Environment variables (a `.env` file is read if present):
//! - TRUSTPAY_USERNAME, TRUSTPAY_PASSWORD: API credentials
//! - TRUSTPAY_ACCOUNT_ID, TRUSTPAY_PROJECT_ID: merchant identifiers
//! - TRUSTPAY_SECRET_KEY: signing secret (optional)
//! - TRUSTPAY_API_URL: API host (default: production)
//! - TRANSFER_IBAN, TRANSFER_NAME, TRANSFER_BIC: optional transfer recipient

use rust_decimal::Decimal;
use trustpay::{ClientConfig, TransferRequest, TrustPayClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env()?;
    println!("TrustPay example client");
    println!("   API: {}", config.base_url);
    println!();

    let client = TrustPayClient::new(config)?;

    let account = client.account_details().await?;
    println!("Account {} ({})", account.account_name, account.iban);
    println!("   Currency:   {}", account.currency_code);
    if let Some(balance) = account.disposable_balance {
        println!("   Disposable: {}", balance);
    }

    let Ok(iban) = std::env::var("TRANSFER_IBAN") else {
        println!("TRANSFER_IBAN not set, skipping transfer");
        return Ok(());
    };
    let name = std::env::var("TRANSFER_NAME").unwrap_or_else(|_| "Test Recipient".to_string());

    let mut transfer = TransferRequest::new(Decimal::new(100, 2), "EUR", name, iban, "trustpay-rs test");
    if let Ok(bic) = std::env::var("TRANSFER_BIC") {
        transfer = transfer.with_bank_bic(bic);
    }

    let order = client.send_money(&transfer).await?;
    println!("Order submitted: status={} message={:?}", order.status, order.message);

    Ok(())
}
