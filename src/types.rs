//! Core type definitions for the TrustPay API.
//!
//! This module contains the credentials, request records and response
//! records exchanged with the provider, along with the private wire shapes
//! they are serialized into.

use crate::errors::{Result, TrustPayError};
use crate::utils::round_amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Payment type code TrustPay assigns to refunds.
pub const REFUND_PAYMENT_TYPE: u8 = 8;

/// Credentials issued by TrustPay for a merchant account.
///
/// Immutable once the client is built. The password and secret key are
/// redacted from `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    /// API username (Basic auth user for the token endpoint)
    pub username: String,

    /// API password
    pub password: String,

    /// Secret key used for HMAC signatures
    pub secret_key: Option<String>,

    /// Merchant account id (AID)
    pub account_id: String,

    /// Project id used by the Payments API
    pub project_id: String,
}

impl Credentials {
    /// Creates credentials without a secret key.
    ///
    /// # Examples
    ///
    /// ```
    /// use trustpay::types::Credentials;
    ///
    /// let creds = Credentials::new("user", "pass", "2107920199", "4107000001")
    ///     .with_secret_key("abcd1234");
    /// assert_eq!(creds.secret_key.as_deref(), Some("abcd1234"));
    /// ```
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        account_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            secret_key: None,
            account_id: account_id.into(),
            project_id: project_id.into(),
        }
    }

    /// Sets the secret key used for signing.
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .field("account_id", &self.account_id)
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Currencies accepted by the bank-wire and refund operations.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    /// Euro
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    /// ISO 4217 code of the currency.
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
        }
    }
}

impl FromStr for Currency {
    type Err = TrustPayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EUR" => Ok(Currency::Eur),
            other => Err(TrustPayError::UnsupportedCurrency(other.to_string())),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details of the merchant's own TrustPay account.
///
/// Returned by `GetAccountDetails`; the name and IBAN become the debtor of
/// outgoing bank-wire orders.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AccountDetails {
    /// Numeric account id
    pub account_id: u64,

    /// Account IBAN
    #[serde(rename = "IBAN")]
    pub iban: String,

    /// Account name
    pub account_name: String,

    /// Name of the account owner
    #[serde(default)]
    pub account_owner_name: Option<String>,

    /// Account type (e.g. "Individual")
    #[serde(default)]
    pub account_type: Option<String>,

    /// Whether internal orders may be created
    #[serde(default)]
    pub can_create_internal_order: bool,

    /// Whether bank-wire orders may be created
    #[serde(default)]
    pub can_create_bank_wire_order: bool,

    /// Account currency
    pub currency_code: String,

    /// Accounting balance
    #[serde(default)]
    pub accounting_balance: Option<Decimal>,

    /// Disposable balance
    #[serde(default)]
    pub disposable_balance: Option<Decimal>,

    /// Fee balance
    #[serde(default)]
    pub fee_balance: Option<Decimal>,

    /// Minimal balance
    #[serde(default)]
    pub minimal_balance: Option<Decimal>,
}

/// A bank-wire transfer from the merchant account to a recipient.
///
/// Only the currency is validated; amount sign and range are passed through.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// Amount in major units (e.g. 10.50)
    pub amount: Decimal,

    /// ISO 4217 currency code; only "EUR" is accepted
    pub currency: String,

    /// Name of the recipient
    pub recipient_name: String,

    /// IBAN of the recipient
    pub recipient_iban: String,

    /// BIC of the recipient's bank
    pub bank_bic: Option<String>,

    /// Remittance information
    pub description: String,
}

impl TransferRequest {
    /// Creates a transfer request without a creditor BIC.
    pub fn new(
        amount: Decimal,
        currency: impl Into<String>,
        recipient_name: impl Into<String>,
        recipient_iban: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            currency: currency.into(),
            recipient_name: recipient_name.into(),
            recipient_iban: recipient_iban.into(),
            bank_bic: None,
            description: description.into(),
        }
    }

    /// Sets the BIC of the recipient's bank.
    pub fn with_bank_bic(mut self, bank_bic: impl Into<String>) -> Self {
        self.bank_bic = Some(bank_bic.into());
        self
    }
}

/// Debtor details required by Trustly payments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustlyDetails {
    /// Payer first name
    pub first_name: String,
    /// Payer last name
    pub last_name: String,
    /// Payer email
    pub email: String,
    /// ISO 3166-1 alpha-2 country of the payer
    pub country_code: String,
}

/// Debtor details required by instant bank transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantBankTransferDetails {
    /// Payer full name
    pub name: String,
    /// Payer email
    pub email: String,
}

/// Payment method of a payment session, with the fields each method needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PaymentMethodDetails {
    /// Card payment; no debtor data is sent
    #[default]
    Card,
    /// Trustly redirect-bank payment
    Trustly(TrustlyDetails),
    /// Instant bank transfer redirect-bank payment
    InstantBankTransfer(InstantBankTransferDetails),
}

impl PaymentMethodDetails {
    /// Method name as the Payments API expects it.
    pub fn method_name(&self) -> &'static str {
        match self {
            PaymentMethodDetails::Card => "Card",
            PaymentMethodDetails::Trustly(_) => "Trustly",
            PaymentMethodDetails::InstantBankTransfer(_) => "InstantBankTransfer",
        }
    }

    fn debtor(&self) -> Option<Debtor> {
        match self {
            PaymentMethodDetails::Card => None,
            PaymentMethodDetails::Trustly(d) => Some(Debtor {
                first_name: Some(d.first_name.clone()),
                last_name: Some(d.last_name.clone()),
                name: None,
                email: Some(d.email.clone()),
                address: Some(DebtorAddress {
                    country: d.country_code.clone(),
                }),
            }),
            PaymentMethodDetails::InstantBankTransfer(d) => Some(Debtor {
                first_name: None,
                last_name: None,
                name: Some(d.name.clone()),
                email: Some(d.email.clone()),
                address: None,
            }),
        }
    }
}

/// A card or redirect payment session to open with the Payments API.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    /// Payment method and its method-specific fields
    pub method: PaymentMethodDetails,
    /// Amount in major units
    pub amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Merchant's own reference for the payment
    pub merchant_reference: String,
    /// URL notified by TrustPay when the payment changes state
    pub notification_url: String,
    /// Redirect target after a successful payment
    pub success_url: String,
    /// Redirect target after a failed payment
    pub error_url: String,
    /// Redirect target after a cancelled payment
    pub cancel_url: Option<String>,
}

impl PaymentRequest {
    /// Creates a payment request.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        method: PaymentMethodDetails,
        amount: Decimal,
        currency: impl Into<String>,
        merchant_reference: impl Into<String>,
        notification_url: impl Into<String>,
        success_url: impl Into<String>,
        error_url: impl Into<String>,
    ) -> Self {
        Self {
            method,
            amount,
            currency: currency.into(),
            merchant_reference: merchant_reference.into(),
            notification_url: notification_url.into(),
            success_url: success_url.into(),
            error_url: error_url.into(),
            cancel_url: None,
        }
    }

    /// Sets the redirect target for cancelled payments.
    pub fn with_cancel_url(mut self, cancel_url: impl Into<String>) -> Self {
        self.cancel_url = Some(cancel_url.into());
        self
    }

    /// Builds the nested JSON body sent to `/api/Payments/Payment`.
    pub(crate) fn to_body(&self, project_id: &str) -> CreatePaymentBody {
        CreatePaymentBody {
            payment_method: self.method.method_name(),
            merchant_identification: MerchantIdentification {
                project_id: project_id.to_string(),
            },
            payment_information: PaymentInformation {
                amount: PaymentAmount {
                    amount: round_amount(self.amount),
                    currency: self.currency.clone(),
                },
                references: PaymentReferences {
                    merchant_reference: self.merchant_reference.clone(),
                },
                debtor: self.method.debtor(),
            },
            callback_urls: CallbackUrls {
                success: self.success_url.clone(),
                cancel: self.cancel_url.clone(),
                error: self.error_url.clone(),
                notification: self.notification_url.clone(),
            },
        }
    }
}

/// A refund of an earlier payment.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundRequest {
    /// Amount to refund in major units
    pub amount: Decimal,
    /// ISO 4217 currency code; only "EUR" is accepted
    pub currency: String,
    /// Merchant reference of the refund
    pub reference: String,
    /// TrustPay id of the payment being refunded
    pub payment_request_id: u64,
    /// Optional URL notified when the refund is processed
    pub notification_url: Option<String>,
}

impl RefundRequest {
    /// Creates a refund request.
    pub fn new(
        amount: Decimal,
        currency: impl Into<String>,
        reference: impl Into<String>,
        payment_request_id: u64,
    ) -> Self {
        Self {
            amount,
            currency: currency.into(),
            reference: reference.into(),
            payment_request_id,
            notification_url: None,
        }
    }

    /// Sets the notification URL.
    pub fn with_notification_url(mut self, url: impl Into<String>) -> Self {
        self.notification_url = Some(url.into());
        self
    }
}

/// Response of `CreateOrder`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct OrderResponse {
    /// Whether the order was accepted
    #[serde(default)]
    pub status: bool,

    /// Provider message
    #[serde(default)]
    pub message: Option<String>,

    /// Provider payload (e.g. the order id)
    #[serde(default)]
    pub data: Option<Value>,

    /// Any other fields returned by the provider
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result information attached to Payments API responses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ResultInfo {
    /// Provider result code (0 means success)
    pub result_code: i64,

    /// Free-form additional information
    #[serde(default)]
    pub additional_info: Option<String>,
}

/// Response of `/api/Payments/Payment`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentResponse {
    /// TrustPay id of the new payment
    #[serde(default)]
    pub payment_request_id: Option<u64>,

    /// URL the payer must be redirected to
    #[serde(default)]
    pub gateway_url: Option<String>,

    /// Result of the call
    #[serde(default)]
    pub result_info: Option<ResultInfo>,

    /// Any other fields returned by the provider
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of the refund endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RefundResponse {
    /// Provider result code (0 means success)
    pub result_code: i64,

    /// Any other fields returned by the provider
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RefundResponse {
    /// Whether TrustPay accepted the refund.
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct TokenResponse {
    pub access_token: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AccountDetailsEnvelope {
    pub account_details: AccountDetails,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AccountDetailsBody<'a> {
    pub account_id: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CreateOrderBody {
    pub xml: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CreatePaymentBody {
    pub payment_method: &'static str,
    pub merchant_identification: MerchantIdentification,
    pub payment_information: PaymentInformation,
    pub callback_urls: CallbackUrls,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct MerchantIdentification {
    pub project_id: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PaymentInformation {
    pub amount: PaymentAmount,
    pub references: PaymentReferences,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debtor: Option<Debtor>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PaymentAmount {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PaymentReferences {
    pub merchant_reference: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Debtor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<DebtorAddress>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DebtorAddress {
    pub country: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CallbackUrls {
    pub success: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel: Option<String>,
    pub error: String,
    pub notification: String,
}

/// Form body of the refund call. Field order mirrors the signed message.
#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RefundForm {
    pub account_id: String,
    pub amount: String,
    pub currency: String,
    pub reference: String,
    pub payment_type: u8,
    pub payment_request_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(method: PaymentMethodDetails) -> PaymentRequest {
        PaymentRequest::new(
            method,
            Decimal::new(1050, 2),
            "EUR",
            "order-1",
            "https://shop.test/notify",
            "https://shop.test/ok",
            "https://shop.test/err",
        )
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!("EUR".parse::<Currency>().unwrap(), Currency::Eur);
        let err = "USD".parse::<Currency>().unwrap_err();
        assert!(matches!(err, TrustPayError::UnsupportedCurrency(c) if c == "USD"));
        // Codes are case-sensitive on the wire
        assert!("eur".parse::<Currency>().is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = Credentials::new("user", "hunter2", "A1", "P1").with_secret_key("s3cr3t");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cr3t"));
    }

    #[test]
    fn test_account_details_deserialization() {
        let raw = json!({
            "AccountId": 2107920199u64,
            "IBAN": "SK1799329999999999999999",
            "AccountName": "SOME NAME",
            "AccountOwnerName": "SOME MORE NAME",
            "AccountType": "Individual",
            "CanCreateInternalOrder": true,
            "CanCreateBankWireOrder": true,
            "CurrencyCode": "EUR",
            "AccountingBalance": "9999.99",
            "DisposableBalance": "8888.88",
            "FeeBalance": "4.50",
            "MinimalBalance": "200.00"
        });

        let details: AccountDetails = serde_json::from_value(raw).unwrap();
        assert_eq!(details.account_id, 2107920199);
        assert_eq!(details.iban, "SK1799329999999999999999");
        assert!(details.can_create_bank_wire_order);
        assert_eq!(details.fee_balance, Some(Decimal::new(450, 2)));
    }

    #[test]
    fn test_card_payment_body_has_no_debtor() {
        let body = serde_json::to_value(request(PaymentMethodDetails::Card).to_body("P1"))
            .unwrap();

        assert_eq!(body["PaymentMethod"], "Card");
        assert_eq!(body["MerchantIdentification"]["ProjectId"], "P1");
        assert_eq!(body["PaymentInformation"]["Amount"]["Amount"], 10.5);
        assert_eq!(body["PaymentInformation"]["Amount"]["Currency"], "EUR");
        assert_eq!(
            body["PaymentInformation"]["References"]["MerchantReference"],
            "order-1"
        );
        assert!(body["PaymentInformation"].get("Debtor").is_none());
        assert_eq!(body["CallbackUrls"]["Notification"], "https://shop.test/notify");
        assert!(body["CallbackUrls"].get("Cancel").is_none());
    }

    #[test]
    fn test_trustly_payment_body_merges_debtor() {
        let method = PaymentMethodDetails::Trustly(TrustlyDetails {
            first_name: "Jan".to_string(),
            last_name: "Novak".to_string(),
            email: "jan@example.com".to_string(),
            country_code: "SK".to_string(),
        });
        let body = serde_json::to_value(
            request(method)
                .with_cancel_url("https://shop.test/cancel")
                .to_body("P1"),
        )
        .unwrap();

        let debtor = &body["PaymentInformation"]["Debtor"];
        assert_eq!(body["PaymentMethod"], "Trustly");
        assert_eq!(debtor["FirstName"], "Jan");
        assert_eq!(debtor["LastName"], "Novak");
        assert_eq!(debtor["Email"], "jan@example.com");
        assert_eq!(debtor["Address"]["Country"], "SK");
        assert_eq!(body["CallbackUrls"]["Cancel"], "https://shop.test/cancel");
    }

    #[test]
    fn test_instant_bank_transfer_body() {
        let method = PaymentMethodDetails::InstantBankTransfer(InstantBankTransferDetails {
            name: "Jan Novak".to_string(),
            email: "jan@example.com".to_string(),
        });
        let body = serde_json::to_value(request(method).to_body("P1")).unwrap();

        let debtor = &body["PaymentInformation"]["Debtor"];
        assert_eq!(body["PaymentMethod"], "InstantBankTransfer");
        assert_eq!(debtor["Name"], "Jan Novak");
        assert!(debtor.get("FirstName").is_none());
    }

    #[test]
    fn test_payment_amount_rounds_half_away_from_zero() {
        let mut payment = request(PaymentMethodDetails::Card);
        payment.amount = Decimal::new(10005, 3);

        let body = payment.to_body("P1");
        let amount = body.payment_information.amount.amount;
        assert_eq!(amount.to_string(), "10.01");
        assert_eq!(amount.to_string(), crate::utils::format_amount(payment.amount));

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["PaymentInformation"]["Amount"]["Amount"], 10.01);
    }

    #[test]
    fn test_refund_response_success() {
        let ok: RefundResponse = serde_json::from_value(json!({"ResultCode": 0})).unwrap();
        assert!(ok.is_success());

        let failed: RefundResponse =
            serde_json::from_value(json!({"ResultCode": 1132000, "Detail": "x"})).unwrap();
        assert!(!failed.is_success());
        assert_eq!(failed.extra["Detail"], "x");
    }
}
