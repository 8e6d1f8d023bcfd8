//! The TrustPay API client.
//!
//! [`TrustPayClient`] wraps the API Banking endpoints (account details and
//! bank-wire orders), the Payments API (card and redirect payments) and the
//! signed refund endpoint. Every method is a single request/response cycle;
//! nothing is retried.

use crate::auth::{Authenticator, TokenPolicy};
use crate::errors::{Result, TrustPayError};
use crate::order_xml::CreditTransfer;
use crate::signature::{SignaturePayload, Signature, Signer};
use crate::types::{
    AccountDetails, AccountDetailsBody, AccountDetailsEnvelope, CreateOrderBody, Credentials,
    Currency, OrderResponse, PaymentRequest, PaymentResponse, RefundForm, RefundRequest,
    RefundResponse, TransferRequest, REFUND_PAYMENT_TYPE,
};
use crate::utils::{bearer_auth_header, format_amount};
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Production API host.
pub const DEFAULT_BASE_API_URL: &str = "https://api.trustpay.eu";

/// `POST` endpoint returning the merchant's account details.
pub const ACCOUNT_DETAILS_ENDPOINT: &str = "/ApiBanking/GetAccountDetails";

/// `POST` endpoint accepting bank-wire orders.
pub const CREATE_ORDER_ENDPOINT: &str = "/ApiBanking/CreateOrder";

/// `POST` endpoint opening card and redirect payments.
pub const PAYMENT_ENDPOINT: &str = "/api/Payments/Payment";

/// `POST` endpoint accepting signed refunds.
pub const REFUND_ENDPOINT: &str = "/mapi5/Wire/PayPopup";

const JSON_CONTENT_TYPE: &str = "text/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Configuration for a [`TrustPayClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Merchant credentials
    pub credentials: Credentials,

    /// Base URL of the API
    pub base_url: String,

    /// Log request and response bodies at debug level
    pub debug: bool,

    /// Reuse policy for access tokens
    pub token_policy: TokenPolicy,

    /// Per-request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,

    /// HTTP client to use instead of building one
    pub http_client: Option<Client>,
}

impl ClientConfig {
    /// Creates a configuration targeting the production API.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use trustpay::client::ClientConfig;
    /// use trustpay::types::Credentials;
    ///
    /// let config = ClientConfig::new(Credentials::new("user", "pass", "2107920199", "4107000001"))
    ///     .with_base_url("https://sandbox.example.com")
    ///     .with_timeout(Duration::from_secs(30))
    ///     .with_debug(true);
    ///
    /// assert_eq!(config.base_url, "https://sandbox.example.com");
    /// assert!(config.debug);
    /// ```
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_API_URL.to_string(),
            debug: false,
            token_policy: TokenPolicy::Indefinite,
            timeout: None,
            http_client: None,
        }
    }

    /// Reads the configuration from `TRUSTPAY_*` environment variables.
    ///
    /// Required: `TRUSTPAY_USERNAME`, `TRUSTPAY_PASSWORD`,
    /// `TRUSTPAY_ACCOUNT_ID`, `TRUSTPAY_PROJECT_ID`. Optional:
    /// `TRUSTPAY_SECRET_KEY`, `TRUSTPAY_API_URL`, `TRUSTPAY_DEBUG`,
    /// `TRUSTPAY_TOKEN_TTL_SECS`, `TRUSTPAY_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| TrustPayError::ConfigError(format!("{} is not set", key)))
        };
        let seconds = |key: &str| -> Result<Option<Duration>> {
            lookup(key)
                .map(|raw| {
                    raw.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                        TrustPayError::ConfigError(format!("{} is not a number: {}", key, e))
                    })
                })
                .transpose()
        };

        let mut credentials = Credentials::new(
            required("TRUSTPAY_USERNAME")?,
            required("TRUSTPAY_PASSWORD")?,
            required("TRUSTPAY_ACCOUNT_ID")?,
            required("TRUSTPAY_PROJECT_ID")?,
        );
        credentials.secret_key = lookup("TRUSTPAY_SECRET_KEY");

        let mut config = Self::new(credentials);
        if let Some(url) = lookup("TRUSTPAY_API_URL") {
            config.base_url = url;
        }
        if let Some(flag) = lookup("TRUSTPAY_DEBUG") {
            config.debug = matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(ttl) = seconds("TRUSTPAY_TOKEN_TTL_SECS")? {
            config.token_policy = TokenPolicy::Ttl(ttl);
        }
        config.timeout = seconds("TRUSTPAY_TIMEOUT_SECS")?;

        Ok(config)
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Enables or disables body logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the token reuse policy.
    pub fn with_token_policy(mut self, policy: TokenPolicy) -> Self {
        self.token_policy = policy;
        self
    }

    /// Sets a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a custom HTTP client. A configured timeout is ignored in that case.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

/// Client for the TrustPay APIs.
///
/// Safe to share between tasks behind an `Arc`; the token cache is the only
/// mutable state.
#[derive(Debug)]
pub struct TrustPayClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
    auth: Authenticator,
    signer: Signer,
    debug: bool,
}

impl TrustPayClient {
    /// Builds a client. No request is sent until the first operation.
    ///
    /// # Errors
    ///
    /// [`TrustPayError::UrlParseError`] for an invalid base URL, or
    /// [`TrustPayError::HttpError`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Url::parse(&config.base_url)?;
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let http = match config.http_client {
            Some(client) => client,
            None => {
                let mut builder = Client::builder();
                if let Some(timeout) = config.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build()?
            }
        };

        let auth = Authenticator::new(
            http.clone(),
            &base_url,
            &config.credentials.username,
            &config.credentials.password,
            config.token_policy,
        );
        let signer = Signer::new(config.credentials.secret_key.clone());

        Ok(Self {
            http,
            base_url,
            credentials: config.credentials,
            auth,
            signer,
            debug: config.debug,
        })
    }

    /// The merchant credentials this client was built with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the cached access token, fetching one on first use.
    pub async fn access_token(&self) -> Result<String> {
        self.auth.access_token().await
    }

    /// Fetches the details of the merchant's own account.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use trustpay::client::{ClientConfig, TrustPayClient};
    /// use trustpay::types::Credentials;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = TrustPayClient::new(ClientConfig::new(Credentials::new(
    ///     "user", "pass", "2107920199", "4107000001",
    /// )))?;
    ///
    /// let account = client.account_details().await?;
    /// println!("{} {:?}", account.iban, account.disposable_balance);
    /// # Ok(())
    /// # }
    /// ```
    #[tracing::instrument(name = "Get Account Details", skip(self))]
    pub async fn account_details(&self) -> Result<AccountDetails> {
        let body = AccountDetailsBody {
            account_id: &self.credentials.account_id,
        };
        let envelope: AccountDetailsEnvelope =
            self.post_json(ACCOUNT_DETAILS_ENDPOINT, &body).await?;
        Ok(envelope.account_details)
    }

    /// Transfers money from the merchant account to a recipient IBAN.
    ///
    /// Looks up the merchant account, renders a `pain.001.001.03` document
    /// with it as debtor and submits it to `CreateOrder`.
    ///
    /// # Errors
    ///
    /// [`TrustPayError::UnsupportedCurrency`] for anything but EUR, before
    /// any request is sent; [`TrustPayError::PaymentError`] for non-200
    /// responses.
    #[tracing::instrument(
        name = "Send Money",
        skip(self, request),
        fields(amount = %request.amount, currency = %request.currency)
    )]
    pub async fn send_money(&self, request: &TransferRequest) -> Result<OrderResponse> {
        let currency: Currency = request.currency.parse()?;

        let debtor = self.account_details().await?;
        let document = CreditTransfer::from_transfer(
            &self.credentials.account_id,
            &debtor,
            request,
            currency,
            Utc::now(),
        );
        debug!(message_id = %document.message_id, "Built credit transfer");

        let body = CreateOrderBody {
            xml: document.to_xml()?,
        };
        self.post_json(CREATE_ORDER_ENDPOINT, &body).await
    }

    /// Opens a card or redirect payment session.
    #[tracing::instrument(
        name = "Create Payment",
        skip(self, request),
        fields(
            method = request.method.method_name(),
            amount = %request.amount,
            currency = %request.currency
        )
    )]
    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        let body = request.to_body(&self.credentials.project_id);
        self.post_json(PAYMENT_ENDPOINT, &body).await
    }

    /// Refunds an earlier payment.
    ///
    /// The request carries no bearer token; it is authorized by an HMAC
    /// signature over `AID/AMT/CUR/REF/8/PaymentRequestId`.
    ///
    /// # Errors
    ///
    /// [`TrustPayError::UnsupportedCurrency`] for anything but EUR and
    /// [`TrustPayError::SigningError`] without a secret key, both before any
    /// request is sent; [`TrustPayError::PaymentError`] for non-200 responses.
    #[tracing::instrument(
        name = "Refund Payment",
        skip(self, request),
        fields(amount = %request.amount, payment_request_id = request.payment_request_id)
    )]
    pub async fn refund_payment(&self, request: &RefundRequest) -> Result<RefundResponse> {
        let currency: Currency = request.currency.parse()?;
        let account_id = &self.credentials.account_id;

        let payload = SignaturePayload::refund(
            account_id,
            request.amount,
            currency.as_str(),
            &request.reference,
            request.payment_request_id,
        );
        let signature = self.signer.sign(&payload)?;

        let form = RefundForm {
            account_id: account_id.clone(),
            amount: format_amount(request.amount),
            currency: currency.as_str().to_string(),
            reference: request.reference.clone(),
            payment_type: REFUND_PAYMENT_TYPE,
            payment_request_id: request.payment_request_id,
            notification_url: request.notification_url.clone(),
            signature: signature.into_string(),
        };
        self.post_form(REFUND_ENDPOINT, &form).await
    }

    /// Signs a merchant redirect: AID, AMT, CUR and REF concatenated.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_decimal::Decimal;
    /// use trustpay::client::{ClientConfig, TrustPayClient};
    /// use trustpay::types::Credentials;
    ///
    /// let creds = Credentials::new("user", "pass", "1000", "P1").with_secret_key("testkey");
    /// let client = TrustPayClient::new(ClientConfig::new(creds)).unwrap();
    ///
    /// let signature = client
    ///     .create_merchant_signature(Decimal::new(999, 2), "EUR", "ref123")
    ///     .unwrap();
    /// assert_eq!(
    ///     signature.as_str(),
    ///     "C03CB4DF4E6FD8CBCBFA0103E07E71E4EABD8FA75DB88E0B5C34DC309B27672C"
    /// );
    /// ```
    pub fn create_merchant_signature(
        &self,
        amount: Decimal,
        currency: &str,
        reference: &str,
    ) -> Result<Signature> {
        let payload = SignaturePayload::merchant(
            &self.credentials.account_id,
            &amount.to_string(),
            currency,
            reference,
        );
        Ok(self.signer.sign(&payload)?)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let token = self.auth.access_token().await?;
        let payload = serde_json::to_string(body)?;
        if self.debug {
            debug!(endpoint, body = %payload, "TrustPay request");
        }

        let request = self
            .http
            .post(self.url(endpoint))
            .header(AUTHORIZATION, bearer_auth_header(&token))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(payload);
        self.send(endpoint, request).await
    }

    async fn post_form<B, T>(&self, endpoint: &str, form: &B) -> Result<T>
    where
        B: Serialize + std::fmt::Debug,
        T: DeserializeOwned,
    {
        if self.debug {
            debug!(endpoint, form = ?form, "TrustPay request");
        }

        let request = self
            .http
            .post(self.url(endpoint))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .form(form);
        self.send(endpoint, request).await
    }

    async fn send<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> Result<T> {
        debug!(endpoint, "Sending TrustPay request");

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if self.debug {
            debug!(endpoint, status = status.as_u16(), body = %body, "TrustPay response");
        }

        if status != StatusCode::OK {
            warn!(endpoint, status = status.as_u16(), "TrustPay request failed");
            return Err(TrustPayError::PaymentError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn credentials() -> Credentials {
        Credentials::new("user", "pass", "A1", "P1").with_secret_key("secret")
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new(credentials());
        assert_eq!(config.base_url, DEFAULT_BASE_API_URL);
        assert!(!config.debug);
        assert_eq!(config.token_policy, TokenPolicy::Indefinite);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::new(credentials())
            .with_base_url("http://localhost:8080")
            .with_debug(true)
            .with_token_policy(TokenPolicy::Ttl(Duration::from_secs(60)))
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "http://localhost:8080");
        assert!(config.debug);
        assert_eq!(config.token_policy, TokenPolicy::Ttl(Duration::from_secs(60)));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_config_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("TRUSTPAY_USERNAME", "user"),
            ("TRUSTPAY_PASSWORD", "pass"),
            ("TRUSTPAY_ACCOUNT_ID", "A1"),
            ("TRUSTPAY_PROJECT_ID", "P1"),
            ("TRUSTPAY_SECRET_KEY", "secret"),
            ("TRUSTPAY_DEBUG", "true"),
            ("TRUSTPAY_TOKEN_TTL_SECS", "300"),
        ]))
        .unwrap();

        assert_eq!(config.credentials.account_id, "A1");
        assert_eq!(config.credentials.secret_key.as_deref(), Some("secret"));
        assert_eq!(config.base_url, DEFAULT_BASE_API_URL);
        assert!(config.debug);
        assert_eq!(config.token_policy, TokenPolicy::Ttl(Duration::from_secs(300)));
    }

    #[test]
    fn test_config_from_lookup_missing_variable() {
        let err = ClientConfig::from_lookup(lookup(&[("TRUSTPAY_USERNAME", "user")])).unwrap_err();
        assert!(matches!(err, TrustPayError::ConfigError(msg) if msg.contains("TRUSTPAY_PASSWORD")));

        let err = ClientConfig::from_lookup(lookup(&[
            ("TRUSTPAY_USERNAME", "user"),
            ("TRUSTPAY_PASSWORD", "pass"),
            ("TRUSTPAY_ACCOUNT_ID", "A1"),
            ("TRUSTPAY_PROJECT_ID", "P1"),
            ("TRUSTPAY_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, TrustPayError::ConfigError(_)));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = TrustPayClient::new(ClientConfig::new(credentials()).with_base_url("not a url"))
            .unwrap_err();
        assert!(matches!(err, TrustPayError::UrlParseError(_)));
    }

    #[test]
    fn test_url_building() {
        let client =
            TrustPayClient::new(ClientConfig::new(credentials()).with_base_url("http://localhost:1/"))
                .unwrap();
        assert_eq!(
            client.url(REFUND_ENDPOINT),
            "http://localhost:1/mapi5/Wire/PayPopup"
        );
    }

    #[test]
    fn test_merchant_signature() {
        let client = TrustPayClient::new(ClientConfig::new(credentials())).unwrap();
        let signature = client
            .create_merchant_signature(Decimal::new(999, 2), "EUR", "ref123")
            .unwrap();
        assert_eq!(
            signature.as_str(),
            "651FE95C60AADE33E503CF00DB8923FBB399F6540CA67FEB8DF8CFA6BAC63438"
        );
    }

    #[test]
    fn test_merchant_signature_without_key() {
        let creds = Credentials::new("user", "pass", "A1", "P1");
        let client = TrustPayClient::new(ClientConfig::new(creds)).unwrap();
        let err = client
            .create_merchant_signature(Decimal::new(999, 2), "EUR", "ref123")
            .unwrap_err();
        assert!(matches!(err, TrustPayError::SigningError(_)));
    }
}
