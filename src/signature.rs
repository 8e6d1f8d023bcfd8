//! HMAC-SHA256 request signatures.
//!
//! TrustPay authenticates redirects and refunds with an HMAC-SHA256 code
//! keyed by the merchant's secret key. The signed message is the ordered
//! concatenation of a fixed set of fields; the order and separator are part
//! of the wire format. The digest is rendered as 64 uppercase hex characters.

use crate::errors::SigningError;
use crate::types::REFUND_PAYMENT_TYPE;
use crate::utils::format_amount;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// An uppercase hex HMAC-SHA256 signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    /// Signature as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the signature, returning the hex string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered fields of a signed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePayload {
    fields: Vec<String>,
    separator: &'static str,
}

impl SignaturePayload {
    /// Fields concatenated verbatim, without a delimiter.
    pub fn concatenated<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            separator: "",
        }
    }

    /// Merchant redirect signature: AID, AMT, CUR, REF.
    pub fn merchant(account_id: &str, amount: &str, currency: &str, reference: &str) -> Self {
        Self::concatenated([account_id, amount, currency, reference])
    }

    /// Refund signature: AID/AMT/CUR/REF/PaymentType/PaymentRequestId.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_decimal::Decimal;
    /// use trustpay::signature::SignaturePayload;
    ///
    /// let payload = SignaturePayload::refund("A1", Decimal::new(100, 0), "EUR", "R1", 55);
    /// assert_eq!(payload.message(), "A1/100.00/EUR/R1/8/55");
    /// ```
    pub fn refund(
        account_id: &str,
        amount: Decimal,
        currency: &str,
        reference: &str,
        payment_request_id: u64,
    ) -> Self {
        Self {
            fields: vec![
                account_id.to_string(),
                format_amount(amount),
                currency.to_string(),
                reference.to_string(),
                REFUND_PAYMENT_TYPE.to_string(),
                payment_request_id.to_string(),
            ],
            separator: "/",
        }
    }

    /// The exact message that is fed to the HMAC.
    pub fn message(&self) -> String {
        self.fields.join(self.separator)
    }
}

/// Signs messages with the merchant secret key.
#[derive(Clone)]
pub struct Signer {
    secret_key: Option<String>,
}

impl Signer {
    /// Creates a signer. A missing or empty key makes every `sign` call fail.
    pub fn new(secret_key: Option<String>) -> Self {
        Self { secret_key }
    }

    /// Signs the payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use trustpay::signature::{SignaturePayload, Signer};
    ///
    /// let signer = Signer::new(Some("testkey".to_string()));
    /// let payload = SignaturePayload::concatenated(["1000", "9.99", "EUR", "ref123"]);
    /// let signature = signer.sign(&payload).unwrap();
    /// assert_eq!(signature.as_str().len(), 64);
    /// ```
    pub fn sign(&self, payload: &SignaturePayload) -> Result<Signature, SigningError> {
        self.sign_message(payload.message().as_bytes())
    }

    /// Signs raw message bytes.
    pub fn sign_message(&self, message: &[u8]) -> Result<Signature, SigningError> {
        let key = match self.secret_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(SigningError::MissingKey),
        };

        // HMAC accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|_| SigningError::MissingKey)?;
        mac.update(message);
        let digest = mac.finalize().into_bytes();

        Ok(Signature(hex::encode_upper(digest)))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Compares a signature received from TrustPay with a locally computed one.
///
/// Plain string equality; the comparison is not constant-time.
pub fn verify_signature(expected: &str, computed: &str) -> bool {
    expected == computed
}
