//! ISO 20022 `pain.001.001.03` credit-transfer documents.
//!
//! Bank-wire orders are submitted to `CreateOrder` as a single
//! customer-credit-transfer-initiation message. The document shape is fixed;
//! only the placeholders below vary per order:
//!
//! `MessageId`, `CreationDateTime`, `RequestedExecutionDate`, `DebtorName`,
//! `DebtorAccount`, `Currency`, `Amount`, `CreditorBankBic`, `CreditorName`,
//! `CreditorAccount`, `Description`.
//!
//! Rendering is strict: every placeholder must be bound, otherwise
//! [`TrustPayError::PayloadBuildError`] names the missing field.

use crate::errors::{Result, TrustPayError};
use crate::types::{AccountDetails, Currency, TransferRequest};
use crate::utils::{
    format_amount, format_creation_date_time, format_execution_date, generate_message_id,
};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Placeholder used when the creditor BIC is unknown.
pub const BIC_NOT_PROVIDED: &str = "NOTPROVIDED";

/// Every placeholder of [`ORDER_XML_TEMPLATE`], in document order.
pub const ORDER_XML_FIELDS: [&str; 11] = [
    "MessageId",
    "CreationDateTime",
    "RequestedExecutionDate",
    "DebtorName",
    "DebtorAccount",
    "Currency",
    "Amount",
    "CreditorBankBic",
    "CreditorName",
    "CreditorAccount",
    "Description",
];

/// The credit-transfer document accepted by TrustPay API Banking.
pub const ORDER_XML_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns:xsd="http://www.w3.org/2001/XMLSchema"
          xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
          xmlns="urn:iso:std:iso:20022:tech:xsd:pain.001.001.03">
    <CstmrCdtTrfInitn>
        <GrpHdr>
            <MsgId>{MessageId}</MsgId>
            <CreDtTm>{CreationDateTime}</CreDtTm>
            <NbOfTxs>1</NbOfTxs>
            <InitgPty/>
        </GrpHdr>
        <PmtInf>
            <PmtInfId>1</PmtInfId>
            <PmtMtd>TRF</PmtMtd>
            <PmtTpInf>
                <LclInstrm>
                    <Prtry>BWT2/EU</Prtry>
                </LclInstrm>
            </PmtTpInf>
            <ReqdExctnDt>{RequestedExecutionDate}</ReqdExctnDt>
            <Dbtr>
                <Nm>{DebtorName}</Nm>
            </Dbtr>
            <DbtrAcct>
                <Id>
                    <Othr>
                        <Id>{DebtorAccount}</Id>
                    </Othr>
                </Id>
            </DbtrAcct>
            <DbtrAgt>
                <FinInstnId>
                    <BIC>TPAYSKBX</BIC>
                </FinInstnId>
            </DbtrAgt>
            <CdtTrfTxInf>
                <PmtId>
                    <EndToEndId>NOTPROVIDED</EndToEndId>
                </PmtId>
                <PmtTpInf>
                    <LclInstrm>
                        <Cd>010000</Cd>
                    </LclInstrm>
                </PmtTpInf>
                <Amt>
                    <InstdAmt Ccy="{Currency}">{Amount}</InstdAmt>
                </Amt>
                <CdtrAgt>
                    <FinInstnId>
                        <BIC>{CreditorBankBic}</BIC>
                    </FinInstnId>
                </CdtrAgt>
                <Cdtr>
                    <Nm>{CreditorName}</Nm>
                </Cdtr>
                <CdtrAcct>
                    <Id>
                        <IBAN>{CreditorAccount}</IBAN>
                    </Id>
                </CdtrAcct>
                <RmtInf>
                    <Ustrd>{Description}</Ustrd>
                </RmtInf>
            </CdtTrfTxInf>
        </PmtInf>
    </CstmrCdtTrfInitn>
</Document>
"#;

/// Renders [`ORDER_XML_TEMPLATE`] with the given bindings.
///
/// Values are XML-escaped. Newlines of the template are collapsed to single
/// spaces and the result is trimmed. Bindings for names that do not occur in
/// the template are ignored.
///
/// # Errors
///
/// Returns [`TrustPayError::PayloadBuildError`] with the first unbound
/// placeholder name.
pub fn build_credit_transfer_xml(fields: &HashMap<&str, String>) -> Result<String> {
    render(ORDER_XML_TEMPLATE, fields)
}

fn render(template: &str, fields: &HashMap<&str, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            TrustPayError::PayloadBuildError(format!("unterminated placeholder: {}", after))
        })?;
        let name = &after[..close];
        let value = fields
            .get(name)
            .ok_or_else(|| TrustPayError::PayloadBuildError(name.to_string()))?;
        out.push_str(&escape(value.as_str()));
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    Ok(out.trim().replace('\n', " "))
}

/// Typed field set of a credit-transfer document.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditTransfer {
    /// Unique message id, `{account_id}-{12 hex chars}`
    pub message_id: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Requested execution date
    pub execution_date: DateTime<Utc>,
    /// Name of the paying merchant account
    pub debtor_name: String,
    /// IBAN of the paying merchant account
    pub debtor_account: String,
    /// Transfer currency
    pub currency: Currency,
    /// Transfer amount in major units
    pub amount: Decimal,
    /// BIC of the creditor's bank
    pub creditor_bank_bic: String,
    /// Name of the creditor
    pub creditor_name: String,
    /// IBAN of the creditor
    pub creditor_account: String,
    /// Remittance information
    pub description: String,
}

impl CreditTransfer {
    /// Builds the document fields for a transfer out of `debtor`'s account.
    ///
    /// The order executes today, and a fresh message id is generated.
    pub fn from_transfer(
        account_id: &str,
        debtor: &AccountDetails,
        request: &TransferRequest,
        currency: Currency,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id: generate_message_id(account_id),
            created_at: now,
            execution_date: now,
            debtor_name: debtor.account_name.clone(),
            debtor_account: debtor.iban.clone(),
            currency,
            amount: request.amount,
            creditor_bank_bic: request
                .bank_bic
                .clone()
                .unwrap_or_else(|| BIC_NOT_PROVIDED.to_string()),
            creditor_name: request.recipient_name.clone(),
            creditor_account: request.recipient_iban.clone(),
            description: request.description.clone(),
        }
    }

    /// Placeholder bindings for every field of the template.
    pub fn to_fields(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            ("MessageId", self.message_id.clone()),
            ("CreationDateTime", format_creation_date_time(self.created_at)),
            ("RequestedExecutionDate", format_execution_date(self.execution_date)),
            ("DebtorName", self.debtor_name.clone()),
            ("DebtorAccount", self.debtor_account.clone()),
            ("Currency", self.currency.as_str().to_string()),
            ("Amount", format_amount(self.amount)),
            ("CreditorBankBic", self.creditor_bank_bic.clone()),
            ("CreditorName", self.creditor_name.clone()),
            ("CreditorAccount", self.creditor_account.clone()),
            ("Description", self.description.clone()),
        ])
    }

    /// Renders the document.
    pub fn to_xml(&self) -> Result<String> {
        build_credit_transfer_xml(&self.to_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn transfer() -> CreditTransfer {
        CreditTransfer {
            message_id: "2107920199-0a1b2c3d4e5f".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 15).unwrap(),
            execution_date: Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap(),
            debtor_name: "SOME NAME".to_string(),
            debtor_account: "SK1799329999999999999999".to_string(),
            currency: Currency::Eur,
            amount: Decimal::new(12345, 2),
            creditor_bank_bic: "GIBASKBX".to_string(),
            creditor_name: "Jan Novak".to_string(),
            creditor_account: "SK3112000000198742637541".to_string(),
            description: "Invoice 42".to_string(),
        }
    }

    fn golden(bindings: &[(&str, &str)]) -> String {
        let mut doc = ORDER_XML_TEMPLATE.to_string();
        for (name, value) in bindings {
            doc = doc.replace(&format!("{{{}}}", name), value);
        }
        doc.trim().replace('\n', " ")
    }

    #[test]
    fn test_render_matches_template() {
        let xml = transfer().to_xml().unwrap();

        let expected = golden(&[
            ("MessageId", "2107920199-0a1b2c3d4e5f"),
            ("CreationDateTime", "2024-03-01T09:30:15"),
            ("RequestedExecutionDate", "2024-03-04"),
            ("DebtorName", "SOME NAME"),
            ("DebtorAccount", "SK1799329999999999999999"),
            ("Currency", "EUR"),
            ("Amount", "123.45"),
            ("CreditorBankBic", "GIBASKBX"),
            ("CreditorName", "Jan Novak"),
            ("CreditorAccount", "SK3112000000198742637541"),
            ("Description", "Invoice 42"),
        ]);
        assert_eq!(xml, expected);
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?> <Document"#));
        assert!(xml.contains(r#"<InstdAmt Ccy="EUR">123.45</InstdAmt>"#));
        assert!(!xml.contains('\n'));
    }

    #[test]
    fn test_each_value_appears_once() {
        let xml = transfer().to_xml().unwrap();
        for (name, value) in transfer().to_fields() {
            assert_eq!(xml.matches(value.as_str()).count(), 1, "field {}", name);
        }
        assert!(!xml.contains('{'));
        assert!(!xml.contains('}'));
    }

    #[test]
    fn test_missing_field_fails() {
        for missing in ORDER_XML_FIELDS {
            let mut fields = transfer().to_fields();
            fields.remove(missing);
            let err = build_credit_transfer_xml(&fields).unwrap_err();
            assert!(
                matches!(&err, TrustPayError::PayloadBuildError(name) if name == missing),
                "unexpected error for {}: {}",
                missing,
                err
            );
        }
    }

    #[test]
    fn test_values_are_escaped() {
        let mut doc = transfer();
        doc.creditor_name = "Novak & Sons <s.r.o.>".to_string();
        let xml = doc.to_xml().unwrap();
        assert!(xml.contains("<Nm>Novak &amp; Sons &lt;s.r.o.&gt;</Nm>"));
    }

    #[test]
    fn test_from_transfer() {
        let debtor: AccountDetails = serde_json::from_value(serde_json::json!({
            "AccountId": 2107920199u64,
            "IBAN": "SK1799329999999999999999",
            "AccountName": "SOME NAME",
            "CurrencyCode": "EUR"
        }))
        .unwrap();
        let request = TransferRequest::new(
            Decimal::new(5, 0),
            "EUR",
            "Jan Novak",
            "SK3112000000198742637541",
            "rent",
        );
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let doc = CreditTransfer::from_transfer("2107920199", &debtor, &request, Currency::Eur, now);
        assert!(doc.message_id.starts_with("2107920199-"));
        assert_eq!(doc.debtor_account, "SK1799329999999999999999");
        assert_eq!(doc.creditor_bank_bic, BIC_NOT_PROVIDED);

        let with_bic = CreditTransfer::from_transfer(
            "2107920199",
            &debtor,
            &request.clone().with_bank_bic("GIBASKBX"),
            Currency::Eur,
            now,
        );
        assert_eq!(with_bic.creditor_bank_bic, "GIBASKBX");
    }
}
