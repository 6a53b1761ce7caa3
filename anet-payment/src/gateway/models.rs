//! Typed request and result models for gateway operations.
//!
//! Every request carries its own [`Credentials`]; the client keeps no per-merchant
//! state between calls.

use std::fmt;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Merchant credentials for one gateway call.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// API login ID.
    pub api_login: String,
    /// API transaction key.
    pub transaction_key: SecretString,
    /// Signature key used to verify `transHashSha2`, hex encoded.
    pub signature_key: Option<SecretString>,
    /// Production endpoint when true, sandbox otherwise.
    pub is_live_mode: bool,
}

impl Credentials {
    /// Creates sandbox credentials without a signature key.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn sandbox(api_login: impl Into<String>, transaction_key: impl Into<String>) -> Self {
        Self {
            api_login: api_login.into(),
            transaction_key: SecretString::from(transaction_key.into()),
            signature_key: None,
            is_live_mode: false,
        }
    }

    /// Switches these credentials to the production endpoint.
    #[must_use]
    pub fn live(mut self) -> Self {
        self.is_live_mode = true;
        self
    }

    /// Attaches a signature key for response hash verification.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_signature_key(mut self, key: impl Into<String>) -> Self {
        self.signature_key = Some(SecretString::from(key.into()));
        self
    }
}

/// Gateway transaction outcome, decoded from the `responseCode` field.
///
/// # Examples
///
/// ```
/// use anet_payment::gateway::TransactionOutcome;
///
/// assert_eq!(TransactionOutcome::from_code("1"), TransactionOutcome::Approved);
/// assert_eq!(TransactionOutcome::from_code("4"), TransactionOutcome::HeldForReview);
/// assert_eq!(TransactionOutcome::from_code("9"), TransactionOutcome::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionOutcome {
    /// Response code `1`.
    Approved,
    /// Response code `2`.
    Declined,
    /// Response code `3`.
    Error,
    /// Response code `4`.
    HeldForReview,
    /// Any other code, including a missing one.
    Unknown,
}

impl TransactionOutcome {
    /// Maps a gateway response code to an outcome. Never fails.
    ///
    /// Codes are matched exactly; surrounding whitespace makes a code unknown.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "1" => Self::Approved,
            "2" => Self::Declined,
            "3" => Self::Error,
            "4" => Self::HeldForReview,
            _ => Self::Unknown,
        }
    }
}

/// How an approved create-transaction call settles funds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentActionType {
    /// Authorize and capture in one step.
    #[default]
    #[serde(rename = "Sale")]
    Sale,
    /// Authorize only; a later capture settles the funds.
    #[serde(rename = "Authorization/Capture")]
    AuthorizationCapture,
}

impl fmt::Display for PaymentActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sale => f.write_str("Sale"),
            Self::AuthorizationCapture => f.write_str("Authorization/Capture"),
        }
    }
}

/// Tokenized credit card data, optionally routed through a detokenizing proxy.
#[derive(Clone, Default)]
pub struct CreditCard {
    /// Card number (usually a vault alias, not a real PAN).
    pub card_number: String,
    /// Expiration, `YYYY-MM` or `MMYY`.
    pub expiration: String,
    /// Card code (vault alias).
    pub card_code: Option<String>,
    /// Proxy endpoint the XML request is sent to instead of the gateway.
    pub proxy_endpoint_url: Option<String>,
    /// Name of the configured proxy whose bearer token authenticates the call.
    pub proxy_name: Option<String>,
}

impl fmt::Debug for CreditCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreditCard")
            .field("card_number", &crate::gateway::mask::mask_card_number(&self.card_number))
            .field("expiration", &"****")
            .field("card_code", &self.card_code.as_ref().map(|_| "***"))
            .field("proxy_endpoint_url", &self.proxy_endpoint_url)
            .field("proxy_name", &self.proxy_name)
            .finish()
    }
}

/// Payment instrument for a create-transaction call.
#[derive(Debug, Clone)]
pub enum PaymentSource {
    /// Accept.js payment nonce.
    Nonce {
        /// Must be `COMMON.ACCEPT.INAPP.PAYMENT` for Accept.js nonces.
        data_descriptor: String,
        /// Nonce value.
        data_value: String,
    },
    /// Tokenized card data.
    CreditCard(CreditCard),
}

/// Request for the merchant's public client key (Accept.js).
#[derive(Debug, Clone)]
pub struct PublicClientKeyRequest {
    /// Merchant credentials.
    pub credentials: Credentials,
}

/// Result of [`PublicClientKeyRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicClientKeyResult {
    /// API result code was `Ok`.
    pub is_success: bool,
    /// Public client key for the checkout form.
    pub client_key: Option<String>,
    /// API-level messages.
    pub messages: Vec<TransactionMessage>,
}

/// Request to charge or authorize a payment.
#[derive(Debug, Clone)]
pub struct CreateTransactionRequest {
    /// Merchant credentials.
    pub credentials: Credentials,
    /// Amount to charge.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: String,
    /// Platform order id.
    pub order_id: String,
    /// Platform order number, sent as the PO number.
    pub order_number: String,
    /// Sale or authorize-only.
    pub action_type: PaymentActionType,
    /// Nonce or card.
    pub payment: PaymentSource,
}

/// Request to capture a prior authorization.
#[derive(Debug, Clone)]
pub struct CaptureTransactionRequest {
    /// Merchant credentials.
    pub credentials: Credentials,
    /// Authorized transaction id.
    pub transaction_id: String,
    /// Amount to capture.
    pub amount: Decimal,
}

/// Request to refund a settled transaction.
#[derive(Debug, Clone)]
pub struct RefundTransactionRequest {
    /// Merchant credentials.
    pub credentials: Credentials,
    /// Settled transaction id.
    pub transaction_id: String,
    /// Amount to refund.
    pub amount: Decimal,
    /// Masked card number or last four digits from the original transaction.
    pub payment_data: String,
}

/// Request to void an unsettled transaction.
#[derive(Debug, Clone)]
pub struct VoidTransactionRequest {
    /// Merchant credentials.
    pub credentials: Credentials,
    /// Transaction id to void.
    pub transaction_id: String,
}

/// Request for the details of one transaction.
#[derive(Debug, Clone)]
pub struct TransactionDetailsRequest {
    /// Merchant credentials.
    pub credentials: Credentials,
    /// Transaction id to look up.
    pub transaction_id: String,
}

/// A gateway message or error: code plus description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMessage {
    /// Gateway code, e.g. `I00001` or `E00027`.
    pub code: String,
    /// Human-readable description.
    pub description: String,
}

impl TransactionMessage {
    /// Creates a message.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self { code: code.into(), description: description.into() }
    }
}

impl fmt::Display for TransactionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code.is_empty() {
            f.write_str(&self.description)
        } else {
            write!(f, "{}: {}", self.code, self.description)
        }
    }
}

/// Settlement status reported for finalized transactions.
pub const SETTLED_SUCCESSFULLY: &str = "settledSuccessfully";

/// Normalized result of any transaction operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionResult {
    /// API result code was `Ok`.
    pub is_success: bool,
    /// Raw transaction response code, when the gateway sent one.
    pub response_code: Option<String>,
    /// Gateway transaction id.
    pub transaction_id: Option<String>,
    /// Transaction messages, in gateway order.
    pub messages: Vec<TransactionMessage>,
    /// Transaction errors, in gateway order.
    pub errors: Vec<TransactionMessage>,
    /// Transaction status (details call only), e.g. `settledSuccessfully`.
    pub transaction_status: Option<String>,
    /// Transaction type (details call only), e.g. `authCaptureTransaction`.
    pub transaction_type: Option<String>,
    /// Masked account number, e.g. `XXXX1111`.
    pub account_number: Option<String>,
    /// HMAC-SHA512 response hash.
    pub trans_hash_sha2: Option<String>,
}

impl TransactionResult {
    /// Outcome decoded from the response code.
    #[must_use]
    pub fn outcome(&self) -> TransactionOutcome {
        self.response_code.as_deref().map_or(TransactionOutcome::Unknown, TransactionOutcome::from_code)
    }

    /// True when the transaction has settled and can be refunded.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.transaction_status.as_deref() == Some(SETTLED_SUCCESSFULLY)
    }

    /// First transaction message, or an empty one.
    #[must_use]
    pub fn first_message(&self) -> TransactionMessage {
        self.messages.first().cloned().unwrap_or_default()
    }

    /// Errors, or messages when there are no errors, joined for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let source = if self.errors.is_empty() { &self.messages } else { &self.errors };
        if source.is_empty() {
            return "no details provided".to_owned();
        }
        source.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(TransactionOutcome::from_code("1"), TransactionOutcome::Approved);
        assert_eq!(TransactionOutcome::from_code("2"), TransactionOutcome::Declined);
        assert_eq!(TransactionOutcome::from_code("3"), TransactionOutcome::Error);
        assert_eq!(TransactionOutcome::from_code("4"), TransactionOutcome::HeldForReview);
    }

    #[test]
    fn test_unknown_codes() {
        for code in ["", "0", "5", "01", "approved", "11"] {
            assert_eq!(TransactionOutcome::from_code(code), TransactionOutcome::Unknown, "{code}");
        }
    }

    #[test]
    fn test_padded_codes_are_unknown() {
        for code in [" 1", "1 ", "4\n", "\t2", " 3 "] {
            assert_eq!(TransactionOutcome::from_code(code), TransactionOutcome::Unknown, "{code:?}");
        }
    }

    proptest! {
        #[test]
        fn test_unrecognized_codes_map_to_unknown(code in "\\PC*") {
            prop_assume!(!["1", "2", "3", "4"].contains(&code.as_str()));
            prop_assert_eq!(TransactionOutcome::from_code(&code), TransactionOutcome::Unknown);
        }

        #[test]
        fn test_whitespace_around_known_codes_is_unknown(
            code in "[1-4]",
            before in "[ \t\n]{0,2}",
            after in "[ \t\n]{0,2}"
        ) {
            prop_assume!(!before.is_empty() || !after.is_empty());
            let padded = format!("{before}{code}{after}");
            prop_assert_eq!(TransactionOutcome::from_code(&padded), TransactionOutcome::Unknown);
        }

        #[test]
        fn test_mapping_is_deterministic(code in "[0-9]{0,3}") {
            prop_assert_eq!(TransactionOutcome::from_code(&code), TransactionOutcome::from_code(&code));
        }
    }

    #[test]
    fn test_result_without_code_is_unknown() {
        let result = TransactionResult::default();
        assert_eq!(result.outcome(), TransactionOutcome::Unknown);
        assert!(!result.is_settled());
    }

    #[test]
    fn test_settlement_flag() {
        let result = TransactionResult {
            transaction_status: Some("settledSuccessfully".into()),
            ..TransactionResult::default()
        };
        assert!(result.is_settled());

        let pending = TransactionResult {
            transaction_status: Some("capturedPendingSettlement".into()),
            ..TransactionResult::default()
        };
        assert!(!pending.is_settled());
    }

    #[test]
    fn test_summary_prefers_errors() {
        let result = TransactionResult {
            messages: vec![TransactionMessage::new("1", "This transaction has been approved.")],
            errors: vec![
                TransactionMessage::new("11", "A duplicate transaction has been submitted."),
                TransactionMessage::new("", "Try again later."),
            ],
            ..TransactionResult::default()
        };
        assert_eq!(
            result.summary(),
            "11: A duplicate transaction has been submitted.; Try again later."
        );
    }

    #[test]
    fn test_summary_falls_back_to_messages() {
        let result = TransactionResult {
            messages: vec![TransactionMessage::new("4", "The code returned from the processor indicating that the card used needs to be picked up.")],
            ..TransactionResult::default()
        };
        assert!(result.summary().starts_with("4: "));
        assert_eq!(TransactionResult::default().summary(), "no details provided");
    }

    #[test]
    fn test_first_message_default() {
        assert_eq!(TransactionResult::default().first_message(), TransactionMessage::default());
    }

    #[test]
    fn test_action_type_serde_names() {
        #[derive(Deserialize)]
        struct Holder {
            action: PaymentActionType,
        }

        let sale: Holder = toml::from_str(r#"action = "Sale""#).unwrap();
        let auth: Holder = toml::from_str(r#"action = "Authorization/Capture""#).unwrap();
        assert_eq!(sale.action, PaymentActionType::Sale);
        assert_eq!(auth.action, PaymentActionType::AuthorizationCapture);
        assert!(toml::from_str::<Holder>(r#"action = "Capture""#).is_err());
        assert_eq!(auth.action.to_string(), "Authorization/Capture");
    }

    #[test]
    fn test_credit_card_debug_is_masked() {
        let card = CreditCard {
            card_number: "4111111111111111".into(),
            expiration: "2030-12".into(),
            card_code: Some("123".into()),
            proxy_endpoint_url: None,
            proxy_name: None,
        };
        let debug_str = format!("{card:?}");
        assert!(!debug_str.contains("4111111111111111"));
        assert!(debug_str.contains("1111"));
        assert!(!debug_str.contains("123\""));
    }

    #[test]
    fn test_credentials_builders() {
        let creds = Credentials::sandbox("login", "key").live().with_signature_key("ABCD");
        assert!(creds.is_live_mode);
        assert!(creds.signature_key.is_some());
        assert!(!format!("{creds:?}").contains("\"key\""));
    }
}
