//! Authorize.Net API envelopes.
//!
//! The gateway validates requests against its XML schema even when they arrive as
//! JSON, so struct fields are declared in schema order and serialized as-is. The same
//! request structs feed the XML proxy path; the `@xmlns` attribute is only set there.

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::models::{
    CaptureTransactionRequest, CreateTransactionRequest, Credentials, PaymentActionType,
    PaymentSource, PublicClientKeyResult, RefundTransactionRequest, TransactionMessage,
    TransactionResult, VoidTransactionRequest,
};
use crate::error::{GatewayError, Result};

/// Namespace of the Authorize.Net XML schema.
pub(crate) const ANET_XMLNS: &str = "AnetApi/xml/v1/schema/AnetApiSchema.xsd";

/// Expiration placeholder accepted by the gateway for refunds.
const MASKED_EXPIRATION: &str = "XXXX";

/// Gateway field length limits.
const INVOICE_NUMBER_MAX: usize = 20;
const PO_NUMBER_MAX: usize = 25;

/// Formats an amount the way the gateway echoes it back: two decimal places.
pub(crate) fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

fn truncate(value: &str, max: usize) -> &str {
    value.char_indices().nth(max).map_or(value, |(idx, _)| &value[..idx])
}

/// `transactionType` values used by this adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransactionType {
    AuthCapture,
    AuthOnly,
    PriorAuthCapture,
    Refund,
    Void,
}

impl TransactionType {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::AuthCapture => "authCaptureTransaction",
            Self::AuthOnly => "authOnlyTransaction",
            Self::PriorAuthCapture => "priorAuthCaptureTransaction",
            Self::Refund => "refundTransaction",
            Self::Void => "voidTransaction",
        }
    }
}

impl From<PaymentActionType> for TransactionType {
    fn from(action: PaymentActionType) -> Self {
        match action {
            PaymentActionType::Sale => Self::AuthCapture,
            PaymentActionType::AuthorizationCapture => Self::AuthOnly,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MerchantAuthentication<'a> {
    name: &'a str,
    transaction_key: &'a str,
}

impl<'a> From<&'a Credentials> for MerchantAuthentication<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            name: &credentials.api_login,
            transaction_key: credentials.transaction_key.expose_secret(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreditCardWire<'a> {
    card_number: &'a str,
    expiration_date: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_code: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OpaqueDataWire<'a> {
    data_descriptor: &'a str,
    data_value: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentWire<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    credit_card: Option<CreditCardWire<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    opaque_data: Option<OpaqueDataWire<'a>>,
}

impl<'a> From<&'a PaymentSource> for PaymentWire<'a> {
    fn from(source: &'a PaymentSource) -> Self {
        match source {
            PaymentSource::Nonce { data_descriptor, data_value } => Self {
                opaque_data: Some(OpaqueDataWire { data_descriptor, data_value }),
                ..Self::default()
            },
            PaymentSource::CreditCard(card) => Self {
                credit_card: Some(CreditCardWire {
                    card_number: &card.card_number,
                    expiration_date: &card.expiration,
                    card_code: card.card_code.as_deref(),
                }),
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderWire<'a> {
    invoice_number: &'a str,
    description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionRequestWire<'a> {
    transaction_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment: Option<PaymentWire<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_trans_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<OrderWire<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    po_number: Option<&'a str>,
}

/// Body of `createTransactionRequest`, shared by the JSON and XML paths.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTransactionBody<'a> {
    #[serde(rename = "@xmlns", skip_serializing_if = "Option::is_none")]
    pub(crate) xmlns: Option<&'static str>,
    merchant_authentication: MerchantAuthentication<'a>,
    transaction_request: TransactionRequestWire<'a>,
}

impl<'a> CreateTransactionBody<'a> {
    pub(crate) fn create(request: &'a CreateTransactionRequest) -> Self {
        Self {
            xmlns: None,
            merchant_authentication: (&request.credentials).into(),
            transaction_request: TransactionRequestWire {
                transaction_type: TransactionType::from(request.action_type).as_str(),
                amount: Some(format_amount(request.amount)),
                currency_code: Some(&request.currency_code),
                payment: Some((&request.payment).into()),
                ref_trans_id: None,
                order: Some(OrderWire {
                    invoice_number: truncate(&request.order_number, INVOICE_NUMBER_MAX),
                    description: format!("Order {}", request.order_id),
                }),
                po_number: Some(truncate(&request.order_number, PO_NUMBER_MAX)),
            },
        }
    }

    pub(crate) fn capture(request: &'a CaptureTransactionRequest) -> Self {
        Self::follow_up(
            &request.credentials,
            TransactionType::PriorAuthCapture,
            Some(request.amount),
            None,
            &request.transaction_id,
        )
    }

    pub(crate) fn refund(request: &'a RefundTransactionRequest) -> Self {
        let payment = PaymentWire {
            credit_card: Some(CreditCardWire {
                card_number: &request.payment_data,
                expiration_date: MASKED_EXPIRATION,
                card_code: None,
            }),
            opaque_data: None,
        };
        Self::follow_up(
            &request.credentials,
            TransactionType::Refund,
            Some(request.amount),
            Some(payment),
            &request.transaction_id,
        )
    }

    pub(crate) fn void(request: &'a VoidTransactionRequest) -> Self {
        Self::follow_up(&request.credentials, TransactionType::Void, None, None, &request.transaction_id)
    }

    fn follow_up(
        credentials: &'a Credentials,
        transaction_type: TransactionType,
        amount: Option<Decimal>,
        payment: Option<PaymentWire<'a>>,
        ref_trans_id: &'a str,
    ) -> Self {
        Self {
            xmlns: None,
            merchant_authentication: credentials.into(),
            transaction_request: TransactionRequestWire {
                transaction_type: transaction_type.as_str(),
                amount: amount.map(format_amount),
                currency_code: None,
                payment,
                ref_trans_id: Some(ref_trans_id),
                order: None,
                po_number: None,
            },
        }
    }

    /// Marks the body for XML serialization.
    pub(crate) fn with_namespace(mut self) -> Self {
        self.xmlns = Some(ANET_XMLNS);
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTransactionEnvelope<'a> {
    pub(crate) create_transaction_request: CreateTransactionBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MerchantDetailsBody<'a> {
    merchant_authentication: MerchantAuthentication<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MerchantDetailsEnvelope<'a> {
    get_merchant_details_request: MerchantDetailsBody<'a>,
}

impl<'a> MerchantDetailsEnvelope<'a> {
    pub(crate) fn new(credentials: &'a Credentials) -> Self {
        Self {
            get_merchant_details_request: MerchantDetailsBody {
                merchant_authentication: credentials.into(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionDetailsBody<'a> {
    merchant_authentication: MerchantAuthentication<'a>,
    trans_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionDetailsEnvelope<'a> {
    get_transaction_details_request: TransactionDetailsBody<'a>,
}

impl<'a> TransactionDetailsEnvelope<'a> {
    pub(crate) fn new(credentials: &'a Credentials, transaction_id: &'a str) -> Self {
        Self {
            get_transaction_details_request: TransactionDetailsBody {
                merchant_authentication: credentials.into(),
                trans_id: transaction_id,
            },
        }
    }
}

/// API-level result code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub(crate) enum ResultCode {
    Ok,
    #[default]
    Error,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub(crate) code: String,
    #[serde(default)]
    pub(crate) text: String,
}

/// `messages` block present on every response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiMessages {
    #[serde(default)]
    pub(crate) result_code: ResultCode,
    #[serde(default)]
    pub(crate) message: Vec<ApiMessage>,
}

impl ApiMessages {
    pub(crate) fn is_ok(&self) -> bool {
        self.result_code == ResultCode::Ok
    }

    pub(crate) fn to_messages(&self) -> Vec<TransactionMessage> {
        self.message.iter().map(|m| TransactionMessage::new(&m.code, &m.text)).collect()
    }
}

/// Response codes arrive as strings in transaction responses and as numbers in
/// transaction details.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum CodeValue {
    Text(String),
    Number(i64),
}

impl CodeValue {
    pub(crate) fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionMessageWire {
    #[serde(default)]
    pub(crate) code: String,
    #[serde(default)]
    pub(crate) description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionErrorWire {
    #[serde(default)]
    pub(crate) error_code: String,
    #[serde(default)]
    pub(crate) error_text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionResponseWire {
    pub(crate) response_code: Option<CodeValue>,
    pub(crate) trans_id: Option<String>,
    pub(crate) account_number: Option<String>,
    #[serde(default)]
    pub(crate) messages: Vec<TransactionMessageWire>,
    #[serde(default)]
    pub(crate) errors: Vec<TransactionErrorWire>,
    pub(crate) trans_hash_sha2: Option<String>,
}

/// `createTransactionResponse`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTransactionResponse {
    pub(crate) transaction_response: Option<TransactionResponseWire>,
    #[serde(default)]
    pub(crate) messages: ApiMessages,
}

impl From<CreateTransactionResponse> for TransactionResult {
    fn from(response: CreateTransactionResponse) -> Self {
        let tx = response.transaction_response.unwrap_or_default();
        let mut errors: Vec<TransactionMessage> = tx
            .errors
            .into_iter()
            .map(|e| TransactionMessage::new(e.error_code, e.error_text))
            .collect();
        if errors.is_empty() && !response.messages.is_ok() {
            errors = response.messages.to_messages();
        }

        Self {
            is_success: response.messages.is_ok(),
            response_code: tx.response_code.map(CodeValue::into_string),
            transaction_id: tx.trans_id.filter(|id| !id.is_empty() && id != "0"),
            messages: tx
                .messages
                .into_iter()
                .map(|m| TransactionMessage::new(m.code, m.description))
                .collect(),
            errors,
            transaction_status: None,
            transaction_type: None,
            account_number: tx.account_number.filter(|n| !n.is_empty()),
            trans_hash_sha2: tx.trans_hash_sha2.filter(|h| !h.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CardDetailsWire {
    card_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DetailsPaymentWire {
    credit_card: Option<CardDetailsWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionDetailsWire {
    trans_id: Option<String>,
    transaction_type: Option<String>,
    transaction_status: Option<String>,
    response_code: Option<CodeValue>,
    response_reason_code: Option<CodeValue>,
    response_reason_description: Option<String>,
    payment: Option<DetailsPaymentWire>,
}

/// `getTransactionDetailsResponse`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionDetailsResponse {
    transaction: Option<TransactionDetailsWire>,
    #[serde(default)]
    messages: ApiMessages,
}

impl From<TransactionDetailsResponse> for TransactionResult {
    fn from(response: TransactionDetailsResponse) -> Self {
        let is_success = response.messages.is_ok();
        let tx = response.transaction.unwrap_or_default();

        let messages = match tx.response_reason_description {
            Some(description) => vec![TransactionMessage::new(
                tx.response_reason_code.map(CodeValue::into_string).unwrap_or_default(),
                description,
            )],
            None => response.messages.to_messages(),
        };
        let errors = if is_success { Vec::new() } else { response.messages.to_messages() };

        Self {
            is_success,
            response_code: tx.response_code.map(CodeValue::into_string),
            transaction_id: tx.trans_id,
            messages,
            errors,
            transaction_status: tx.transaction_status,
            transaction_type: tx.transaction_type,
            account_number: tx.payment.and_then(|p| p.credit_card).and_then(|c| c.card_number),
            trans_hash_sha2: None,
        }
    }
}

/// `getMerchantDetailsResponse`, reduced to the fields the checkout needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MerchantDetailsResponse {
    public_client_key: Option<String>,
    #[serde(default)]
    messages: ApiMessages,
}

impl From<MerchantDetailsResponse> for PublicClientKeyResult {
    fn from(response: MerchantDetailsResponse) -> Self {
        Self {
            is_success: response.messages.is_ok(),
            client_key: response.public_client_key.filter(|k| !k.is_empty()),
            messages: response.messages.to_messages(),
        }
    }
}

/// Decodes a response body, dropping the UTF-8 byte order mark the gateway prepends.
pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Decodes a JSON response envelope.
pub(crate) fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let text = String::from_utf8_lossy(body);
    serde_json::from_str(strip_bom(&text)).map_err(|e| GatewayError::Deserialization(e.to_string()))
}
