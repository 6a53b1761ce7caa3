//! XML pass-through to a detokenizing proxy.
//!
//! When card data is a vault alias, the create-transaction request is serialized as
//! Authorize.Net XML and posted to the merchant's proxy, which swaps aliases for real
//! values and forwards the call. The proxy authenticates callers with a bearer token.
//! Its reply is either a `createTransactionResponse` or, when the gateway rejected the
//! request before creating a transaction, an `ErrorResponse`.

use quick_xml::{Reader, events::Event};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{
    mask::secure_serializable,
    models::TransactionResult,
    wire::{
        ApiMessage, ApiMessages, CodeValue, CreateTransactionBody, CreateTransactionResponse,
        ResultCode, TransactionErrorWire, TransactionMessageWire, TransactionResponseWire,
        strip_bom,
    },
};
use crate::{
    error::{GatewayError, Result},
    transport::{RequestContext, Transport},
};

const XML_CONTENT_TYPE: &str = "application/xml";
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

const REQUEST_ROOT: &str = "createTransactionRequest";
const RESPONSE_ROOT: &str = "createTransactionResponse";
const ERROR_ROOT: &str = "ErrorResponse";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct XmlApiMessages {
    #[serde(default)]
    result_code: String,
    #[serde(default)]
    message: Vec<ApiMessage>,
}

impl From<XmlApiMessages> for ApiMessages {
    fn from(messages: XmlApiMessages) -> Self {
        let result_code =
            if messages.result_code.trim() == "Ok" { ResultCode::Ok } else { ResultCode::Error };
        Self { result_code, message: messages.message }
    }
}

#[derive(Debug, Default, Deserialize)]
struct XmlTransactionMessages {
    #[serde(default)]
    message: Vec<TransactionMessageWire>,
}

#[derive(Debug, Default, Deserialize)]
struct XmlTransactionErrors {
    #[serde(default)]
    error: Vec<TransactionErrorWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct XmlTransactionResponse {
    response_code: Option<String>,
    trans_id: Option<String>,
    account_number: Option<String>,
    #[serde(default)]
    messages: XmlTransactionMessages,
    #[serde(default)]
    errors: XmlTransactionErrors,
    trans_hash_sha2: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct XmlCreateTransactionResponse {
    #[serde(default)]
    messages: XmlApiMessages,
    transaction_response: Option<XmlTransactionResponse>,
}

impl From<XmlCreateTransactionResponse> for CreateTransactionResponse {
    fn from(response: XmlCreateTransactionResponse) -> Self {
        Self {
            messages: response.messages.into(),
            transaction_response: response.transaction_response.map(|tx| TransactionResponseWire {
                response_code: tx.response_code.map(CodeValue::Text),
                trans_id: tx.trans_id,
                account_number: tx.account_number,
                messages: tx.messages.message,
                errors: tx.errors.error,
                trans_hash_sha2: tx.trans_hash_sha2,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct XmlErrorResponse {
    #[serde(default)]
    messages: XmlApiMessages,
}

/// Local name of the first element in `xml`, skipping the declaration and comments.
pub(crate) fn root_element_name(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Runs `primary`, and `fallback` only if `primary` fails. Each runs at most once.
pub(crate) fn parse_with_fallback<T>(
    primary: impl FnOnce() -> std::result::Result<T, String>,
    fallback: impl FnOnce() -> std::result::Result<T, String>,
) -> Result<T> {
    let primary_error = match primary() {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    fallback().map_err(|fallback_error| {
        GatewayError::Deserialization(format!("{primary_error}; {fallback_error}"))
    })
}

fn expect_root(root: Option<&str>, expected: &str) -> std::result::Result<(), String> {
    if root == Some(expected) {
        Ok(())
    } else {
        Err(format!("expected <{expected}>, found {}", root.unwrap_or("no element")))
    }
}

/// Decodes a proxy reply into a transaction result.
///
/// # Errors
///
/// Returns [`GatewayError::Deserialization`] if the body is neither a
/// `createTransactionResponse` nor an `ErrorResponse`.
pub(crate) fn decode_proxy_response(body: &[u8]) -> Result<TransactionResult> {
    let text = String::from_utf8_lossy(body);
    let xml = strip_bom(&text);
    let root = root_element_name(xml);
    let root = root.as_deref();

    parse_with_fallback(
        || {
            expect_root(root, RESPONSE_ROOT)?;
            quick_xml::de::from_str::<XmlCreateTransactionResponse>(xml)
                .map(|r| TransactionResult::from(CreateTransactionResponse::from(r)))
                .map_err(|e| format!("{RESPONSE_ROOT}: {e}"))
        },
        || {
            expect_root(root, ERROR_ROOT)?;
            quick_xml::de::from_str::<XmlErrorResponse>(xml)
                .map(|r| {
                    TransactionResult::from(CreateTransactionResponse {
                        transaction_response: None,
                        messages: r.messages.into(),
                    })
                })
                .map_err(|e| format!("{ERROR_ROOT}: {e}"))
        },
    )
}

/// Serializes a create-transaction body as namespaced Authorize.Net XML.
pub(crate) fn encode_request(body: CreateTransactionBody<'_>) -> Result<String> {
    let body = body.with_namespace();
    debug!(request = %secure_serializable(&body), "proxy request");
    let xml = quick_xml::se::to_string_with_root(REQUEST_ROOT, &body)
        .map_err(|e| GatewayError::Serialization(e.to_string()))?;
    Ok(format!("{XML_DECLARATION}{xml}"))
}

/// Posts a create-transaction body through the proxy at `endpoint`.
///
/// # Errors
///
/// Returns [`GatewayError::GatewayStatus`] for a non-2xx reply with an empty body,
/// and transport or decoding errors otherwise. Error envelopes carried by non-2xx
/// replies are decoded like any other reply.
#[instrument(skip(transport, bearer_token, body))]
pub(crate) async fn send<T: Transport>(
    transport: &T,
    endpoint: &str,
    bearer_token: &str,
    body: CreateTransactionBody<'_>,
) -> Result<TransactionResult> {
    let xml = encode_request(body)?;
    let ctx = RequestContext {
        url: endpoint,
        content_type: XML_CONTENT_TYPE,
        bearer_token: Some(bearer_token),
    };
    let response = transport.post(ctx, xml.as_bytes()).await?;

    if response.body.iter().all(u8::is_ascii_whitespace) {
        if !response.is_success() {
            return Err(GatewayError::GatewayStatus(response.status));
        }
        return Err(GatewayError::Deserialization("proxy returned an empty body".into()));
    }
    if !response.is_success() {
        debug!(status = response.status, "proxy returned non-success status with a body");
    }

    decode_proxy_response(&response.body)
}
