//! `transHashSha2` verification.
//!
//! The gateway signs each transaction response with HMAC-SHA512, keyed with the
//! merchant's hex-encoded signature key, over `^apiLogin^transId^amount^`.

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;

use super::{
    models::{Credentials, TransactionResult},
    wire::format_amount,
};
use crate::error::{GatewayError, Result};

type HmacSha512 = Hmac<Sha512>;

fn keyed_mac(
    signature_key: &SecretString,
    api_login: &str,
    transaction_id: &str,
    amount: Decimal,
) -> Result<HmacSha512> {
    let key = hex::decode(signature_key.expose_secret().trim())
        .map_err(|e| GatewayError::Config(format!("signature key is not valid hex: {e}")))?;
    let mut mac = HmacSha512::new_from_slice(&key)
        .map_err(|e| GatewayError::Config(format!("signature key rejected: {e}")))?;
    mac.update(format!("^{api_login}^{transaction_id}^{}^", format_amount(amount)).as_bytes());
    Ok(mac)
}

/// Computes the expected hash as uppercase hex.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if the signature key is not hex.
pub fn compute_transaction_hash(
    signature_key: &SecretString,
    api_login: &str,
    transaction_id: &str,
    amount: Decimal,
) -> Result<String> {
    let mac = keyed_mac(signature_key, api_login, transaction_id, amount)?;
    Ok(hex::encode_upper(mac.finalize().into_bytes()))
}

/// Verifies the hash carried by `result`, if both a hash and a signature key are present.
///
/// # Errors
///
/// Returns [`GatewayError::ResponseVerification`] when the hash does not match.
pub(crate) fn verify_transaction_hash(
    credentials: &Credentials,
    result: &TransactionResult,
    amount: Decimal,
) -> Result<()> {
    let (Some(key), Some(received), Some(transaction_id)) = (
        credentials.signature_key.as_ref(),
        result.trans_hash_sha2.as_deref(),
        result.transaction_id.as_deref(),
    ) else {
        return Ok(());
    };

    let received = hex::decode(received.trim()).map_err(|e| {
        GatewayError::ResponseVerification(format!("transHashSha2 is not valid hex: {e}"))
    })?;

    keyed_mac(key, &credentials.api_login, transaction_id, amount)?
        .verify_slice(&received)
        .map_err(|_| {
            GatewayError::ResponseVerification(format!(
                "transHashSha2 mismatch for transaction {transaction_id}"
            ))
        })
}
