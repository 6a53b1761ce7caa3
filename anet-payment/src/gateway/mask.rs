//! Masking of card data and credentials before anything reaches a log line.

use serde::Serialize;
use serde_json::{Map, Value};

const REDACTED: &str = "***";

/// Masks all but the last four characters of a card number.
///
/// Values of four characters or fewer are returned unchanged; gateway responses already
/// mask account numbers as `XXXX1111`.
///
/// # Examples
///
/// ```
/// use anet_payment::gateway::mask_card_number;
///
/// assert_eq!(mask_card_number("4111111111111111"), "************1111");
/// assert_eq!(mask_card_number("1111"), "1111");
/// ```
#[must_use]
pub fn mask_card_number(card: &str) -> String {
    let len = card.chars().count();
    if len <= 4 {
        return card.to_owned();
    }
    let tail: String = card.chars().skip(len - 4).collect();
    "*".repeat(len - 4) + &tail
}

fn is_pan_key(key: &str) -> bool {
    let k = key.to_lowercase();
    (k.contains("card") && k.contains("number")) || k == "pan"
}

fn is_secret_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k.contains("cardcode")
        || k.contains("cvv")
        || k.contains("transactionkey")
        || k.contains("datavalue")
        || k.contains("expirationdate")
}

/// Serializes `v` to JSON with sensitive fields masked.
pub(crate) fn secure_serializable(v: impl Serialize) -> Value {
    secure_value(&serde_json::to_value(v).unwrap_or_default())
}

/// Returns a copy of `v` with card numbers masked and secrets replaced.
pub(crate) fn secure_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut masked = Map::with_capacity(map.len());
            for (k, val) in map {
                let new_val = match val {
                    Value::String(s) if is_pan_key(k) => Value::String(mask_card_number(s)),
                    Value::String(_) | Value::Number(_) if is_secret_key(k) => {
                        Value::String(REDACTED.to_owned())
                    }
                    _ => secure_value(val),
                };
                masked.insert(k.clone(), new_val);
            }
            Value::Object(masked)
        }
        Value::Array(items) => Value::Array(items.iter().map(secure_value).collect()),
        other => other.clone(),
    }
}
