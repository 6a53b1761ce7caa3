//! Accept.js checkout form.
//!
//! The form collects card data in the browser, exchanges it for a payment nonce through
//! Accept.js and posts only the nonce (`dataDescriptor`, `dataValue`) back to the
//! configured form action, together with the order id.

use tera::{Context, Tera};

use crate::error::Result;

const PAYMENT_FORM_TEMPLATE: &str = include_str!("payment_form.html");
// The `.html` suffix turns on autoescaping.
const PAYMENT_FORM_TEMPLATE_NAME: &str = "payment_form.html";

/// Placeholder in the configured form action replaced with the order id.
pub const ORDER_ID_PLACEHOLDER: &str = "{orderId}";

/// Values substituted into the checkout form.
#[derive(Debug, Clone, Default)]
pub struct CheckoutFormContext<'a> {
    /// Merchant public client key.
    pub client_key: &'a str,
    /// Merchant API login ID.
    pub api_login: &'a str,
    /// Accept.js script URL for the configured mode.
    pub accept_js_path: &'a str,
    /// Resolved form action.
    pub form_action: &'a str,
    /// Platform order id.
    pub order_id: &'a str,
    /// Customer IP, when known.
    pub user_ip: Option<&'a str>,
}

/// Rendered checkout form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutForm {
    /// HTML snippet.
    pub content: String,
}

/// Replaces `{orderId}` in a configured form action with the URL-encoded order id.
///
/// # Examples
///
/// ```
/// use anet_payment::checkout::resolve_form_action;
///
/// assert_eq!(
///     resolve_form_action("https://shop.example.com/callback?orderId={orderId}", "CO 1"),
///     "https://shop.example.com/callback?orderId=CO+1"
/// );
/// ```
#[must_use]
pub fn resolve_form_action(template: &str, order_id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(order_id.as_bytes()).collect();
    template.replace(ORDER_ID_PLACEHOLDER, &encoded)
}

/// Renders the checkout form.
///
/// Every value is HTML-escaped by the template engine.
///
/// # Errors
///
/// Returns [`GatewayError::Template`](crate::error::GatewayError::Template) if the form template cannot be rendered.
pub fn render_checkout_form(context: &CheckoutFormContext<'_>) -> Result<CheckoutForm> {
    let mut tera = Tera::default();
    tera.add_raw_template(PAYMENT_FORM_TEMPLATE_NAME, PAYMENT_FORM_TEMPLATE)?;

    let mut values = Context::new();
    values.insert("clientKey", context.client_key);
    values.insert("apiLogin", context.api_login);
    values.insert("acceptJsPath", context.accept_js_path);
    values.insert("formAction", context.form_action);
    values.insert("orderId", context.order_id);
    values.insert("userIp", context.user_ip.unwrap_or_default());

    let content = tera.render(PAYMENT_FORM_TEMPLATE_NAME, &values)?;
    Ok(CheckoutForm { content })
}
