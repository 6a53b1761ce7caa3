//! Error types for the Authorize.Net payment adapter.
//!
//! All errors implement the standard [`std::error::Error`] trait via [`thiserror::Error`].
//!
//! # Error Tiers
//!
//! Gateway *outcomes* (declined, error, held for review) are not errors: they are
//! recovered into [`TransactionResult`](crate::gateway::TransactionResult) values and
//! surfaced as messages on lifecycle results. The variants below cover the other tier:
//!
//! - **Transport errors** ([`GatewayError::Http`], [`GatewayError::GatewayStatus`]):
//!   the single gateway call could not complete
//! - **Codec errors** ([`GatewayError::Serialization`], [`GatewayError::Deserialization`]):
//!   a request could not be encoded or a response could not be decoded
//! - **Rendering errors** ([`GatewayError::Template`]): the checkout form could not be built
//! - **Caller misuse** ([`GatewayError::InvalidTransition`],
//!   [`GatewayError::MissingTransactionId`], [`GatewayError::CaptureFailed`]): the
//!   lifecycle was driven in a way the payment state does not allow
//!
//! # Examples
//!
//! ```
//! use anet_payment::error::{GatewayError, Result};
//!
//! fn require_transaction_id(id: &str) -> Result<&str> {
//!     if id.is_empty() {
//!         return Err(GatewayError::MissingTransactionId);
//!     }
//!     Ok(id)
//! }
//!
//! assert!(require_transaction_id("").is_err());
//! ```

use thiserror::Error;

use crate::payment::{PaymentStatus, PaymentTransition};

/// Result type alias for adapter operations.
///
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors raised by the payment adapter.
///
/// This type implements `#[must_use]` to ensure errors are not silently ignored.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request to the gateway or proxy failed.
    ///
    /// Wraps [`reqwest::Error`]: timeouts, refused connections, DNS and TLS failures.
    ///
    /// # Recovery
    ///
    /// The adapter makes a single attempt. Whether to retry is the caller's decision;
    /// retrying a create-transaction call can double-charge the customer.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway or proxy answered with a non-success HTTP status.
    #[error("gateway returned HTTP status {0}")]
    GatewayStatus(u16),

    /// The response body could not be decoded into any known envelope.
    #[error("gateway response deserialization failed: {0}")]
    Deserialization(String),

    /// The request could not be encoded for the wire.
    #[error("gateway request serialization failed: {0}")]
    Serialization(String),

    /// The checkout form template could not be rendered.
    #[error("checkout form rendering failed: {0}")]
    Template(#[from] tera::Error),

    /// A request field is malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use anet_payment::error::GatewayError;
    ///
    /// let err = GatewayError::InvalidInput("proxy endpoint must use HTTPS".to_owned());
    /// assert!(err.to_string().contains("Invalid input"));
    /// ```
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration is invalid or a referenced secret is missing.
    ///
    /// # Recovery
    ///
    /// Fix the TOML file or export the environment variable named in it.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The payment status does not allow the requested transition.
    ///
    /// Raised before any gateway call is made, e.g. capturing a payment that was
    /// never authorized.
    #[error("cannot apply {transition:?} to a payment in status {from:?}")]
    InvalidTransition {
        /// Status the payment was in.
        from: PaymentStatus,
        /// Transition that was refused.
        transition: PaymentTransition,
    },

    /// The payment has no gateway transaction id to operate on.
    #[error("payment has no gateway transaction id")]
    MissingTransactionId,

    /// Capture of an authorized transaction was not approved.
    ///
    /// Unlike other gateway outcomes, a failed capture is raised: the funds stay
    /// authorized and an operator has to intervene.
    #[error("capture was not approved: {0}")]
    CaptureFailed(String),

    /// The `transHashSha2` returned by the gateway does not match the expected value.
    #[error("gateway response verification failed: {0}")]
    ResponseVerification(String),
}
