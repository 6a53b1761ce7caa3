//! Authorize.Net gateway access.
//!
//! [`GatewayClient`] is the seam the payment lifecycle talks to. [`AuthorizeNetClient`]
//! implements it over the JSON API, switching to the XML proxy path for tokenized
//! cards that name a proxy endpoint.

pub mod client;
pub mod hash;
pub mod mask;
pub mod models;
mod proxy;
mod wire;

pub use client::{
    AuthorizeNetClient, DEFAULT_PROXY, Endpoints, GatewayClient, PRODUCTION_ENDPOINT,
    SANDBOX_ENDPOINT,
};
pub use hash::compute_transaction_hash;
pub use mask::mask_card_number;
pub use models::{
    CaptureTransactionRequest, CreateTransactionRequest, CreditCard, Credentials,
    PaymentActionType, PaymentSource, PublicClientKeyRequest, PublicClientKeyResult,
    RefundTransactionRequest, SETTLED_SUCCESSFULLY, TransactionDetailsRequest,
    TransactionMessage, TransactionOutcome, TransactionResult, VoidTransactionRequest,
};
