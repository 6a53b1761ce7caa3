//! Authorize.Net payment adapter.
//!
//! Connects a commerce platform's payment lifecycle to the Authorize.Net gateway:
//!
//! - **Gateway client**: get-token, create, capture, refund, void and transaction
//!   details over the JSON API, with an XML pass-through to merchant proxies that
//!   expect bearer auth
//! - **Checkout form**: Accept.js snippet that turns card data into a one-time nonce in
//!   the browser, so card numbers never reach the platform
//! - **Lifecycle**: a payment status state machine with audited transitions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────┐
//! │  Platform (orders,      │
//! │  payments, callbacks)   │
//! └───────────┬─────────────┘
//!             │ process / post-process / capture / refund / void
//! ┌───────────▼─────────────┐      ┌────────────────────┐
//! │ AuthorizeNetPaymentMethod│─────│ PaymentStatus FSM  │
//! └───────────┬─────────────┘      └────────────────────┘
//!             │ GatewayClient
//! ┌───────────▼─────────────┐
//! │  AuthorizeNetClient     │  JSON API, or XML proxy with bearer token
//! └───────────┬─────────────┘
//!             │ Transport (HTTPS)
//!             ▼
//!      Authorize.Net / proxy
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use anet_payment::{
//!     config::PaymentMethodConfig,
//!     payment::{AuthorizeNetPaymentMethod, Order, Payment, PostProcessParams},
//! };
//! use rust_decimal::Decimal;
//!
//! # async fn example() -> anet_payment::error::Result<()> {
//! let config = PaymentMethodConfig::from_file("anet-payment.toml")?;
//! let method = AuthorizeNetPaymentMethod::from_config(&config)?;
//!
//! let order = Order { id: "9f1c2d7e".into(), number: "CO-1001".into() };
//! let mut payment = Payment::new("pay-1", Decimal::new(2550, 2), "USD");
//!
//! // Render the Accept.js form for the storefront.
//! let issued = method.process_payment(&mut payment, &order, Some("203.0.113.7")).await?;
//! println!("{}", issued.html_form.unwrap_or_default());
//!
//! // Later, on the form post-back:
//! let params = PostProcessParams::from_query("dataDescriptor=COMMON.ACCEPT.INAPP.PAYMENT&dataValue=nonce");
//! let result = method.post_process_payment(&mut payment, &order, &params).await?;
//! println!("{:?} {:?}", result.new_status, result.error_message);
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! - Transaction keys and proxy tokens are [`secrecy::SecretString`]s resolved from the
//!   environment and never logged
//! - Logged request bodies have card numbers, card codes, expiration dates and nonces
//!   masked
//! - Gateway endpoints must be HTTPS
//! - When a signature key is configured, `transHashSha2` is verified on every
//!   create, capture and refund response

#![warn(missing_docs)]

pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod payment;
pub mod transport;

pub use config::PaymentMethodConfig;
pub use error::{GatewayError, Result};
pub use gateway::{AuthorizeNetClient, GatewayClient};
pub use payment::{AuthorizeNetPaymentMethod, PaymentStatus};
