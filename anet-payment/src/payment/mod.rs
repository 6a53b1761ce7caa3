//! Payment lifecycle.
//!
//! [`AuthorizeNetPaymentMethod`] maps the platform operations (process, post-process,
//! capture, refund, void) onto gateway calls and drives [`PaymentStatus`] through the
//! transitions [`PaymentStatus::next`] allows.

pub mod audit;
pub mod method;
pub mod models;
pub mod status;

pub use method::{AuthorizeNetPaymentMethod, MethodSettings};
pub use models::{
    GatewayTransaction, Order, Payment, PaymentResult, PostProcessParams, ProcessPaymentResult,
    TransactionKind, ValidatePostProcessResult,
};
pub use status::{PaymentStatus, PaymentTransition};
