//! Platform-side payment, order and result models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::PaymentStatus;
use crate::gateway::TransactionResult;

/// Kind of gateway call recorded on a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Authorize and capture.
    Sale,
    /// Authorize only.
    Authorization,
    /// Capture of a prior authorization.
    Capture,
    /// Refund of a settled transaction.
    Refund,
    /// Void of an unsettled transaction.
    Void,
}

/// A gateway call recorded on a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayTransaction {
    /// Local id.
    pub id: Uuid,
    /// What was done.
    pub kind: TransactionKind,
    /// Gateway transaction id.
    pub transaction_id: Option<String>,
    /// Amount sent.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: String,
    /// Gateway response code.
    pub response_code: Option<String>,
    /// Gateway messages or errors.
    pub note: String,
    /// The gateway approved the call.
    pub is_processed: bool,
    /// When the gateway approved the call.
    pub processed_date: Option<DateTime<Utc>>,
}

impl GatewayTransaction {
    /// Records a gateway call the gateway approved.
    pub(crate) fn record(
        kind: TransactionKind,
        amount: Decimal,
        currency: &str,
        result: &TransactionResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            transaction_id: result.transaction_id.clone(),
            amount,
            currency: currency.to_owned(),
            response_code: result.response_code.clone(),
            note: result.summary(),
            is_processed: true,
            processed_date: Some(Utc::now()),
        }
    }
}

/// The platform order a payment belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order id.
    pub id: String,
    /// Human-facing order number.
    pub number: String,
}

/// A platform payment, mutated in place by the lifecycle operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment id.
    pub id: String,
    /// Current status.
    pub status: PaymentStatus,
    /// Amount due.
    pub sum: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Gateway transaction id of the charge or authorization.
    pub outer_id: Option<String>,
    /// Funds were captured.
    pub is_approved: bool,
    /// Payment was voided.
    pub is_cancelled: bool,
    /// When funds were authorized.
    pub authorized_date: Option<DateTime<Utc>>,
    /// When funds were captured.
    pub captured_date: Option<DateTime<Utc>>,
    /// When the payment was voided.
    pub cancelled_date: Option<DateTime<Utc>>,
    /// When the payment was refunded.
    pub refunded_date: Option<DateTime<Utc>>,
    /// Gateway calls, oldest first.
    pub transactions: Vec<GatewayTransaction>,
}

impl Payment {
    /// Creates a new payment.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn new(id: impl Into<String>, sum: Decimal, currency: impl Into<String>) -> Self {
        Self { id: id.into(), sum, currency: currency.into(), ..Self::default() }
    }
}

/// Parameters posted back by the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostProcessParams {
    /// Accept.js data descriptor.
    pub data_descriptor: Option<String>,
    /// Accept.js nonce.
    pub data_value: Option<String>,
    /// Order id echoed by the form.
    pub order_id: Option<String>,
}

impl PostProcessParams {
    /// Collects parameters from name/value pairs. Empty values count as absent.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "dataDescriptor" => &mut params.data_descriptor,
                "dataValue" => &mut params.data_value,
                "orderId" => &mut params.order_id,
                _ => continue,
            };
            let value: String = value.into();
            if !value.trim().is_empty() {
                *slot = Some(value);
            }
        }
        params
    }

    /// Parses a URL-encoded query string or form body.
    ///
    /// # Examples
    ///
    /// ```
    /// use anet_payment::payment::PostProcessParams;
    ///
    /// let params = PostProcessParams::from_query(
    ///     "orderId=CO1&dataDescriptor=COMMON.ACCEPT.INAPP.PAYMENT&dataValue=eyJj%2B",
    /// );
    /// assert_eq!(params.data_value.as_deref(), Some("eyJj+"));
    /// assert!(params.nonce().is_some());
    /// ```
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()))
    }

    /// Descriptor and nonce, when both are present.
    #[must_use]
    pub fn nonce(&self) -> Option<(&str, &str)> {
        Some((self.data_descriptor.as_deref()?, self.data_value.as_deref()?))
    }
}

/// Result of initiating a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessPaymentResult {
    /// A client key was obtained and the form rendered.
    pub is_success: bool,
    /// Payment status afterwards.
    pub new_status: PaymentStatus,
    /// Rendered checkout form.
    pub html_form: Option<String>,
    /// Gateway failure description.
    pub error_message: Option<String>,
}

/// Result of validating posted-back parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatePostProcessResult {
    /// Descriptor and nonce are both present.
    pub is_success: bool,
    /// Order id from the parameters.
    pub outer_id: Option<String>,
}

/// Result of a post-process, capture, refund or void operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentResult {
    /// The gateway approved the operation.
    pub is_success: bool,
    /// Payment status afterwards.
    pub new_status: PaymentStatus,
    /// Gateway transaction id.
    pub outer_id: Option<String>,
    /// Human-readable failure description.
    pub error_message: Option<String>,
}

impl PaymentResult {
    pub(crate) fn approved(payment: &Payment, transaction_id: Option<String>) -> Self {
        Self {
            is_success: true,
            new_status: payment.status,
            outer_id: transaction_id,
            error_message: None,
        }
    }

    pub(crate) fn rejected(payment: &Payment, error_message: String) -> Self {
        Self {
            is_success: false,
            new_status: payment.status,
            outer_id: payment.outer_id.clone(),
            error_message: Some(error_message),
        }
    }
}
