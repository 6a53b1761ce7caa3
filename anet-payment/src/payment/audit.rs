//! Audit logging for payment state changes.
//!
//! Every lifecycle operation that changes or refuses to change a payment status emits
//! one structured event on the `audit` tracing target, tagged with a correlation id
//! shared by all events of that operation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{PaymentStatus, PaymentTransition};

/// Kinds of audited events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A transition was applied.
    StatusChanged,
    /// A transition was refused before any gateway call.
    TransitionRejected,
    /// The gateway did not approve; the failure was recovered into a result.
    GatewayNotApproved,
    /// The gateway call itself failed.
    GatewayCallFailed,
}

/// Context of an audit event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditDetails {
    /// Transition requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<PaymentTransition>,
    /// Status before the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<PaymentStatus>,
    /// Status after the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<PaymentStatus>,
    /// Gateway transaction id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Amount sent to the gateway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    /// Error or gateway message, with card numbers redacted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Audit log entry.
///
/// # Examples
///
/// ```
/// use anet_payment::payment::{
///     PaymentStatus, PaymentTransition,
///     audit::{AuditEvent, AuditEventType, audit_log},
/// };
/// use uuid::Uuid;
///
/// let event = AuditEvent::new(AuditEventType::StatusChanged, "pay-1", Uuid::new_v4())
///     .with_transition(PaymentTransition::Capture, PaymentStatus::Authorized, PaymentStatus::Paid)
///     .with_transaction_id("60100000001");
///
/// audit_log(&event);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub event_type: AuditEventType,
    /// Platform payment id.
    pub payment_id: String,
    /// Correlation id of the lifecycle operation.
    pub correlation_id: Uuid,
    /// Event context.
    pub details: AuditDetails,
}

impl AuditEvent {
    /// Creates an event with empty details.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn new(
        event_type: AuditEventType,
        payment_id: impl Into<String>,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            payment_id: payment_id.into(),
            correlation_id,
            details: AuditDetails::default(),
        }
    }

    /// Records the transition and the statuses around it.
    #[must_use]
    pub fn with_transition(
        mut self,
        transition: PaymentTransition,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Self {
        self.details.transition = Some(transition);
        self.details.from = Some(from);
        self.details.to = Some(to);
        self
    }

    /// Records a refused transition.
    #[must_use]
    pub fn with_rejected(mut self, transition: PaymentTransition, from: PaymentStatus) -> Self {
        self.details.transition = Some(transition);
        self.details.from = Some(from);
        self
    }

    /// Adds the gateway transaction id.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.details.transaction_id = Some(transaction_id.into());
        self
    }

    /// Adds the amount.
    #[must_use]
    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.details.amount = Some(amount);
        self
    }

    /// Adds an error message, redacting card numbers.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.details.error = Some(redact_card_numbers(&error.into()));
        self
    }
}

/// Logs an audit event on the `audit` target.
pub fn audit_log(event: &AuditEvent) {
    tracing::info!(
        target: "audit",
        timestamp = %event.timestamp.to_rfc3339(),
        event_type = ?event.event_type,
        payment_id = %event.payment_id,
        correlation_id = %event.correlation_id,
        details = ?event.details,
        "AUDIT"
    );
}

/// Replaces runs of 13 to 19 digits with a masked value keeping the last four.
///
/// # Examples
///
/// ```
/// use anet_payment::payment::audit::redact_card_numbers;
///
/// assert_eq!(
///     redact_card_numbers("card 4111111111111111 declined"),
///     "card ************1111 declined"
/// );
/// assert_eq!(redact_card_numbers("transaction 60123456789"), "transaction 60123456789");
/// ```
#[must_use]
pub fn redact_card_numbers(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut digits = String::new();

    let flush = |digits: &mut String, out: &mut String| {
        if (13..=19).contains(&digits.len()) {
            out.push_str(&crate::gateway::mask_card_number(digits));
        } else {
            out.push_str(digits);
        }
        digits.clear();
    };

    for ch in input.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            flush(&mut digits, &mut out);
            out.push(ch);
        }
    }
    flush(&mut digits, &mut out);
    out
}
