//! Payment status state machine.

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// Platform payment status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Created, nothing sent to the gateway yet.
    #[default]
    New,
    /// Checkout form issued, or the gateway is holding the transaction for review.
    Pending,
    /// Funds authorized, awaiting capture.
    Authorized,
    /// Funds captured.
    Paid,
    /// Gateway declined the transaction.
    Declined,
    /// Gateway reported an error.
    Error,
    /// Transaction voided before settlement.
    Voided,
    /// Settled transaction refunded.
    Refunded,
}

/// A requested change of [`PaymentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentTransition {
    /// Checkout form issued.
    Initiate,
    /// Approved sale.
    Charge,
    /// Approved authorization.
    Authorize,
    /// Declined create-transaction.
    Decline,
    /// Errored or unrecognized create-transaction outcome.
    Fail,
    /// Create-transaction held for review.
    HoldForReview,
    /// Approved capture.
    Capture,
    /// Approved refund.
    Refund,
    /// Approved void.
    Void,
}

impl PaymentStatus {
    /// True while a create-transaction outcome can still be applied.
    #[must_use]
    pub const fn awaits_outcome(self) -> bool {
        matches!(self, Self::New | Self::Pending | Self::Declined | Self::Error)
    }

    /// Status after `transition`, or `None` if it is not allowed from `self`.
    #[must_use]
    pub const fn next(self, transition: PaymentTransition) -> Option<Self> {
        use PaymentTransition as T;

        match (self, transition) {
            (_, T::Initiate) => Some(Self::Pending),
            (from, T::Charge) if from.awaits_outcome() => Some(Self::Paid),
            (from, T::Authorize) if from.awaits_outcome() => Some(Self::Authorized),
            (from, T::Decline) if from.awaits_outcome() => Some(Self::Declined),
            (from, T::Fail) if from.awaits_outcome() => Some(Self::Error),
            (from, T::HoldForReview) if from.awaits_outcome() => Some(Self::Pending),
            (Self::Authorized, T::Capture) => Some(Self::Paid),
            (Self::Paid, T::Refund) => Some(Self::Refunded),
            (Self::Authorized | Self::Paid, T::Void) => Some(Self::Voided),
            _ => None,
        }
    }

    /// Checks that `transition` is allowed without applying it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidTransition`] if it is not.
    pub fn ensure(self, transition: PaymentTransition) -> Result<()> {
        match self.next(transition) {
            Some(_) => Ok(()),
            None => Err(GatewayError::InvalidTransition { from: self, transition }),
        }
    }

    /// Applies `transition` in place and returns the new status.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidTransition`] and leaves `self` unchanged if the
    /// transition is not allowed.
    ///
    /// # Examples
    ///
    /// ```
    /// use anet_payment::payment::{PaymentStatus, PaymentTransition};
    ///
    /// let mut status = PaymentStatus::Authorized;
    /// assert_eq!(status.apply(PaymentTransition::Capture).unwrap(), PaymentStatus::Paid);
    /// assert!(status.apply(PaymentTransition::Capture).is_err());
    /// assert_eq!(status, PaymentStatus::Paid);
    /// ```
    pub fn apply(&mut self, transition: PaymentTransition) -> Result<Self> {
        let next = self
            .next(transition)
            .ok_or(GatewayError::InvalidTransition { from: *self, transition })?;
        *self = next;
        Ok(next)
    }
}
