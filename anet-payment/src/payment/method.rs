//! Authorize.Net payment method: drives the platform payment lifecycle.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    audit::{AuditEvent, AuditEventType, audit_log},
    models::{
        GatewayTransaction, Order, Payment, PaymentResult, PostProcessParams, ProcessPaymentResult,
        TransactionKind, ValidatePostProcessResult,
    },
    status::{PaymentStatus, PaymentTransition},
};
use crate::{
    checkout::{CheckoutFormContext, render_checkout_form, resolve_form_action},
    config::PaymentMethodConfig,
    error::{GatewayError, Result},
    gateway::{
        AuthorizeNetClient, CaptureTransactionRequest, CreateTransactionRequest, Credentials,
        GatewayClient, PaymentActionType, PaymentSource, PublicClientKeyRequest,
        RefundTransactionRequest, TransactionDetailsRequest, TransactionOutcome, TransactionResult,
        VoidTransactionRequest,
    },
};

/// Settings the lifecycle needs, resolved from [`PaymentMethodConfig`].
#[derive(Debug, Clone)]
pub struct MethodSettings {
    /// Resolved merchant credentials.
    pub credentials: Credentials,
    /// Sale or Authorization/Capture.
    pub action_type: PaymentActionType,
    /// Form action template.
    pub process_payment_action: String,
    /// Accept.js script URL for the configured mode.
    pub accept_js_path: String,
}

impl MethodSettings {
    /// Takes settings from `config` and pairs them with resolved credentials.
    #[must_use]
    pub fn new(config: &PaymentMethodConfig, credentials: Credentials) -> Self {
        Self {
            credentials,
            action_type: config.payment_action_type,
            process_payment_action: config.process_payment_action.clone(),
            accept_js_path: config.accept_js_path().to_owned(),
        }
    }
}

/// Customer-facing description of a non-approved outcome.
fn outcome_message(outcome: TransactionOutcome, result: &TransactionResult) -> String {
    let details = result.summary();
    match outcome {
        TransactionOutcome::Declined => format!("Your transaction was declined: {details}"),
        TransactionOutcome::HeldForReview => {
            format!("Your transaction is held for review: {details}")
        }
        TransactionOutcome::Approved | TransactionOutcome::Error | TransactionOutcome::Unknown => {
            format!("There was an error processing your transaction: {details}")
        }
    }
}

/// Audit event for an applied transition.
fn status_changed_event(
    payment: &Payment,
    transition: PaymentTransition,
    from: PaymentStatus,
    amount: Option<Decimal>,
    correlation_id: Uuid,
) -> AuditEvent {
    let mut event = AuditEvent::new(AuditEventType::StatusChanged, &payment.id, correlation_id)
        .with_transition(transition, from, payment.status);
    if let Some(outer_id) = &payment.outer_id {
        event = event.with_transaction_id(outer_id);
    }
    if let Some(amount) = amount {
        event = event.with_amount(amount);
    }
    event
}

/// Payment lifecycle on top of a [`GatewayClient`].
///
/// Operations mutate the given [`Payment`] in place. Gateway declines and errors are
/// reported through the returned results; misuse of the lifecycle (a transition the
/// payment status does not allow, a missing transaction id) is returned as an error
/// before any gateway call.
#[derive(Debug)]
pub struct AuthorizeNetPaymentMethod<C = AuthorizeNetClient> {
    client: C,
    settings: MethodSettings,
}

impl AuthorizeNetPaymentMethod<AuthorizeNetClient> {
    /// Builds the client and resolves credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if a referenced secret is missing, or an error
    /// if the HTTP client cannot be built.
    pub fn from_config(config: &PaymentMethodConfig) -> Result<Self> {
        let credentials = config.resolve_credentials()?;
        Ok(Self::new(config.build_client()?, MethodSettings::new(config, credentials)))
    }
}

impl<C: GatewayClient> AuthorizeNetPaymentMethod<C> {
    /// Creates a payment method over `client`.
    #[must_use]
    pub fn new(client: C, settings: MethodSettings) -> Self {
        Self { client, settings }
    }

    /// The gateway client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The resolved settings.
    pub fn settings(&self) -> &MethodSettings {
        &self.settings
    }

    fn credentials(&self) -> Credentials {
        self.settings.credentials.clone()
    }

    /// Applies `transition`; `amount` is the money the gateway moved, if any.
    fn transition(
        &self,
        payment: &mut Payment,
        transition: PaymentTransition,
        amount: Option<Decimal>,
        correlation_id: Uuid,
    ) -> Result<()> {
        let from = payment.status;
        match payment.status.apply(transition) {
            Ok(_) => {
                audit_log(&status_changed_event(payment, transition, from, amount, correlation_id));
                Ok(())
            }
            Err(e) => {
                let event =
                    AuditEvent::new(AuditEventType::TransitionRejected, &payment.id, correlation_id)
                        .with_rejected(transition, from);
                audit_log(&event);
                Err(e)
            }
        }
    }

    fn ensure(
        &self,
        payment: &Payment,
        transition: PaymentTransition,
        correlation_id: Uuid,
    ) -> Result<()> {
        payment.status.ensure(transition).inspect_err(|_| {
            audit_log(
                &AuditEvent::new(AuditEventType::TransitionRejected, &payment.id, correlation_id)
                    .with_rejected(transition, payment.status),
            );
        })
    }

    fn call_failed(
        &self,
        payment: &Payment,
        transaction_id: Option<&str>,
        error: &GatewayError,
        correlation_id: Uuid,
    ) {
        warn!(payment_id = %payment.id, %error, "gateway call failed");
        let mut event =
            AuditEvent::new(AuditEventType::GatewayCallFailed, &payment.id, correlation_id)
                .with_error(error.to_string());
        if let Some(transaction_id) = transaction_id {
            event = event.with_transaction_id(transaction_id);
        }
        audit_log(&event);
    }

    fn not_approved(
        &self,
        payment: &Payment,
        result: &TransactionResult,
        correlation_id: Uuid,
    ) -> String {
        let message = outcome_message(result.outcome(), result);
        warn!(
            payment_id = %payment.id,
            outcome = ?result.outcome(),
            %message,
            "gateway did not approve"
        );
        let mut event =
            AuditEvent::new(AuditEventType::GatewayNotApproved, &payment.id, correlation_id)
                .with_error(&message);
        if let Some(transaction_id) = &result.transaction_id {
            event = event.with_transaction_id(transaction_id);
        }
        audit_log(&event);
        message
    }

    /// Issues the Accept.js checkout form and moves the payment to `Pending`.
    ///
    /// The status becomes `Pending` even when no client key could be obtained; the
    /// result then carries the gateway messages instead of a form.
    ///
    /// # Errors
    ///
    /// Returns error if the get-token call itself fails or the form cannot be rendered.
    #[instrument(skip_all, fields(payment_id = %payment.id, order_id = %order.id))]
    pub async fn process_payment(
        &self,
        payment: &mut Payment,
        order: &Order,
        user_ip: Option<&str>,
    ) -> Result<ProcessPaymentResult> {
        let correlation_id = Uuid::new_v4();
        let key = self
            .client
            .get_public_client_key(&PublicClientKeyRequest { credentials: self.credentials() })
            .await?;
        self.transition(payment, PaymentTransition::Initiate, None, correlation_id)?;

        let client_key = match key.client_key {
            Some(client_key) if key.is_success => client_key,
            _ => {
                let details = key.messages.iter().map(ToString::to_string).collect::<Vec<_>>();
                let message = if details.is_empty() {
                    "public client key was not returned".to_owned()
                } else {
                    details.join("; ")
                };
                warn!(%message, "cannot render checkout form");
                return Ok(ProcessPaymentResult {
                    is_success: false,
                    new_status: payment.status,
                    html_form: None,
                    error_message: Some(message),
                });
            }
        };

        let form_action = resolve_form_action(&self.settings.process_payment_action, &order.id);
        let form = render_checkout_form(&CheckoutFormContext {
            client_key: &client_key,
            api_login: &self.settings.credentials.api_login,
            accept_js_path: &self.settings.accept_js_path,
            form_action: &form_action,
            order_id: &order.id,
            user_ip,
        })?;

        info!("checkout form issued");
        Ok(ProcessPaymentResult {
            is_success: true,
            new_status: payment.status,
            html_form: Some(form.content),
            error_message: None,
        })
    }

    /// Checks that posted-back parameters carry a payment nonce.
    #[must_use]
    pub fn validate_post_process_request(
        &self,
        params: &PostProcessParams,
    ) -> ValidatePostProcessResult {
        ValidatePostProcessResult {
            is_success: params.nonce().is_some(),
            outer_id: params.order_id.clone(),
        }
    }

    /// Charges or authorizes the payment with the posted-back nonce.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] if the nonce is missing,
    /// [`GatewayError::InvalidTransition`] if the payment already has an outcome, and
    /// gateway call errors.
    ///
    /// A [`GatewayError::ResponseVerification`] error means the response hash did not
    /// match, so the outcome cannot be trusted. The gateway may still have approved the
    /// charge: the payment is left unchanged, the failure is audited as
    /// `GatewayCallFailed`, and the transaction has to be reconciled by an operator.
    #[instrument(skip_all, fields(payment_id = %payment.id, order_id = %order.id))]
    pub async fn post_process_payment(
        &self,
        payment: &mut Payment,
        order: &Order,
        params: &PostProcessParams,
    ) -> Result<PaymentResult> {
        let correlation_id = Uuid::new_v4();
        let Some((data_descriptor, data_value)) = params.nonce() else {
            return Err(GatewayError::InvalidInput(
                "dataDescriptor and dataValue are required".to_owned(),
            ));
        };

        let (approved_transition, kind) = match self.settings.action_type {
            PaymentActionType::Sale => (PaymentTransition::Charge, TransactionKind::Sale),
            PaymentActionType::AuthorizationCapture => {
                (PaymentTransition::Authorize, TransactionKind::Authorization)
            }
        };
        self.ensure(payment, approved_transition, correlation_id)?;

        let request = CreateTransactionRequest {
            credentials: self.credentials(),
            amount: payment.sum,
            currency_code: payment.currency.clone(),
            order_id: order.id.clone(),
            order_number: order.number.clone(),
            action_type: self.settings.action_type,
            payment: PaymentSource::Nonce {
                data_descriptor: data_descriptor.to_owned(),
                data_value: data_value.to_owned(),
            },
        };
        let result = self
            .client
            .create_transaction(&request)
            .await
            .inspect_err(|e| self.call_failed(payment, None, e, correlation_id))?;

        let outcome = result.outcome();
        if outcome == TransactionOutcome::Approved {
            let now = Utc::now();
            payment.outer_id.clone_from(&result.transaction_id);
            match kind {
                TransactionKind::Sale => {
                    payment.is_approved = true;
                    payment.captured_date = Some(now);
                }
                _ => payment.authorized_date = Some(now),
            }
            payment.transactions.push(GatewayTransaction::record(
                kind,
                payment.sum,
                &payment.currency,
                &result,
            ));
            self.transition(payment, approved_transition, Some(payment.sum), correlation_id)?;
            return Ok(PaymentResult::approved(payment, result.transaction_id));
        }

        let transition = match outcome {
            TransactionOutcome::Declined => PaymentTransition::Decline,
            TransactionOutcome::HeldForReview => PaymentTransition::HoldForReview,
            TransactionOutcome::Approved
            | TransactionOutcome::Error
            | TransactionOutcome::Unknown => PaymentTransition::Fail,
        };
        let message = self.not_approved(payment, &result, correlation_id);
        self.transition(payment, transition, None, correlation_id)?;
        Ok(PaymentResult::rejected(payment, message))
    }

    /// Captures an authorized payment, for `amount` or the full payment sum.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidTransition`] unless the payment is `Authorized`,
    /// [`GatewayError::MissingTransactionId`] without an outer id, and
    /// [`GatewayError::CaptureFailed`] when the gateway does not approve.
    #[instrument(skip_all, fields(payment_id = %payment.id))]
    pub async fn capture_payment(
        &self,
        payment: &mut Payment,
        amount: Option<Decimal>,
    ) -> Result<PaymentResult> {
        let correlation_id = Uuid::new_v4();
        self.ensure(payment, PaymentTransition::Capture, correlation_id)?;
        let transaction_id = payment.outer_id.clone().ok_or(GatewayError::MissingTransactionId)?;
        let amount = amount.unwrap_or(payment.sum);

        let result = self
            .client
            .capture_transaction(&CaptureTransactionRequest {
                credentials: self.credentials(),
                transaction_id,
                amount,
            })
            .await?;

        if result.outcome() != TransactionOutcome::Approved {
            let message = self.not_approved(payment, &result, correlation_id);
            return Err(GatewayError::CaptureFailed(message));
        }

        payment.is_approved = true;
        payment.captured_date = Some(Utc::now());
        payment.transactions.push(GatewayTransaction::record(
            TransactionKind::Capture,
            amount,
            &payment.currency,
            &result,
        ));
        self.transition(payment, PaymentTransition::Capture, Some(amount), correlation_id)?;
        Ok(PaymentResult::approved(payment, result.transaction_id))
    }

    /// Refunds a paid payment, or voids it if the transaction has not settled yet.
    ///
    /// The gateway only accepts refunds of settled transactions, so the settlement
    /// status is looked up first. A lookup the gateway does not answer successfully
    /// yields a rejected result and neither a refund nor a void is sent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidTransition`] unless the payment is `Paid`,
    /// [`GatewayError::MissingTransactionId`] without an outer id, and errors of the
    /// details, refund or void call.
    #[instrument(skip_all, fields(payment_id = %payment.id))]
    pub async fn refund_payment(
        &self,
        payment: &mut Payment,
        amount: Option<Decimal>,
    ) -> Result<PaymentResult> {
        let correlation_id = Uuid::new_v4();
        self.ensure(payment, PaymentTransition::Refund, correlation_id)?;
        let transaction_id = payment.outer_id.clone().ok_or(GatewayError::MissingTransactionId)?;

        let details = self
            .client
            .get_transaction_details(&TransactionDetailsRequest {
                credentials: self.credentials(),
                transaction_id: transaction_id.clone(),
            })
            .await
            .inspect_err(|e| {
                self.call_failed(payment, Some(transaction_id.as_str()), e, correlation_id);
            })?;

        if !details.is_success {
            let message = self.not_approved(payment, &details, correlation_id);
            return Ok(PaymentResult::rejected(payment, message));
        }

        if !details.is_settled() {
            info!(status = ?details.transaction_status, "transaction not settled, voiding instead");
            return self.void_outer_transaction(payment, transaction_id, correlation_id).await;
        }

        let Some(payment_data) = details.account_number.clone() else {
            let message = "There was an error processing your transaction: \
                           card number not available"
                .to_owned();
            audit_log(
                &AuditEvent::new(AuditEventType::GatewayNotApproved, &payment.id, correlation_id)
                    .with_transaction_id(&transaction_id)
                    .with_error(&message),
            );
            return Ok(PaymentResult::rejected(payment, message));
        };

        let amount = amount.unwrap_or(payment.sum);
        let result = self
            .client
            .refund_transaction(&RefundTransactionRequest {
                credentials: self.credentials(),
                transaction_id,
                amount,
                payment_data,
            })
            .await?;

        if result.outcome() != TransactionOutcome::Approved {
            let message = self.not_approved(payment, &result, correlation_id);
            return Ok(PaymentResult::rejected(payment, message));
        }

        payment.refunded_date = Some(Utc::now());
        payment.transactions.push(GatewayTransaction::record(
            TransactionKind::Refund,
            amount,
            &payment.currency,
            &result,
        ));
        self.transition(payment, PaymentTransition::Refund, Some(amount), correlation_id)?;
        Ok(PaymentResult::approved(payment, result.transaction_id))
    }

    /// Voids an authorized or paid payment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidTransition`] unless the payment is `Authorized` or
    /// `Paid`, [`GatewayError::MissingTransactionId`] without an outer id, and errors of
    /// the void call.
    #[instrument(skip_all, fields(payment_id = %payment.id))]
    pub async fn void_payment(&self, payment: &mut Payment) -> Result<PaymentResult> {
        let correlation_id = Uuid::new_v4();
        self.ensure(payment, PaymentTransition::Void, correlation_id)?;
        let transaction_id = payment.outer_id.clone().ok_or(GatewayError::MissingTransactionId)?;
        self.void_outer_transaction(payment, transaction_id, correlation_id).await
    }

    async fn void_outer_transaction(
        &self,
        payment: &mut Payment,
        transaction_id: String,
        correlation_id: Uuid,
    ) -> Result<PaymentResult> {
        let result = self
            .client
            .void_transaction(&VoidTransactionRequest {
                credentials: self.credentials(),
                transaction_id,
            })
            .await?;

        if result.outcome() != TransactionOutcome::Approved {
            let message = self.not_approved(payment, &result, correlation_id);
            return Ok(PaymentResult::rejected(payment, message));
        }

        payment.is_cancelled = true;
        payment.cancelled_date = Some(Utc::now());
        payment.transactions.push(GatewayTransaction::record(
            TransactionKind::Void,
            payment.sum,
            &payment.currency,
            &result,
        ));
        self.transition(payment, PaymentTransition::Void, Some(payment.sum), correlation_id)?;
        Ok(PaymentResult::approved(payment, result.transaction_id))
    }
}
