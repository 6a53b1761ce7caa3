//! Integration tests for the payment lifecycle.
//!
//! Drives [`AuthorizeNetPaymentMethod`] against a recording gateway double and checks
//! the resulting payment state and the gateway calls made.

use std::sync::Mutex;

use anet_payment::{
    config::PaymentMethodConfig,
    error::{GatewayError, Result},
    gateway::{
        CaptureTransactionRequest, CreateTransactionRequest, Credentials, GatewayClient,
        PaymentActionType, PaymentSource, PublicClientKeyRequest, PublicClientKeyResult,
        RefundTransactionRequest, SETTLED_SUCCESSFULLY, TransactionDetailsRequest,
        TransactionMessage, TransactionResult, VoidTransactionRequest,
    },
    payment::{
        AuthorizeNetPaymentMethod, MethodSettings, Order, Payment, PaymentStatus,
        PaymentTransition, PostProcessParams, TransactionKind,
    },
};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    ClientKey,
    Create { action: PaymentActionType, amount: Decimal, nonce: String },
    Capture { transaction_id: String, amount: Decimal },
    Refund { transaction_id: String, amount: Decimal, payment_data: String },
    Void { transaction_id: String },
    Details { transaction_id: String },
}

#[derive(Debug)]
struct RecordingGateway {
    calls: Mutex<Vec<Call>>,
    client_key: Option<String>,
    create: TransactionResult,
    create_hash_mismatch: bool,
    capture: TransactionResult,
    refund: TransactionResult,
    void: TransactionResult,
    details: Option<TransactionResult>,
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            client_key: Some("5FcB6WrfHGS76gHW3v7btBCE3HuuBuke9Pj96Ztfn5R32G5ep42vne7MCWZtAucY".into()),
            create: result("1", "60100000001"),
            create_hash_mismatch: false,
            capture: result("1", "60100000001"),
            refund: result("1", "60100000002"),
            void: result("1", "60100000001"),
            details: Some(details(SETTLED_SUCCESSFULLY)),
        }
    }
}

impl RecordingGateway {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl GatewayClient for RecordingGateway {
    async fn get_public_client_key(
        &self,
        _request: &PublicClientKeyRequest,
    ) -> Result<PublicClientKeyResult> {
        self.record(Call::ClientKey);
        Ok(match &self.client_key {
            Some(key) => PublicClientKeyResult {
                is_success: true,
                client_key: Some(key.clone()),
                messages: vec![TransactionMessage::new("I00001", "Successful.")],
            },
            None => PublicClientKeyResult {
                is_success: false,
                client_key: None,
                messages: vec![TransactionMessage::new("E00007", "User authentication failed.")],
            },
        })
    }

    async fn create_transaction(&self, request: &CreateTransactionRequest) -> Result<TransactionResult> {
        let nonce = match &request.payment {
            PaymentSource::Nonce { data_value, .. } => data_value.clone(),
            PaymentSource::CreditCard(_) => String::new(),
        };
        self.record(Call::Create { action: request.action_type, amount: request.amount, nonce });
        if self.create_hash_mismatch {
            return Err(GatewayError::ResponseVerification(
                "transHashSha2 does not match the response".into(),
            ));
        }
        Ok(self.create.clone())
    }

    async fn capture_transaction(&self, request: &CaptureTransactionRequest) -> Result<TransactionResult> {
        self.record(Call::Capture {
            transaction_id: request.transaction_id.clone(),
            amount: request.amount,
        });
        Ok(self.capture.clone())
    }

    async fn refund_transaction(&self, request: &RefundTransactionRequest) -> Result<TransactionResult> {
        self.record(Call::Refund {
            transaction_id: request.transaction_id.clone(),
            amount: request.amount,
            payment_data: request.payment_data.clone(),
        });
        Ok(self.refund.clone())
    }

    async fn void_transaction(&self, request: &VoidTransactionRequest) -> Result<TransactionResult> {
        self.record(Call::Void { transaction_id: request.transaction_id.clone() });
        Ok(self.void.clone())
    }

    async fn get_transaction_details(
        &self,
        request: &TransactionDetailsRequest,
    ) -> Result<TransactionResult> {
        self.record(Call::Details { transaction_id: request.transaction_id.clone() });
        self.details
            .clone()
            .ok_or_else(|| GatewayError::GatewayStatus(503))
    }
}

fn result(code: &str, transaction_id: &str) -> TransactionResult {
    let approved = code == "1";
    let (messages, errors) = match code {
        "1" => (vec![TransactionMessage::new("1", "This transaction has been approved.")], vec![]),
        "2" => (vec![], vec![TransactionMessage::new("2", "This transaction has been declined.")]),
        "4" => (
            vec![],
            vec![TransactionMessage::new(
                "252",
                "Your order has been received. Thank you for your business!",
            )],
        ),
        _ => (vec![], vec![TransactionMessage::new("6", "The credit card number is invalid.")]),
    };
    TransactionResult {
        is_success: approved,
        response_code: Some(code.to_owned()),
        transaction_id: Some(transaction_id.to_owned()),
        messages,
        errors,
        ..TransactionResult::default()
    }
}

fn details(status: &str) -> TransactionResult {
    TransactionResult {
        is_success: true,
        response_code: Some("1".into()),
        transaction_id: Some("60100000001".into()),
        transaction_status: Some(status.to_owned()),
        account_number: Some("XXXX1111".into()),
        ..TransactionResult::default()
    }
}

fn method(
    gateway: RecordingGateway,
    action_type: &str,
) -> AuthorizeNetPaymentMethod<RecordingGateway> {
    let config = PaymentMethodConfig::from_toml(&format!(
        r#"
        payment_action_type = "{action_type}"
        process_payment_action = "https://shop.example.com/cart/externalpaymentcallback?orderId={{orderId}}"

        [credentials]
        api_login = "5KP3u95bQpv"
        transaction_key_env = "ANET_TRANSACTION_KEY"
    "#
    ))
    .expect("valid config");
    let credentials = Credentials::sandbox("5KP3u95bQpv", "4Ktq966gC55GAX7S");
    AuthorizeNetPaymentMethod::new(gateway, MethodSettings::new(&config, credentials))
}

fn order() -> Order {
    Order { id: "9f1c2d7e".into(), number: "CO-1001".into() }
}

fn pending_payment() -> Payment {
    let mut payment = Payment::new("pay-1", Decimal::new(2550, 2), "USD");
    payment.status = PaymentStatus::Pending;
    payment
}

fn paid_payment() -> Payment {
    let mut payment = pending_payment();
    payment.status = PaymentStatus::Paid;
    payment.outer_id = Some("60100000001".into());
    payment
}

fn nonce_params() -> PostProcessParams {
    PostProcessParams::from_query(
        "orderId=9f1c2d7e&dataDescriptor=COMMON.ACCEPT.INAPP.PAYMENT&dataValue=eyJjb2RlIjoiNTBf",
    )
}

#[tokio::test]
async fn test_process_payment_renders_form() {
    let method = method(RecordingGateway::default(), "Sale");
    let mut payment = Payment::new("pay-1", Decimal::new(2550, 2), "USD");

    let result = method.process_payment(&mut payment, &order(), Some("203.0.113.7")).await.unwrap();

    assert!(result.is_success);
    assert_eq!(result.new_status, PaymentStatus::Pending);
    assert_eq!(payment.status, PaymentStatus::Pending);
    let form = result.html_form.expect("form rendered");
    assert!(form.contains(&tera::escape_html(
        "https://shop.example.com/cart/externalpaymentcallback?orderId=9f1c2d7e"
    )));
    assert!(form.contains(&tera::escape_html("https://jstest.authorize.net/v1/Accept.js")));
    assert!(form.contains("5FcB6WrfHGS76gHW3v7btBCE3HuuBuke9Pj96Ztfn5R32G5ep42vne7MCWZtAucY"));
    assert_eq!(method.client().calls(), vec![Call::ClientKey]);
}

#[tokio::test]
async fn test_process_payment_without_client_key_still_pending() {
    let gateway = RecordingGateway { client_key: None, ..RecordingGateway::default() };
    let method = method(gateway, "Sale");
    let mut payment = Payment::new("pay-1", Decimal::new(2550, 2), "USD");

    let result = method.process_payment(&mut payment, &order(), None).await.unwrap();

    assert!(!result.is_success);
    assert!(result.html_form.is_none());
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(result.error_message.as_deref(), Some("E00007: User authentication failed."));
}

#[test]
fn test_validate_post_process_request() {
    let method = method(RecordingGateway::default(), "Sale");

    let valid = method.validate_post_process_request(&nonce_params());
    assert!(valid.is_success);
    assert_eq!(valid.outer_id.as_deref(), Some("9f1c2d7e"));

    let missing = method.validate_post_process_request(&PostProcessParams::from_query("orderId=1"));
    assert!(!missing.is_success);
}

#[tokio::test]
async fn test_sale_ends_paid() {
    let method = method(RecordingGateway::default(), "Sale");
    let mut payment = pending_payment();

    let result = method.post_process_payment(&mut payment, &order(), &nonce_params()).await.unwrap();

    assert!(result.is_success);
    assert_eq!(result.new_status, PaymentStatus::Paid);
    assert_eq!(result.outer_id.as_deref(), Some("60100000001"));
    assert_eq!(payment.outer_id.as_deref(), Some("60100000001"));
    assert!(payment.is_approved);
    assert!(payment.captured_date.is_some());
    assert_eq!(payment.transactions.len(), 1);
    assert_eq!(payment.transactions[0].kind, TransactionKind::Sale);
    assert_eq!(
        method.client().calls(),
        vec![Call::Create {
            action: PaymentActionType::Sale,
            amount: Decimal::new(2550, 2),
            nonce: "eyJjb2RlIjoiNTBf".into(),
        }]
    );
}

#[tokio::test]
async fn test_authorization_then_capture() {
    let method = method(RecordingGateway::default(), "Authorization/Capture");
    let mut payment = pending_payment();

    let authorized =
        method.post_process_payment(&mut payment, &order(), &nonce_params()).await.unwrap();
    assert_eq!(authorized.new_status, PaymentStatus::Authorized);
    assert!(!payment.is_approved);
    assert!(payment.authorized_date.is_some());
    assert!(payment.captured_date.is_none());

    let captured = method.capture_payment(&mut payment, None).await.unwrap();
    assert_eq!(captured.new_status, PaymentStatus::Paid);
    assert!(payment.is_approved);
    assert!(payment.captured_date.is_some());
    assert_eq!(payment.transactions.len(), 2);
    assert_eq!(
        method.client().calls()[1],
        Call::Capture { transaction_id: "60100000001".into(), amount: Decimal::new(2550, 2) }
    );
}

#[tokio::test]
async fn test_partial_capture_amount() {
    let method = method(RecordingGateway::default(), "Authorization/Capture");
    let mut payment = pending_payment();
    payment.status = PaymentStatus::Authorized;
    payment.outer_id = Some("60100000001".into());

    method.capture_payment(&mut payment, Some(Decimal::new(1000, 2))).await.unwrap();

    assert_eq!(
        method.client().calls(),
        vec![Call::Capture { transaction_id: "60100000001".into(), amount: Decimal::new(1000, 2) }]
    );
    assert_eq!(payment.transactions[0].amount, Decimal::new(1000, 2));
}

#[tokio::test]
async fn test_capture_requires_authorized() {
    let method = method(RecordingGateway::default(), "Sale");
    let mut payment = paid_payment();

    let err = method.capture_payment(&mut payment, None).await.unwrap_err();

    assert!(matches!(
        err,
        GatewayError::InvalidTransition {
            from: PaymentStatus::Paid,
            transition: PaymentTransition::Capture
        }
    ));
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert!(method.client().calls().is_empty());
}

#[tokio::test]
async fn test_capture_requires_transaction_id() {
    let method = method(RecordingGateway::default(), "Authorization/Capture");
    let mut payment = pending_payment();
    payment.status = PaymentStatus::Authorized;

    let err = method.capture_payment(&mut payment, None).await.unwrap_err();

    assert!(matches!(err, GatewayError::MissingTransactionId));
    assert!(method.client().calls().is_empty());
}

#[tokio::test]
async fn test_declined_capture_fails() {
    let gateway = RecordingGateway { capture: result("2", "0"), ..RecordingGateway::default() };
    let method = method(gateway, "Authorization/Capture");
    let mut payment = pending_payment();
    payment.status = PaymentStatus::Authorized;
    payment.outer_id = Some("60100000001".into());

    let err = method.capture_payment(&mut payment, None).await.unwrap_err();

    match err {
        GatewayError::CaptureFailed(message) => {
            assert!(message.contains("This transaction has been declined."));
        }
        other => panic!("expected CaptureFailed, got {other:?}"),
    }
    assert_eq!(payment.status, PaymentStatus::Authorized);
    assert!(payment.transactions.is_empty());
}

#[tokio::test]
async fn test_declined_sale() {
    let gateway = RecordingGateway { create: result("2", "0"), ..RecordingGateway::default() };
    let method = method(gateway, "Sale");
    let mut payment = pending_payment();

    let result = method.post_process_payment(&mut payment, &order(), &nonce_params()).await.unwrap();

    assert!(!result.is_success);
    assert_eq!(payment.status, PaymentStatus::Declined);
    assert_eq!(
        result.error_message.as_deref(),
        Some("Your transaction was declined: 2: This transaction has been declined.")
    );
    assert!(payment.outer_id.is_none());
    assert!(!payment.is_approved);
    assert!(payment.transactions.is_empty());
}

#[tokio::test]
async fn test_declined_payment_can_be_retried() {
    let gateway = RecordingGateway { create: result("2", "0"), ..RecordingGateway::default() };
    let declining = method(gateway, "Sale");
    let mut payment = pending_payment();
    declining.post_process_payment(&mut payment, &order(), &nonce_params()).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Declined);

    let approving = method(RecordingGateway::default(), "Sale");
    let result = approving.post_process_payment(&mut payment, &order(), &nonce_params()).await.unwrap();

    assert!(result.is_success);
    assert_eq!(payment.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_held_for_review_stays_pending() {
    let gateway = RecordingGateway { create: result("4", "60100000003"), ..RecordingGateway::default() };
    let method = method(gateway, "Sale");
    let mut payment = pending_payment();

    let result = method.post_process_payment(&mut payment, &order(), &nonce_params()).await.unwrap();

    assert!(!result.is_success);
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(
        result
            .error_message
            .unwrap()
            .starts_with("Your transaction is held for review: 252")
    );
}

#[tokio::test]
async fn test_gateway_error_sets_error_status() {
    let gateway = RecordingGateway { create: result("3", "0"), ..RecordingGateway::default() };
    let method = method(gateway, "Sale");
    let mut payment = pending_payment();

    let result = method.post_process_payment(&mut payment, &order(), &nonce_params()).await.unwrap();

    assert_eq!(payment.status, PaymentStatus::Error);
    assert_eq!(
        result.error_message.as_deref(),
        Some("There was an error processing your transaction: 6: The credit card number is invalid.")
    );
}

#[tokio::test]
async fn test_padded_response_code_is_an_error() {
    let padded = TransactionResult {
        response_code: Some(" 1".into()),
        ..result("1", "60100000001")
    };
    let gateway = RecordingGateway { create: padded, ..RecordingGateway::default() };
    let method = method(gateway, "Sale");
    let mut payment = pending_payment();

    let result = method.post_process_payment(&mut payment, &order(), &nonce_params()).await.unwrap();

    assert!(!result.is_success);
    assert_eq!(payment.status, PaymentStatus::Error);
    assert!(payment.outer_id.is_none());
    assert!(!payment.is_approved);
    assert!(payment.transactions.is_empty());
}

#[tokio::test]
async fn test_unverified_create_response_leaves_payment_unchanged() {
    let gateway = RecordingGateway { create_hash_mismatch: true, ..RecordingGateway::default() };
    let method = method(gateway, "Sale");
    let mut payment = pending_payment();

    let err = method.post_process_payment(&mut payment, &order(), &nonce_params()).await.unwrap_err();

    assert!(matches!(err, GatewayError::ResponseVerification(_)));
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(payment.outer_id.is_none());
    assert!(payment.transactions.is_empty());
    assert_eq!(method.client().calls().len(), 1);
}

#[tokio::test]
async fn test_post_process_requires_nonce() {
    let method = method(RecordingGateway::default(), "Sale");
    let mut payment = pending_payment();
    let params = PostProcessParams::from_query("orderId=9f1c2d7e&dataDescriptor=COMMON.ACCEPT.INAPP.PAYMENT");

    let err = method.post_process_payment(&mut payment, &order(), &params).await.unwrap_err();

    assert!(matches!(err, GatewayError::InvalidInput(_)));
    assert!(method.client().calls().is_empty());
}

#[tokio::test]
async fn test_post_process_after_payment_is_rejected() {
    let method = method(RecordingGateway::default(), "Sale");
    let mut payment = paid_payment();

    let err = method.post_process_payment(&mut payment, &order(), &nonce_params()).await.unwrap_err();

    assert!(matches!(err, GatewayError::InvalidTransition { from: PaymentStatus::Paid, .. }));
    assert!(method.client().calls().is_empty());
}

#[tokio::test]
async fn test_refund_of_settled_transaction() {
    let method = method(RecordingGateway::default(), "Sale");
    let mut payment = paid_payment();

    let result = method.refund_payment(&mut payment, None).await.unwrap();

    assert!(result.is_success);
    assert_eq!(payment.status, PaymentStatus::Refunded);
    assert!(payment.refunded_date.is_some());
    assert_eq!(
        method.client().calls(),
        vec![
            Call::Details { transaction_id: "60100000001".into() },
            Call::Refund {
                transaction_id: "60100000001".into(),
                amount: Decimal::new(2550, 2),
                payment_data: "XXXX1111".into(),
            },
        ]
    );
}

#[tokio::test]
async fn test_refund_of_unsettled_transaction_voids() {
    let gateway = RecordingGateway {
        details: Some(details("capturedPendingSettlement")),
        ..RecordingGateway::default()
    };
    let method = method(gateway, "Sale");
    let mut payment = paid_payment();

    let result = method.refund_payment(&mut payment, None).await.unwrap();

    assert!(result.is_success);
    assert_eq!(payment.status, PaymentStatus::Voided);
    assert!(payment.is_cancelled);
    assert!(payment.cancelled_date.is_some());
    assert!(payment.refunded_date.is_none());

    let calls = method.client().calls();
    assert!(calls.contains(&Call::Void { transaction_id: "60100000001".into() }));
    assert!(!calls.iter().any(|call| matches!(call, Call::Refund { .. })));
}

#[tokio::test]
async fn test_refund_details_transport_failure_propagates() {
    let gateway = RecordingGateway { details: None, ..RecordingGateway::default() };
    let method = method(gateway, "Sale");
    let mut payment = paid_payment();

    let err = method.refund_payment(&mut payment, None).await.unwrap_err();

    assert!(matches!(err, GatewayError::GatewayStatus(503)));
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert_eq!(
        method.client().calls(),
        vec![Call::Details { transaction_id: "60100000001".into() }]
    );
}

#[tokio::test]
async fn test_refund_with_unsuccessful_details_sends_nothing() {
    let gateway = RecordingGateway {
        details: Some(TransactionResult {
            is_success: false,
            errors: vec![TransactionMessage::new("E00040", "The record cannot be found.")],
            ..TransactionResult::default()
        }),
        ..RecordingGateway::default()
    };
    let method = method(gateway, "Sale");
    let mut payment = paid_payment();

    let result = method.refund_payment(&mut payment, None).await.unwrap();

    assert!(!result.is_success);
    assert_eq!(result.new_status, PaymentStatus::Paid);
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert!(!payment.is_cancelled);
    assert!(payment.transactions.is_empty());
    assert_eq!(
        result.error_message.as_deref(),
        Some("There was an error processing your transaction: E00040: The record cannot be found.")
    );
    assert_eq!(
        method.client().calls(),
        vec![Call::Details { transaction_id: "60100000001".into() }]
    );
}

#[tokio::test]
async fn test_declined_refund_keeps_paid() {
    let gateway = RecordingGateway { refund: result("2", "0"), ..RecordingGateway::default() };
    let method = method(gateway, "Sale");
    let mut payment = paid_payment();

    let result = method.refund_payment(&mut payment, Some(Decimal::new(500, 2))).await.unwrap();

    assert!(!result.is_success);
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert!(result.error_message.unwrap().starts_with("Your transaction was declined"));
}

#[tokio::test]
async fn test_refund_requires_paid() {
    let method = method(RecordingGateway::default(), "Authorization/Capture");
    let mut payment = pending_payment();
    payment.status = PaymentStatus::Authorized;
    payment.outer_id = Some("60100000001".into());

    let err = method.refund_payment(&mut payment, None).await.unwrap_err();

    assert!(matches!(
        err,
        GatewayError::InvalidTransition {
            from: PaymentStatus::Authorized,
            transition: PaymentTransition::Refund
        }
    ));
    assert!(method.client().calls().is_empty());
}

#[tokio::test]
async fn test_void_authorized_payment() {
    let method = method(RecordingGateway::default(), "Authorization/Capture");
    let mut payment = pending_payment();
    payment.status = PaymentStatus::Authorized;
    payment.outer_id = Some("60100000001".into());

    let result = method.void_payment(&mut payment).await.unwrap();

    assert!(result.is_success);
    assert_eq!(payment.status, PaymentStatus::Voided);
    assert!(payment.is_cancelled);
    assert_eq!(payment.transactions[0].kind, TransactionKind::Void);
}

#[tokio::test]
async fn test_failed_void_keeps_status() {
    let gateway = RecordingGateway { void: result("3", "0"), ..RecordingGateway::default() };
    let method = method(gateway, "Authorization/Capture");
    let mut payment = pending_payment();
    payment.status = PaymentStatus::Authorized;
    payment.outer_id = Some("60100000001".into());

    let result = method.void_payment(&mut payment).await.unwrap();

    assert!(!result.is_success);
    assert_eq!(payment.status, PaymentStatus::Authorized);
    assert!(!payment.is_cancelled);
}

#[tokio::test]
async fn test_void_of_new_payment_is_rejected() {
    let method = method(RecordingGateway::default(), "Sale");
    let mut payment = Payment::new("pay-1", Decimal::ONE, "USD");

    let err = method.void_payment(&mut payment).await.unwrap_err();

    assert!(matches!(err, GatewayError::InvalidTransition { from: PaymentStatus::New, .. }));
}
