//! Authorize.Net gateway client.

use std::collections::HashMap;

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info, instrument, warn};

use super::{
    hash::verify_transaction_hash,
    mask::{secure_serializable, secure_value},
    models::{
        CaptureTransactionRequest, CreateTransactionRequest, Credentials, CreditCard,
        PaymentSource, PublicClientKeyRequest, PublicClientKeyResult, RefundTransactionRequest,
        TransactionDetailsRequest, TransactionOutcome, TransactionResult, VoidTransactionRequest,
    },
    proxy,
    wire::{
        CreateTransactionBody, CreateTransactionEnvelope, CreateTransactionResponse,
        MerchantDetailsEnvelope, MerchantDetailsResponse, TransactionDetailsEnvelope,
        TransactionDetailsResponse, decode_json,
    },
};
use crate::{
    error::{GatewayError, Result},
    transport::{HttpTransport, RequestContext, Transport},
};

/// Production API endpoint.
pub const PRODUCTION_ENDPOINT: &str = "https://api.authorize.net/xml/v1/request.api";
/// Sandbox API endpoint.
pub const SANDBOX_ENDPOINT: &str = "https://apitest.authorize.net/xml/v1/request.api";
/// Proxy used when a card does not name one.
pub const DEFAULT_PROXY: &str = "default";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Gateway endpoints, selected per call by [`Credentials::is_live_mode`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Sandbox endpoint URL.
    pub sandbox: String,
    /// Production endpoint URL.
    pub production: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self { sandbox: SANDBOX_ENDPOINT.to_owned(), production: PRODUCTION_ENDPOINT.to_owned() }
    }
}

impl Endpoints {
    fn select(&self, credentials: &Credentials) -> &str {
        if credentials.is_live_mode { &self.production } else { &self.sandbox }
    }
}

/// Gateway operations used by the payment lifecycle.
///
/// Each operation is a single gateway call. Gateway-level failures (declines, API
/// errors) come back as unsuccessful results; only transport, codec and verification
/// failures are returned as errors.
pub trait GatewayClient: Send + Sync {
    /// Fetches the merchant's public client key for Accept.js.
    ///
    /// # Errors
    ///
    /// Returns error if the call fails or the response cannot be decoded.
    fn get_public_client_key(
        &self,
        request: &PublicClientKeyRequest,
    ) -> impl Future<Output = Result<PublicClientKeyResult>> + Send;

    /// Charges or authorizes a payment, through the card's proxy when it names one.
    ///
    /// # Errors
    ///
    /// Returns error if the call fails, the response cannot be decoded, or its hash
    /// does not verify.
    fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
    ) -> impl Future<Output = Result<TransactionResult>> + Send;

    /// Captures a prior authorization.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayClient::create_transaction`].
    fn capture_transaction(
        &self,
        request: &CaptureTransactionRequest,
    ) -> impl Future<Output = Result<TransactionResult>> + Send;

    /// Refunds a settled transaction.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayClient::create_transaction`].
    fn refund_transaction(
        &self,
        request: &RefundTransactionRequest,
    ) -> impl Future<Output = Result<TransactionResult>> + Send;

    /// Voids an unsettled transaction.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayClient::create_transaction`].
    fn void_transaction(
        &self,
        request: &VoidTransactionRequest,
    ) -> impl Future<Output = Result<TransactionResult>> + Send;

    /// Looks up a transaction, including its settlement status.
    ///
    /// # Errors
    ///
    /// Returns error if the call fails or the response cannot be decoded.
    fn get_transaction_details(
        &self,
        request: &TransactionDetailsRequest,
    ) -> impl Future<Output = Result<TransactionResult>> + Send;
}

/// [`GatewayClient`] for the Authorize.Net JSON API.
///
/// # Examples
///
/// ```
/// use anet_payment::gateway::{AuthorizeNetClient, Endpoints};
///
/// let client = AuthorizeNetClient::new()
///     .unwrap()
///     .with_endpoints(Endpoints::default())
///     .with_proxy("default", "tok_proxy".to_owned().into());
/// ```
pub struct AuthorizeNetClient<T = HttpTransport> {
    transport: T,
    endpoints: Endpoints,
    proxies: HashMap<String, SecretString>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for AuthorizeNetClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizeNetClient")
            .field("transport", &self.transport)
            .field("endpoints", &self.endpoints)
            .field("proxies", &self.proxies.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AuthorizeNetClient<HttpTransport> {
    /// Creates a client on the shared default HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new()?))
    }
}

impl<T: Transport> AuthorizeNetClient<T> {
    /// Creates a client over the given transport with default endpoints and no proxies.
    #[must_use]
    pub fn with_transport(transport: T) -> Self {
        Self { transport, endpoints: Endpoints::default(), proxies: HashMap::new() }
    }

    /// Overrides the gateway endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Registers the bearer token of a named proxy.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_proxy(mut self, name: impl Into<String>, token: SecretString) -> Self {
        self.proxies.insert(name.into(), token);
        self
    }

    fn proxy_token(&self, name: &str) -> Result<&SecretString> {
        self.proxies.get(name).ok_or_else(|| {
            GatewayError::Config(format!("no bearer token configured for proxy '{name}'"))
        })
    }

    async fn post_json<Req, Resp>(&self, credentials: &Credentials, request: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        debug!(request = %secure_serializable(request), "gateway request");
        let body =
            serde_json::to_vec(request).map_err(|e| GatewayError::Serialization(e.to_string()))?;

        let ctx = RequestContext {
            url: self.endpoints.select(credentials),
            content_type: JSON_CONTENT_TYPE,
            bearer_token: None,
        };
        let response = self.transport.post(ctx, &body).await?;
        if !response.is_success() {
            return Err(GatewayError::GatewayStatus(response.status));
        }

        let value: serde_json::Value = decode_json(&response.body)?;
        debug!(response = %secure_value(&value), "gateway response");
        serde_json::from_value(value).map_err(|e| GatewayError::Deserialization(e.to_string()))
    }

    async fn post_transaction(
        &self,
        credentials: &Credentials,
        body: CreateTransactionBody<'_>,
    ) -> Result<TransactionResult> {
        let envelope = CreateTransactionEnvelope { create_transaction_request: body };
        let response: CreateTransactionResponse = self.post_json(credentials, &envelope).await?;
        Ok(response.into())
    }
}

fn require_transaction_id(transaction_id: &str) -> Result<()> {
    if transaction_id.trim().is_empty() {
        return Err(GatewayError::InvalidInput("transaction id must not be empty".into()));
    }
    Ok(())
}

fn log_outcome(operation: &str, result: &TransactionResult) {
    match result.outcome() {
        TransactionOutcome::Approved => info!(
            operation,
            transaction_id = result.transaction_id.as_deref().unwrap_or_default(),
            "transaction approved"
        ),
        outcome => {
            warn!(operation, ?outcome, details = %result.summary(), "transaction not approved");
        }
    }
}

impl<T: Transport> GatewayClient for AuthorizeNetClient<T> {
    #[instrument(skip_all, fields(live = request.credentials.is_live_mode))]
    async fn get_public_client_key(
        &self,
        request: &PublicClientKeyRequest,
    ) -> Result<PublicClientKeyResult> {
        let envelope = MerchantDetailsEnvelope::new(&request.credentials);
        let response: MerchantDetailsResponse =
            self.post_json(&request.credentials, &envelope).await?;
        let result = PublicClientKeyResult::from(response);
        if !result.is_success {
            warn!(messages = ?result.messages, "public client key request failed");
        }
        Ok(result)
    }

    #[instrument(
        skip_all,
        fields(
            order_id = %request.order_id,
            action = %request.action_type,
            live = request.credentials.is_live_mode
        )
    )]
    async fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<TransactionResult> {
        let body = CreateTransactionBody::create(request);
        let result = match &request.payment {
            PaymentSource::CreditCard(CreditCard {
                proxy_endpoint_url: Some(endpoint), proxy_name, ..
            }) => {
                let token = self.proxy_token(proxy_name.as_deref().unwrap_or(DEFAULT_PROXY))?;
                proxy::send(&self.transport, endpoint, token.expose_secret(), body).await?
            }
            PaymentSource::CreditCard(_) | PaymentSource::Nonce { .. } => {
                self.post_transaction(&request.credentials, body).await?
            }
        };

        verify_transaction_hash(&request.credentials, &result, request.amount)?;
        log_outcome("create", &result);
        Ok(result)
    }

    #[instrument(skip_all, fields(transaction_id = %request.transaction_id))]
    async fn capture_transaction(
        &self,
        request: &CaptureTransactionRequest,
    ) -> Result<TransactionResult> {
        require_transaction_id(&request.transaction_id)?;
        let body = CreateTransactionBody::capture(request);
        let result = self.post_transaction(&request.credentials, body).await?;
        verify_transaction_hash(&request.credentials, &result, request.amount)?;
        log_outcome("capture", &result);
        Ok(result)
    }

    #[instrument(skip_all, fields(transaction_id = %request.transaction_id))]
    async fn refund_transaction(
        &self,
        request: &RefundTransactionRequest,
    ) -> Result<TransactionResult> {
        require_transaction_id(&request.transaction_id)?;
        let body = CreateTransactionBody::refund(request);
        let result = self.post_transaction(&request.credentials, body).await?;
        verify_transaction_hash(&request.credentials, &result, request.amount)?;
        log_outcome("refund", &result);
        Ok(result)
    }

    #[instrument(skip_all, fields(transaction_id = %request.transaction_id))]
    async fn void_transaction(
        &self,
        request: &VoidTransactionRequest,
    ) -> Result<TransactionResult> {
        require_transaction_id(&request.transaction_id)?;
        let body = CreateTransactionBody::void(request);
        let result = self.post_transaction(&request.credentials, body).await?;
        log_outcome("void", &result);
        Ok(result)
    }

    #[instrument(skip_all, fields(transaction_id = %request.transaction_id))]
    async fn get_transaction_details(
        &self,
        request: &TransactionDetailsRequest,
    ) -> Result<TransactionResult> {
        require_transaction_id(&request.transaction_id)?;
        let envelope =
            TransactionDetailsEnvelope::new(&request.credentials, &request.transaction_id);
        let response: TransactionDetailsResponse =
            self.post_json(&request.credentials, &envelope).await?;
        let result = TransactionResult::from(response);
        debug!(status = ?result.transaction_status, "transaction details");
        Ok(result)
    }
}
