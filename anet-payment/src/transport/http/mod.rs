//! HTTP transport implementation backed by reqwest.

use std::sync::LazyLock;

use reqwest::{
    Client,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tracing::instrument;
use url::Url;

use super::config::HttpConfig;
use crate::{
    error::{GatewayError, Result},
    transport::{RequestContext, Transport, TransportResponse, sealed},
};

/// Default HTTP client shared by every default transport, for connection pooling.
static DEFAULT_HTTP_CLIENT: LazyLock<std::result::Result<Client, String>> = LazyLock::new(|| {
    build_client(&HttpConfig::default()).map_err(|e| e.to_string())
});

fn build_client(config: &HttpConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .build()
}

/// Validates URL for security constraints.
///
/// Ensures the URL uses HTTPS and does not point to localhost.
pub(crate) fn validate_url(url: &Url) -> Result<()> {
    if url.scheme() != "https" {
        return Err(GatewayError::InvalidInput(format!(
            "only HTTPS endpoints are allowed, got: {}",
            url.scheme()
        )));
    }

    if let Some(host) = url.host_str()
        && (host == "localhost"
            || host.starts_with("127.")
            || host == "::1"
            || host == "[::1]")
    {
        return Err(GatewayError::InvalidInput(format!(
            "loopback endpoints are not allowed: {host}"
        )));
    }

    Ok(())
}

/// Rejects header values carrying control characters.
fn validate_header_value(name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') || value.contains('\0') {
        return Err(GatewayError::InvalidInput(format!(
            "invalid {name} header value: control characters not allowed"
        )));
    }
    Ok(())
}

/// reqwest-based transport.
///
/// # Examples
///
/// ```
/// use anet_payment::transport::{HttpConfig, HttpTransport};
///
/// let config = HttpConfig { timeout_secs: 60, ..HttpConfig::default() };
/// let transport = HttpTransport::with_config(&config).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl sealed::private::Sealed for HttpTransport {}

impl HttpTransport {
    /// Creates a transport sharing the process-wide default client.
    ///
    /// Default configuration: 30 s total timeout, 10 s connect timeout, 10 idle
    /// connections per host.
    ///
    /// # Errors
    ///
    /// Returns error if the default client could not be built (TLS backend failure).
    pub fn new() -> Result<Self> {
        match &*DEFAULT_HTTP_CLIENT {
            Ok(client) => Ok(Self { client: client.clone() }),
            Err(e) => Err(GatewayError::Config(format!("cannot build HTTP client: {e}"))),
        }
    }

    /// Creates a transport with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is out of bounds or client creation fails.
    pub fn with_config(config: &HttpConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(config)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    #[instrument(skip(self, body), fields(url = ctx.url, bytes = body.len()))]
    async fn post<'a>(
        &'a self,
        ctx: RequestContext<'a>,
        body: &'a [u8],
    ) -> Result<TransportResponse> {
        let url = Url::parse(ctx.url)
            .map_err(|e| GatewayError::InvalidInput(format!("invalid endpoint URL: {e}")))?;
        validate_url(&url)?;
        validate_header_value("Content-Type", ctx.content_type)?;

        let mut request =
            self.client.post(url).header(CONTENT_TYPE, ctx.content_type).body(body.to_vec());

        if let Some(token) = ctx.bearer_token {
            validate_header_value("Authorization", token)?;
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        tracing::trace!(status, bytes = body.len(), "transport response received");

        Ok(TransportResponse { status, body })
    }
}
