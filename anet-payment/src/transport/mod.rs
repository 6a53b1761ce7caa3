//! Transport abstraction for gateway calls.
//!
//! The adapter only ever POSTs a serialized body and reads the raw reply back, either
//! to the Authorize.Net API endpoint (JSON) or to a merchant-configured proxy (XML with
//! bearer auth). The [`Transport`] trait captures exactly that, and is sealed so that
//! credentials never pass through implementations outside this crate.
//!
//! # Examples
//!
//! ```rust,no_run
//! use anet_payment::transport::{HttpTransport, RequestContext, Transport};
//!
//! # async fn example() -> anet_payment::error::Result<()> {
//! let transport = HttpTransport::new()?;
//!
//! let ctx = RequestContext {
//!     url: "https://apitest.authorize.net/xml/v1/request.api",
//!     content_type: "application/json",
//!     bearer_token: None,
//! };
//!
//! let response = transport.post(ctx, br#"{"authenticateTestRequest":{}}"#).await?;
//! println!("Status: {}", response.status);
//! # Ok(())
//! # }
//! ```

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;

use crate::error::Result;

pub mod config;
pub mod http;
mod sealed;

pub use config::HttpConfig;
pub use http::HttpTransport;

/// Request context for a single gateway POST.
#[derive(Clone)]
pub struct RequestContext<'a> {
    /// Absolute endpoint URL.
    pub url: &'a str,
    /// Content-Type header value.
    pub content_type: &'a str,
    /// Bearer token for the `Authorization` header, if the endpoint requires one.
    pub bearer_token: Option<&'a str>,
}

impl std::fmt::Debug for RequestContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("url", &self.url)
            .field("content_type", &self.content_type)
            .field("bearer_token", &self.bearer_token.map(|_| "<redacted>"))
            .finish()
    }
}

/// Raw response from a transport call.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body bytes.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Returns true for 2xx status codes.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport abstraction used by the gateway client.
///
/// Implementations return the response for any HTTP status; interpreting non-2xx
/// replies is left to the caller because the proxy path still parses error envelopes
/// carried by them.
pub trait Transport: sealed::private::Sealed + Send + Sync {
    /// Executes a POST request with body.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is rejected or the HTTP exchange fails.
    fn post<'a>(
        &'a self,
        ctx: RequestContext<'a>,
        body: &'a [u8],
    ) -> impl Future<Output = Result<TransportResponse>> + Send + 'a;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport double for client tests.

    use std::{collections::VecDeque, sync::Mutex};

    use super::*;
    use crate::error::GatewayError;

    /// A request captured by [`ScriptedTransport`].
    #[derive(Debug, Clone)]
    pub(crate) struct RecordedRequest {
        pub url: String,
        pub content_type: String,
        pub bearer_token: Option<String>,
        pub body: String,
    }

    /// Replays canned responses in order and records every request.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTransport {
        responses: Mutex<VecDeque<(u16, Vec<u8>)>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn with_responses<I, B>(responses: I) -> Self
        where
            I: IntoIterator<Item = (u16, B)>,
            B: Into<Vec<u8>>,
        {
            let responses = responses.into_iter().map(|(s, b)| (s, b.into())).collect();
            Self { responses: Mutex::new(responses), requests: Mutex::default() }
        }

        pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl sealed::private::Sealed for ScriptedTransport {}

    impl Transport for ScriptedTransport {
        async fn post<'a>(
            &'a self,
            ctx: RequestContext<'a>,
            body: &'a [u8],
        ) -> Result<TransportResponse> {
            self.requests.lock().unwrap().push(RecordedRequest {
                url: ctx.url.to_owned(),
                content_type: ctx.content_type.to_owned(),
                bearer_token: ctx.bearer_token.map(str::to_owned),
                body: String::from_utf8_lossy(body).into_owned(),
            });
            let (status, body) = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| GatewayError::InvalidInput("no scripted response left".into()))?;
            Ok(TransportResponse { status, body })
        }
    }
}
