//! A [`TokenizeClient`] that trades authorizations for nonces against a remote gateway over HTTP.
//!
//! Every [`AuthorizationPayload`] is POSTed as tagged JSON to `<base>/v1/<endpoint>`, where the
//! endpoint depends on the flow. A 2xx response carries the [`PaymentNonce`].
//!
//! ## Error Handling
//!
//! [`GatewayError`] keeps the failure context (URL construction, HTTP transport, unexpected
//! status, JSON decoding). At the port boundary every variant becomes
//! [`FlowError::NetworkFailure`].

use crate::domain::outcome::{AuthorizationPayload, PaymentNonce};
use crate::domain::ports::TokenizeClient;
use crate::error::FlowError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// Errors that can occur while talking to the tokenization gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        context: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("HTTP error: {context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        context: &'static str,
        status: StatusCode,
        body: String,
    },
}

impl From<GatewayError> for FlowError {
    fn from(err: GatewayError) -> Self {
        FlowError::network(err.to_string())
    }
}

/// HTTP client for the tokenization gateway.
#[derive(Clone, Debug)]
pub struct HttpTokenizeClient {
    /// Base URL of the gateway, always ending in `/`.
    base_url: Url,
    client: Client,
    bearer_token: Option<String>,
    timeout: Option<Duration>,
}

impl HttpTokenizeClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: Client::new(),
            bearer_token: None,
            timeout: None,
        }
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The full URL a payload is POSTed to.
    pub fn endpoint_url(&self, payload: &AuthorizationPayload) -> Result<Url, GatewayError> {
        self.base_url
            .join(&format!("v1/{}", payload.endpoint()))
            .map_err(|source| GatewayError::UrlParse {
                context: "Failed to construct tokenize URL",
                source,
            })
    }

    pub async fn tokenize(
        &self,
        payload: &AuthorizationPayload,
    ) -> Result<PaymentNonce, GatewayError> {
        let url = self.endpoint_url(payload)?;
        let context = "POST tokenize";

        let mut req = self.client.post(url.clone()).json(payload);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let response = req
            .send()
            .await
            .map_err(|source| GatewayError::Http { context, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(url = %url, %status, "gateway rejected tokenize request");
            return Err(GatewayError::HttpStatus {
                context,
                status,
                body,
            });
        }

        let nonce = response
            .json::<PaymentNonce>()
            .await
            .map_err(|source| GatewayError::JsonDeserialization { context, source })?;
        debug!(url = %url, "gateway returned a nonce");
        Ok(nonce)
    }
}

/// Parses a base URL, normalizing it to exactly one trailing slash.
impl TryFrom<&str> for HttpTokenizeClient {
    type Error = GatewayError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut normalized = value.trim_end_matches('/').to_string();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|source| GatewayError::UrlParse {
            context: "Failed to parse gateway url",
            source,
        })?;
        Ok(Self::new(url))
    }
}

#[async_trait]
impl TokenizeClient for HttpTokenizeClient {
    async fn exchange(&self, payload: &AuthorizationPayload) -> Result<PaymentNonce, FlowError> {
        Ok(self.tokenize(payload).await?)
    }
}

/// Stand-in used when no gateway URL is configured: every exchange fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredGateway;

#[async_trait]
impl TokenizeClient for UnconfiguredGateway {
    async fn exchange(&self, payload: &AuthorizationPayload) -> Result<PaymentNonce, FlowError> {
        Err(FlowError::network(format!(
            "no tokenization gateway configured for {}",
            payload.flow_type()
        )))
    }
}
