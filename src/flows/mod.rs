//! Per-flow adapters.
//!
//! Each adapter knows how to turn caller parameters into a launch target for its vendor, what
//! state it needs back on resumption, and how to read the vendor's return. The correlation
//! payload every adapter persists is a [`RedirectState`]: the minted token, the exact return
//! URLs registered with the agent, and adapter-specific fields.

pub mod local_payment;
pub mod paypal;
pub mod sepa;
pub mod vault_edit;
pub mod venmo;

use crate::domain::configuration::MerchantConfiguration;
use crate::domain::flow::FlowType;
use crate::domain::outcome::{AuthorizationPayload, ReturnEvent};
use crate::domain::request::{AuthParams, LaunchRequest, LaunchTarget, PaymentAuthRequest};
use crate::domain::token::CorrelationToken;
use crate::error::FlowError;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Query parameter carrying the correlation token on every return URL.
pub const STATE_PARAM: &str = "state";
/// Extras key naming the outcome of a URI-less (structured) return.
pub const OUTCOME_EXTRA: &str = "outcome";

/// Inputs shared by every adapter when building a request.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub token: &'a CorrelationToken,
    pub return_scheme: &'a str,
}

/// Which return route the agent used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnRoute {
    Success,
    Cancel,
    Error(String),
}

pub trait FlowAdapter: Send + Sync {
    fn flow_type(&self) -> FlowType;

    fn build(
        &self,
        params: &AuthParams,
        config: &MerchantConfiguration,
        ctx: &BuildContext<'_>,
    ) -> PaymentAuthRequest;

    /// Checks the return against the persisted payload and classifies it.
    ///
    /// Fails with [`FlowError::ReturnMismatch`] when the event was not produced by the attempt
    /// that persisted `payload`.
    fn correlate(&self, payload: &str, event: &ReturnEvent) -> Result<ReturnRoute, FlowError> {
        RedirectState::<serde_json::Map<String, serde_json::Value>>::decode(payload)?.route(event)
    }

    /// Extracts the vendor success payload from an already-correlated return.
    fn parse_success(
        &self,
        payload: &str,
        event: &ReturnEvent,
    ) -> Result<AuthorizationPayload, FlowError>;
}

/// Registry of adapters, one per flow type.
pub struct FlowAdapters {
    adapters: HashMap<FlowType, Box<dyn FlowAdapter>>,
}

impl FlowAdapters {
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// All built-in adapters.
    pub fn standard() -> Self {
        let mut adapters = Self::empty();
        adapters
            .register(Box::new(paypal::PayPalAdapter))
            .register(Box::new(sepa::SepaAdapter))
            .register(Box::new(venmo::VenmoAdapter))
            .register(Box::new(local_payment::LocalPaymentAdapter))
            .register(Box::new(vault_edit::VaultEditAdapter));
        adapters
    }

    /// Registers an adapter, replacing any previous one for the same flow type.
    pub fn register(&mut self, adapter: Box<dyn FlowAdapter>) -> &mut Self {
        self.adapters.insert(adapter.flow_type(), adapter);
        self
    }

    pub fn get(&self, flow_type: FlowType) -> Option<&dyn FlowAdapter> {
        self.adapters.get(&flow_type).map(|adapter| adapter.as_ref())
    }
}

impl Default for FlowAdapters {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for FlowAdapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut flows: Vec<_> = self.adapters.keys().collect();
        flows.sort();
        f.debug_struct("FlowAdapters").field("flows", &flows).finish()
    }
}

/// Correlation payload shared by all adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectState<V> {
    pub token: CorrelationToken,
    pub success_url: Url,
    pub cancel_url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_url: Option<Url>,
    #[serde(flatten)]
    pub vendor: V,
}

impl<V: Serialize + DeserializeOwned> RedirectState<V> {
    /// Registers `<scheme>://<route>/success` and `/cancel` (and `/error` when the agent
    /// supports an error callback).
    pub fn new(
        ctx: &BuildContext<'_>,
        route: &str,
        with_error_url: bool,
        vendor: V,
    ) -> Result<Self, FlowError> {
        let url = |outcome: &str| {
            Url::parse(&format!("{}://{route}/{outcome}", ctx.return_scheme)).map_err(|e| {
                FlowError::configuration(format!(
                    "return scheme {:?} is not usable: {e}",
                    ctx.return_scheme
                ))
            })
        };
        Ok(Self {
            token: ctx.token.clone(),
            success_url: url("success")?,
            cancel_url: url("cancel")?,
            error_url: if with_error_url {
                Some(url("error")?)
            } else {
                None
            },
            vendor,
        })
    }

    pub fn decode(payload: &str) -> Result<Self, FlowError> {
        serde_json::from_str(payload).map_err(|e| FlowError::Internal {
            message: format!("corrupt correlation payload: {e}"),
        })
    }

    pub fn encode(&self) -> Result<String, FlowError> {
        serde_json::to_string(self).map_err(|e| FlowError::Internal {
            message: format!("cannot encode correlation payload: {e}"),
        })
    }

    /// A registered return URL with the correlation token attached.
    pub fn with_state(&self, url: &Url) -> Url {
        let mut url = url.clone();
        url.query_pairs_mut()
            .append_pair(STATE_PARAM, self.token.as_str());
        url
    }

    pub fn route(&self, event: &ReturnEvent) -> Result<ReturnRoute, FlowError> {
        if event.is_dismissal() {
            return Ok(ReturnRoute::Cancel);
        }

        let state = event.param(STATE_PARAM).ok_or(FlowError::ReturnMismatch)?;
        if !self.token.matches(&state) {
            return Err(FlowError::ReturnMismatch);
        }

        let error_route = || ReturnRoute::Error(error_message(event));
        match event.target() {
            Some(target) if target == self.success_url => Ok(ReturnRoute::Success),
            Some(target) if target == self.cancel_url => Ok(ReturnRoute::Cancel),
            Some(target) if self.error_url.as_ref() == Some(&target) => Ok(error_route()),
            Some(_) => Err(FlowError::ReturnMismatch),
            None => match event.extras.get(OUTCOME_EXTRA).map(String::as_str) {
                Some("success") => Ok(ReturnRoute::Success),
                Some("cancel") => Ok(ReturnRoute::Cancel),
                Some("error") => Ok(error_route()),
                Some(other) => Err(FlowError::malformed(format!("unknown outcome {other:?}"))),
                None => Err(FlowError::malformed("structured return without an outcome")),
            },
        }
    }
}

fn error_message(event: &ReturnEvent) -> String {
    event
        .param("errorMessage")
        .or_else(|| event.param("error"))
        .unwrap_or_else(|| "unknown error".to_string())
}

/// Wraps a fallible launch-request construction into the builder's tagged result.
pub(crate) fn ready(result: Result<LaunchRequest, FlowError>) -> PaymentAuthRequest {
    match result {
        Ok(request) => PaymentAuthRequest::ReadyToLaunch(request),
        Err(err) => PaymentAuthRequest::Failure(err),
    }
}

pub(crate) fn launch_request<V: Serialize + DeserializeOwned>(
    flow_type: FlowType,
    target: LaunchTarget,
    ctx: &BuildContext<'_>,
    state: &RedirectState<V>,
) -> Result<LaunchRequest, FlowError> {
    Ok(LaunchRequest {
        flow_type,
        target,
        return_scheme: ctx.return_scheme.to_string(),
        correlation_payload: state.encode()?,
    })
}

pub(crate) fn params_mismatch(expected: FlowType, params: &AuthParams) -> PaymentAuthRequest {
    PaymentAuthRequest::Failure(FlowError::launch_params(format!(
        "{} parameters supplied to the {expected} flow",
        params.flow_type()
    )))
}

pub(crate) fn require_text(field: &str, value: Option<&str>) -> Result<String, FlowError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FlowError::launch_params(format!("{field} is required")))
}

pub(crate) fn require_amount(amount: Option<Decimal>) -> Result<Decimal, FlowError> {
    match amount {
        Some(amount) if amount > Decimal::ZERO => Ok(amount),
        Some(_) => Err(FlowError::launch_params("amount must be positive")),
        None => Err(FlowError::launch_params("amount is required")),
    }
}

pub(crate) fn require_currency(currency: Option<&str>) -> Result<String, FlowError> {
    let currency = require_text("currency", currency)?;
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(currency.to_ascii_uppercase())
    } else {
        Err(FlowError::launch_params(format!(
            "currency {currency:?} is not an ISO 4217 code"
        )))
    }
}
