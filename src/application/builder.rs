use crate::domain::flow::FlowType;
use crate::domain::ports::ConfigurationSourceBox;
use crate::domain::request::{AuthParams, PaymentAuthRequest};
use crate::domain::token::CorrelationToken;
use crate::error::FlowError;
use crate::flows::{BuildContext, FlowAdapters};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns caller parameters into a launchable request for one flow type.
///
/// The builder never touches the store. It waits for the configuration source without blocking
/// a thread, mints a fresh [`CorrelationToken`] per attempt and hands everything vendor-specific
/// to the flow's adapter.
pub struct RequestBuilder {
    adapters: Arc<FlowAdapters>,
    configuration: ConfigurationSourceBox,
    return_scheme: String,
}

impl RequestBuilder {
    pub fn new(
        adapters: Arc<FlowAdapters>,
        configuration: ConfigurationSourceBox,
        return_scheme: impl Into<String>,
    ) -> Self {
        Self {
            adapters,
            configuration,
            return_scheme: return_scheme.into(),
        }
    }

    pub fn return_scheme(&self) -> &str {
        &self.return_scheme
    }

    pub(crate) fn set_adapters(&mut self, adapters: Arc<FlowAdapters>) {
        self.adapters = adapters;
    }

    pub async fn build(&self, flow_type: FlowType, params: &AuthParams) -> PaymentAuthRequest {
        if params.flow_type() != flow_type {
            return PaymentAuthRequest::Failure(FlowError::launch_params(format!(
                "{} parameters supplied to the {flow_type} flow",
                params.flow_type()
            )));
        }
        let Some(adapter) = self.adapters.get(flow_type) else {
            return PaymentAuthRequest::Failure(FlowError::configuration(format!(
                "no adapter registered for {flow_type}"
            )));
        };

        let configuration = match self.configuration.configuration().await {
            Ok(configuration) => configuration,
            Err(err) => {
                warn!(flow = %flow_type, code = err.code(), "configuration unavailable");
                return PaymentAuthRequest::Failure(err);
            }
        };

        let token = CorrelationToken::mint();
        let ctx = BuildContext {
            token: &token,
            return_scheme: &self.return_scheme,
        };
        let request = adapter.build(params, &configuration, &ctx);
        match &request {
            PaymentAuthRequest::ReadyToLaunch(_) => debug!(flow = %flow_type, "request ready"),
            PaymentAuthRequest::LaunchNotRequired(_) => {
                debug!(flow = %flow_type, "launch not required")
            }
            PaymentAuthRequest::Failure(err) => {
                debug!(flow = %flow_type, code = err.code(), "request rejected")
            }
        }
        request
    }
}
