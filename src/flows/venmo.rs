use super::{BuildContext, FlowAdapter, RedirectState, launch_request, params_mismatch, ready};
use crate::domain::configuration::{MerchantConfiguration, VenmoConfiguration};
use crate::domain::flow::FlowType;
use crate::domain::outcome::{AuthorizationPayload, PaymentNonce, ReturnEvent};
use crate::domain::request::{
    AuthParams, LaunchRequest, LaunchTarget, PaymentAuthRequest, VenmoParams, VenmoUsage,
};
use crate::error::FlowError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const ROUTE: &str = "x-callback-url/vzero/auth/venmo";

/// App switch to the Venmo companion app using x-callback URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct VenmoAdapter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct VenmoState {
    profile_id: String,
    usage: VenmoUsage,
}

impl VenmoAdapter {
    fn launch(
        &self,
        params: &VenmoParams,
        venmo: &VenmoConfiguration,
        merchant_id: &str,
        ctx: &BuildContext<'_>,
    ) -> Result<LaunchRequest, FlowError> {
        if let Some(amount) = params.amount
            && amount <= Decimal::ZERO
        {
            return Err(FlowError::launch_params("amount must be positive"));
        }

        let state = RedirectState::new(
            ctx,
            ROUTE,
            true,
            VenmoState {
                profile_id: venmo.profile_id.clone(),
                usage: params.usage,
            },
        )?;
        let error_url = state
            .error_url
            .as_ref()
            .map(|url| state.with_state(url))
            .ok_or_else(|| FlowError::Internal {
                message: "Venmo state without error callback".to_string(),
            })?;

        let mut url = venmo.app_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("x-success", state.with_state(&state.success_url).as_str())
                .append_pair("x-cancel", state.with_state(&state.cancel_url).as_str())
                .append_pair("x-error", error_url.as_str())
                .append_pair("braintree_merchant_id", merchant_id)
                .append_pair("braintree_access_token", &venmo.access_token)
                .append_pair("braintree_environment", &venmo.environment)
                .append_pair("profile_id", &venmo.profile_id)
                .append_pair("payment_method_usage", params.usage.as_str());
            if let Some(amount) = params.amount {
                query.append_pair("amount", &amount.to_string());
            }
            if let Some(display_name) = &params.display_name {
                query.append_pair("display_name", display_name);
            }
            if params.collect_shipping_address {
                query.append_pair("collect_shipping_address", "true");
            }
            if params.collect_billing_address {
                query.append_pair("collect_billing_address", "true");
            }
        }

        launch_request(
            FlowType::Venmo,
            LaunchTarget::App {
                package: venmo.app_package.clone(),
                url,
            },
            ctx,
            &state,
        )
    }
}

impl FlowAdapter for VenmoAdapter {
    fn flow_type(&self) -> FlowType {
        FlowType::Venmo
    }

    fn build(
        &self,
        params: &AuthParams,
        config: &MerchantConfiguration,
        ctx: &BuildContext<'_>,
    ) -> PaymentAuthRequest {
        let AuthParams::Venmo(params) = params else {
            return params_mismatch(FlowType::Venmo, params);
        };
        let Some(venmo) = config.venmo.as_ref() else {
            return PaymentAuthRequest::Failure(FlowError::configuration(
                "merchant is not enabled for Venmo",
            ));
        };
        if let Some(nonce) = params.vaulted_nonce.as_deref().filter(|n| !n.is_empty()) {
            return PaymentAuthRequest::LaunchNotRequired(
                PaymentNonce::new(nonce).with_description("vaulted Venmo account"),
            );
        }
        ready(self.launch(params, venmo, &config.merchant_id, ctx))
    }

    fn parse_success(
        &self,
        payload: &str,
        event: &ReturnEvent,
    ) -> Result<AuthorizationPayload, FlowError> {
        let vendor = RedirectState::<VenmoState>::decode(payload)?.vendor;
        let resource_id = event.param("resource_id");
        let payment_method_nonce = event.param("payment_method_nonce");
        if resource_id.is_none() && payment_method_nonce.is_none() {
            return Err(FlowError::malformed(
                "Venmo return carries neither resource_id nor payment_method_nonce",
            ));
        }

        Ok(AuthorizationPayload::Venmo {
            resource_id,
            payment_method_nonce,
            username: event.param("username"),
            usage: vendor.usage,
        })
    }
}
