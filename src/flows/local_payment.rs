use super::{
    BuildContext, FlowAdapter, RedirectState, launch_request, params_mismatch, ready,
    require_amount, require_currency, require_text,
};
use crate::domain::configuration::{LocalPaymentConfiguration, MerchantConfiguration};
use crate::domain::flow::FlowType;
use crate::domain::outcome::{AuthorizationPayload, ReturnEvent};
use crate::domain::request::{
    AuthParams, LaunchRequest, LaunchTarget, LocalPaymentParams, PaymentAuthRequest,
};
use crate::error::FlowError;
use serde::{Deserialize, Serialize};

const ROUTE: &str = "local-payment";

/// Bank-redirect local payment methods such as iDEAL.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPaymentAdapter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LocalPaymentState {
    payment_type: String,
    #[serde(default)]
    merchant_account_id: Option<String>,
}

impl LocalPaymentAdapter {
    fn launch(
        &self,
        params: &LocalPaymentParams,
        local: &LocalPaymentConfiguration,
        ctx: &BuildContext<'_>,
    ) -> Result<LaunchRequest, FlowError> {
        let payment_type = require_text("payment_type", Some(&params.payment_type))?
            .to_ascii_lowercase();
        if !local.payment_types.iter().any(|t| t == &payment_type) {
            return Err(FlowError::configuration(format!(
                "merchant is not enabled for local payment type {payment_type:?}"
            )));
        }
        let amount = require_amount(params.amount)?;
        let currency = require_currency(params.currency.as_deref())?;

        let state = RedirectState::new(
            ctx,
            ROUTE,
            false,
            LocalPaymentState {
                payment_type: payment_type.clone(),
                merchant_account_id: params.merchant_account_id.clone(),
            },
        )?;

        let mut url = local.redirect_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("payment_type", &payment_type)
                .append_pair("amount", &amount.to_string())
                .append_pair("currency_code", &currency)
                .append_pair("return_url", state.with_state(&state.success_url).as_str())
                .append_pair("cancel_url", state.with_state(&state.cancel_url).as_str());
            for (name, value) in [
                ("country_code", &params.country_code),
                ("given_name", &params.given_name),
                ("surname", &params.surname),
                ("email", &params.email),
                ("merchant_account_id", &params.merchant_account_id),
            ] {
                if let Some(value) = value {
                    query.append_pair(name, value);
                }
            }
            if let Some(address) = &params.shipping_address {
                query.extend_pairs(address.query_pairs("shipping"));
            }
        }

        launch_request(
            FlowType::LocalPayment,
            LaunchTarget::Browser { url },
            ctx,
            &state,
        )
    }
}

impl FlowAdapter for LocalPaymentAdapter {
    fn flow_type(&self) -> FlowType {
        FlowType::LocalPayment
    }

    fn build(
        &self,
        params: &AuthParams,
        config: &MerchantConfiguration,
        ctx: &BuildContext<'_>,
    ) -> PaymentAuthRequest {
        let AuthParams::LocalPayment(params) = params else {
            return params_mismatch(FlowType::LocalPayment, params);
        };
        match config.local_payment.as_ref() {
            Some(local) => ready(self.launch(params, local, ctx)),
            None => PaymentAuthRequest::Failure(FlowError::configuration(
                "merchant is not enabled for local payments",
            )),
        }
    }

    fn parse_success(
        &self,
        payload: &str,
        event: &ReturnEvent,
    ) -> Result<AuthorizationPayload, FlowError> {
        let vendor = RedirectState::<LocalPaymentState>::decode(payload)?.vendor;
        let payment_token = event
            .param("paymentToken")
            .ok_or_else(|| FlowError::malformed("local payment return is missing paymentToken"))?;

        Ok(AuthorizationPayload::LocalPayment {
            payment_type: vendor.payment_type,
            payment_token,
            payer_id: event.param("PayerID"),
            merchant_account_id: vendor.merchant_account_id,
        })
    }
}
