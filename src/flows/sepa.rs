use super::{
    BuildContext, FlowAdapter, RedirectState, launch_request, params_mismatch, ready, require_text,
};
use crate::domain::configuration::{MerchantConfiguration, SepaConfiguration};
use crate::domain::flow::FlowType;
use crate::domain::outcome::{AuthorizationPayload, ReturnEvent};
use crate::domain::request::{
    AuthParams, LaunchRequest, LaunchTarget, MandateType, PaymentAuthRequest, SepaParams,
};
use crate::error::FlowError;
use serde::{Deserialize, Serialize};

const ROUTE: &str = "sepa";

/// SEPA Direct Debit mandate approval in the browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SepaAdapter;

/// Only the last four IBAN characters ever reach the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SepaState {
    customer_id: String,
    iban_last_four: String,
    mandate_type: MandateType,
    #[serde(default)]
    merchant_account_id: Option<String>,
}

fn normalize_iban(raw: &str) -> Result<String, FlowError> {
    let iban: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    if iban.len() < 15 || iban.len() > 34 || !iban.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FlowError::launch_params("iban is not well-formed"));
    }
    Ok(iban)
}

impl SepaAdapter {
    fn launch(
        &self,
        params: &SepaParams,
        sepa: &SepaConfiguration,
        ctx: &BuildContext<'_>,
    ) -> Result<LaunchRequest, FlowError> {
        let account_holder_name =
            require_text("account_holder_name", Some(&params.account_holder_name))?;
        let customer_id = require_text("customer_id", Some(&params.customer_id))?;
        let iban = normalize_iban(&params.iban)?;
        let iban_last_four = iban[iban.len() - 4..].to_string();

        let state = RedirectState::new(
            ctx,
            ROUTE,
            false,
            SepaState {
                customer_id: customer_id.clone(),
                iban_last_four,
                mandate_type: params.mandate_type,
                merchant_account_id: params.merchant_account_id.clone(),
            },
        )?;

        let mut url = sepa.mandate_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("account_holder_name", &account_holder_name)
                .append_pair("customer_id", &customer_id)
                .append_pair("mandate_type", params.mandate_type.as_str())
                .append_pair("return_url", state.with_state(&state.success_url).as_str())
                .append_pair("cancel_url", state.with_state(&state.cancel_url).as_str());
            if let Some(locale) = &params.locale {
                query.append_pair("locale", locale);
            }
            if let Some(merchant_account_id) = &params.merchant_account_id {
                query.append_pair("merchant_account_id", merchant_account_id);
            }
            if let Some(address) = &params.billing_address {
                query.extend_pairs(address.query_pairs("billing"));
            }
        }

        launch_request(
            FlowType::SepaDirectDebit,
            LaunchTarget::Browser { url },
            ctx,
            &state,
        )
    }
}

impl FlowAdapter for SepaAdapter {
    fn flow_type(&self) -> FlowType {
        FlowType::SepaDirectDebit
    }

    fn build(
        &self,
        params: &AuthParams,
        config: &MerchantConfiguration,
        ctx: &BuildContext<'_>,
    ) -> PaymentAuthRequest {
        let AuthParams::SepaDirectDebit(params) = params else {
            return params_mismatch(FlowType::SepaDirectDebit, params);
        };
        match config.sepa_direct_debit.as_ref() {
            Some(sepa) => ready(self.launch(params, sepa, ctx)),
            None => PaymentAuthRequest::Failure(FlowError::configuration(
                "merchant is not enabled for SEPA Direct Debit",
            )),
        }
    }

    fn parse_success(
        &self,
        payload: &str,
        event: &ReturnEvent,
    ) -> Result<AuthorizationPayload, FlowError> {
        let vendor = RedirectState::<SepaState>::decode(payload)?.vendor;
        let bank_reference_token = event.param("bank_reference_token").ok_or_else(|| {
            FlowError::malformed("SEPA return is missing bank_reference_token")
        })?;

        Ok(AuthorizationPayload::SepaDirectDebit {
            customer_id: vendor.customer_id,
            iban_last_four: vendor.iban_last_four,
            mandate_type: vendor.mandate_type,
            bank_reference_token,
            merchant_account_id: vendor.merchant_account_id,
        })
    }
}
