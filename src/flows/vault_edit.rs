use super::{
    BuildContext, FlowAdapter, RedirectState, launch_request, params_mismatch, ready, require_text,
};
use crate::domain::configuration::MerchantConfiguration;
use crate::domain::flow::FlowType;
use crate::domain::outcome::{AuthorizationPayload, ReturnEvent};
use crate::domain::request::{
    AuthParams, LaunchRequest, LaunchTarget, PaymentAuthRequest, VaultEditParams,
};
use crate::error::FlowError;
use serde::{Deserialize, Serialize};
use url::Url;

const ROUTE: &str = "vault-edit";

/// Editing the funding instrument behind a vaulted PayPal account.
#[derive(Debug, Clone, Copy, Default)]
pub struct VaultEditAdapter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct VaultEditState {
    edit_paypal_vault_id: String,
    #[serde(default)]
    risk_correlation_id: Option<String>,
}

impl VaultEditAdapter {
    fn launch(
        &self,
        params: &VaultEditParams,
        edit_url: &Url,
        ctx: &BuildContext<'_>,
    ) -> Result<LaunchRequest, FlowError> {
        let vault_id = require_text("edit_paypal_vault_id", Some(&params.edit_paypal_vault_id))?;
        let state = RedirectState::new(
            ctx,
            ROUTE,
            false,
            VaultEditState {
                edit_paypal_vault_id: vault_id.clone(),
                risk_correlation_id: params.risk_correlation_id.clone(),
            },
        )?;

        let mut url = edit_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("edit_paypal_vault_id", &vault_id)
                .append_pair("return_url", state.with_state(&state.success_url).as_str())
                .append_pair("cancel_url", state.with_state(&state.cancel_url).as_str());
            if let Some(risk) = &params.risk_correlation_id {
                query.append_pair("risk_correlation_id", risk);
            }
        }

        launch_request(
            FlowType::PayPalVaultEdit,
            LaunchTarget::Browser { url },
            ctx,
            &state,
        )
    }
}

impl FlowAdapter for VaultEditAdapter {
    fn flow_type(&self) -> FlowType {
        FlowType::PayPalVaultEdit
    }

    fn build(
        &self,
        params: &AuthParams,
        config: &MerchantConfiguration,
        ctx: &BuildContext<'_>,
    ) -> PaymentAuthRequest {
        let AuthParams::PayPalVaultEdit(params) = params else {
            return params_mismatch(FlowType::PayPalVaultEdit, params);
        };
        match config
            .paypal
            .as_ref()
            .and_then(|paypal| paypal.vault_edit_url.as_ref())
        {
            Some(edit_url) => ready(self.launch(params, edit_url, ctx)),
            None => PaymentAuthRequest::Failure(FlowError::configuration(
                "merchant is not enabled for PayPal vault edit",
            )),
        }
    }

    fn parse_success(
        &self,
        payload: &str,
        event: &ReturnEvent,
    ) -> Result<AuthorizationPayload, FlowError> {
        let vendor = RedirectState::<VaultEditState>::decode(payload)?.vendor;
        Ok(AuthorizationPayload::PayPalVaultEdit {
            edit_paypal_vault_id: vendor.edit_paypal_vault_id,
            risk_correlation_id: vendor.risk_correlation_id,
            billing_agreement_token: event.param("ba_token"),
        })
    }
}
