use super::{
    BuildContext, FlowAdapter, RedirectState, launch_request, params_mismatch, ready,
    require_amount, require_currency,
};
use crate::domain::configuration::{MerchantConfiguration, PayPalConfiguration};
use crate::domain::flow::FlowType;
use crate::domain::outcome::{AuthorizationPayload, PaymentNonce, ReturnEvent};
use crate::domain::request::{
    AuthParams, LaunchRequest, LaunchTarget, PayPalIntent, PayPalParams, PaymentAuthRequest,
};
use crate::error::FlowError;
use serde::{Deserialize, Serialize};

const ROUTE: &str = "onetouch/v1";

/// PayPal checkout and billing-agreement approval in the browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayPalAdapter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PayPalState {
    intent: PayPalIntent,
    vault: bool,
    #[serde(default)]
    merchant_account_id: Option<String>,
}

impl PayPalAdapter {
    fn launch(
        &self,
        params: &PayPalParams,
        paypal: &PayPalConfiguration,
        ctx: &BuildContext<'_>,
    ) -> Result<LaunchRequest, FlowError> {
        let charge = if params.vault {
            None
        } else {
            Some((
                require_amount(params.amount)?,
                require_currency(params.currency.as_deref())?,
            ))
        };

        let state = RedirectState::new(
            ctx,
            ROUTE,
            false,
            PayPalState {
                intent: params.intent,
                vault: params.vault,
                merchant_account_id: params.merchant_account_id.clone(),
            },
        )?;

        let mut url = paypal.approval_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &paypal.client_id)
                .append_pair("return_url", state.with_state(&state.success_url).as_str())
                .append_pair("cancel_url", state.with_state(&state.cancel_url).as_str());
            match &charge {
                Some((amount, currency)) => {
                    query
                        .append_pair("flow", "checkout")
                        .append_pair("intent", params.intent.as_str())
                        .append_pair("amount", &amount.to_string())
                        .append_pair("currency_code", currency);
                }
                None => {
                    query.append_pair("flow", "vault");
                    if let Some(description) = &params.billing_agreement_description {
                        query.append_pair("description", description);
                    }
                }
            }
            if let Some(merchant_account_id) = &params.merchant_account_id {
                query.append_pair("merchant_account_id", merchant_account_id);
            }
            if let Some(address) = &params.shipping_address {
                query.extend_pairs(address.query_pairs("shipping"));
            }
        }

        launch_request(
            FlowType::PayPal,
            LaunchTarget::Browser { url },
            ctx,
            &state,
        )
    }
}

impl FlowAdapter for PayPalAdapter {
    fn flow_type(&self) -> FlowType {
        FlowType::PayPal
    }

    fn build(
        &self,
        params: &AuthParams,
        config: &MerchantConfiguration,
        ctx: &BuildContext<'_>,
    ) -> PaymentAuthRequest {
        let AuthParams::PayPal(params) = params else {
            return params_mismatch(FlowType::PayPal, params);
        };
        let Some(paypal) = config.paypal.as_ref() else {
            return PaymentAuthRequest::Failure(FlowError::configuration(
                "merchant is not enabled for PayPal",
            ));
        };
        if let Some(nonce) = params.vaulted_nonce.as_deref().filter(|n| !n.is_empty()) {
            return PaymentAuthRequest::LaunchNotRequired(
                PaymentNonce::new(nonce).with_description("vaulted PayPal account"),
            );
        }
        ready(self.launch(params, paypal, ctx))
    }

    fn parse_success(
        &self,
        payload: &str,
        event: &ReturnEvent,
    ) -> Result<AuthorizationPayload, FlowError> {
        let state = RedirectState::<PayPalState>::decode(payload)?;
        let vendor = state.vendor;

        let payment_token = if vendor.vault {
            event.param("ba_token").or_else(|| event.param("token"))
        } else {
            event.param("token")
        }
        .ok_or_else(|| FlowError::malformed("PayPal return is missing the payment token"))?;

        let payer_id = event.param("PayerID");
        if !vendor.vault && payer_id.is_none() {
            return Err(FlowError::malformed("PayPal return is missing PayerID"));
        }

        Ok(AuthorizationPayload::PayPal {
            payment_token,
            payer_id,
            intent: vendor.intent,
            vault: vendor.vault,
            merchant_account_id: vendor.merchant_account_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::token::CorrelationToken;
    use crate::flows::ReturnRoute;
    use rust_decimal_macros::dec;
    use url::Url;

    fn checkout() -> AuthParams {
        AuthParams::PayPal(PayPalParams {
            amount: Some(dec!(25.00)),
            currency: Some("usd".into()),
            intent: PayPalIntent::Sale,
            ..Default::default()
        })
    }

    fn launched(params: &AuthParams) -> LaunchRequest {
        let token = CorrelationToken::from("tok-pp");
        let ctx = BuildContext {
            token: &token,
            return_scheme: "com.example.app",
        };
        match PayPalAdapter.build(params, &MerchantConfiguration::sandbox(), &ctx) {
            PaymentAuthRequest::ReadyToLaunch(request) => request,
            other => panic!("expected ReadyToLaunch, got {other:?}"),
        }
    }

    fn query(url: &Url, name: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_build_checkout_url() {
        let request = launched(&checkout());
        let url = request.target.url();

        assert!(matches!(request.target, LaunchTarget::Browser { .. }));
        assert_eq!(request.return_scheme, "com.example.app");
        assert_eq!(query(url, "flow").as_deref(), Some("checkout"));
        assert_eq!(query(url, "intent").as_deref(), Some("sale"));
        assert_eq!(query(url, "amount").as_deref(), Some("25.00"));
        assert_eq!(query(url, "currency_code").as_deref(), Some("USD"));
        assert_eq!(
            query(url, "return_url").as_deref(),
            Some("com.example.app://onetouch/v1/success?state=tok-pp")
        );
    }

    #[test]
    fn test_build_requires_amount_outside_vault() {
        let token = CorrelationToken::mint();
        let ctx = BuildContext {
            token: &token,
            return_scheme: "com.example.app",
        };
        let params = AuthParams::PayPal(PayPalParams::default());
        let result = PayPalAdapter.build(&params, &MerchantConfiguration::sandbox(), &ctx);
        assert!(matches!(
            result,
            PaymentAuthRequest::Failure(FlowError::LaunchParamsInvalid { .. })
        ));

        let vault = AuthParams::PayPal(PayPalParams {
            vault: true,
            ..Default::default()
        });
        let request = launched(&vault);
        assert_eq!(query(request.target.url(), "flow").as_deref(), Some("vault"));
    }

    #[test]
    fn test_build_disabled_merchant() {
        let token = CorrelationToken::mint();
        let ctx = BuildContext {
            token: &token,
            return_scheme: "com.example.app",
        };
        let result = PayPalAdapter.build(&checkout(), &MerchantConfiguration::default(), &ctx);
        assert!(matches!(
            result,
            PaymentAuthRequest::Failure(FlowError::ConfigurationInvalid { .. })
        ));
    }

    #[test]
    fn test_vaulted_nonce_skips_launch() {
        let token = CorrelationToken::mint();
        let ctx = BuildContext {
            token: &token,
            return_scheme: "com.example.app",
        };
        let params = AuthParams::PayPal(PayPalParams {
            vaulted_nonce: Some("fake-paypal-nonce".into()),
            ..Default::default()
        });
        let result = PayPalAdapter.build(&params, &MerchantConfiguration::sandbox(), &ctx);
        assert_eq!(
            result,
            PaymentAuthRequest::LaunchNotRequired(
                PaymentNonce::new("fake-paypal-nonce").with_description("vaulted PayPal account")
            )
        );
    }

    #[test]
    fn test_parse_success() {
        let request = launched(&checkout());
        let uri = Url::parse(
            "com.example.app://onetouch/v1/success?state=tok-pp&token=EC-123&PayerID=PAYER",
        )
        .unwrap();
        let event = ReturnEvent::from_uri(uri);

        assert_eq!(
            PayPalAdapter.correlate(&request.correlation_payload, &event),
            Ok(ReturnRoute::Success)
        );
        let payload = PayPalAdapter
            .parse_success(&request.correlation_payload, &event)
            .unwrap();
        assert_eq!(
            payload,
            AuthorizationPayload::PayPal {
                payment_token: "EC-123".into(),
                payer_id: Some("PAYER".into()),
                intent: PayPalIntent::Sale,
                vault: false,
                merchant_account_id: None,
            }
        );
    }

    #[test]
    fn test_parse_success_missing_payer() {
        let request = launched(&checkout());
        let uri =
            Url::parse("com.example.app://onetouch/v1/success?state=tok-pp&token=EC-123").unwrap();
        let err = PayPalAdapter
            .parse_success(&request.correlation_payload, &ReturnEvent::from_uri(uri))
            .unwrap_err();
        assert_eq!(err.code(), "malformed_return_payload");
    }
}
