use serde::{Deserialize, Serialize};
use url::Url;

/// Merchant configuration as resolved by the configuration source.
///
/// A `None` section means the merchant is not enabled for that flow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantConfiguration {
    pub merchant_id: String,
    pub paypal: Option<PayPalConfiguration>,
    pub sepa_direct_debit: Option<SepaConfiguration>,
    pub venmo: Option<VenmoConfiguration>,
    pub local_payment: Option<LocalPaymentConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPalConfiguration {
    pub client_id: String,
    pub approval_url: Url,
    /// Present when the merchant may edit vaulted PayPal accounts.
    #[serde(default)]
    pub vault_edit_url: Option<Url>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SepaConfiguration {
    pub mandate_url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenmoConfiguration {
    pub app_url: Url,
    pub app_package: String,
    pub profile_id: String,
    pub access_token: String,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPaymentConfiguration {
    pub redirect_url: Url,
    /// Enabled local methods, e.g. `ideal`, `bancontact`.
    pub payment_types: Vec<String>,
}

impl MerchantConfiguration {
    /// Every flow enabled against sandbox endpoints.
    pub fn sandbox() -> Self {
        Self {
            merchant_id: "sandbox_merchant".to_string(),
            paypal: Some(PayPalConfiguration {
                client_id: "sandbox_client".to_string(),
                approval_url: sandbox_url("https://www.sandbox.paypal.com/checkoutnow"),
                vault_edit_url: Some(sandbox_url(
                    "https://www.sandbox.paypal.com/vault/edit",
                )),
            }),
            sepa_direct_debit: Some(SepaConfiguration {
                mandate_url: sandbox_url("https://api.sandbox.braintreegateway.com/sepa/mandate"),
            }),
            venmo: Some(VenmoConfiguration {
                app_url: sandbox_url("venmo://x-callback-url/vzero/auth"),
                app_package: "com.venmo".to_string(),
                profile_id: "sandbox_profile".to_string(),
                access_token: "sandbox_access_token".to_string(),
                environment: "sandbox".to_string(),
            }),
            local_payment: Some(LocalPaymentConfiguration {
                redirect_url: sandbox_url("https://www.sandbox.paypal.com/local-payment/redirect"),
                payment_types: vec![
                    "ideal".to_string(),
                    "bancontact".to_string(),
                    "sofort".to_string(),
                ],
            }),
        }
    }
}

fn sandbox_url(raw: &'static str) -> Url {
    Url::parse(raw).expect("sandbox endpoint literals are valid URLs")
}
