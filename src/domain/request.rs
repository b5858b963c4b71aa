use super::flow::FlowType;
use super::outcome::PaymentNonce;
use crate::error::FlowError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostalAddress {
    pub recipient_name: Option<String>,
    pub street_address: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
}

impl PostalAddress {
    /// Non-empty fields as `(name, value)` pairs, prefixed for use as query parameters.
    pub fn query_pairs(&self, prefix: &str) -> Vec<(String, String)> {
        [
            ("recipient_name", &self.recipient_name),
            ("street_address", &self.street_address),
            ("locality", &self.locality),
            ("region", &self.region),
            ("postal_code", &self.postal_code),
            ("country_code", &self.country_code),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (format!("{prefix}_{name}"), v.to_string()))
        })
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayPalIntent {
    #[default]
    Authorize,
    Sale,
    Order,
}

impl PayPalIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayPalIntent::Authorize => "authorize",
            PayPalIntent::Sale => "sale",
            PayPalIntent::Order => "order",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PayPalParams {
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub intent: PayPalIntent,
    /// Billing-agreement (vault) mode; no amount is charged.
    pub vault: bool,
    pub billing_agreement_description: Option<String>,
    pub shipping_address: Option<PostalAddress>,
    pub merchant_account_id: Option<String>,
    /// A previously vaulted PayPal account; short-circuits the hand-off.
    pub vaulted_nonce: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MandateType {
    #[default]
    OneOff,
    Recurrent,
}

impl MandateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MandateType::OneOff => "ONE_OFF",
            MandateType::Recurrent => "RECURRENT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SepaParams {
    pub account_holder_name: String,
    pub customer_id: String,
    pub iban: String,
    pub mandate_type: MandateType,
    pub billing_address: Option<PostalAddress>,
    pub merchant_account_id: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenmoUsage {
    #[default]
    SingleUse,
    MultiUse,
}

impl VenmoUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenmoUsage::SingleUse => "SINGLE_USE",
            VenmoUsage::MultiUse => "MULTI_USE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VenmoParams {
    pub usage: VenmoUsage,
    pub amount: Option<Decimal>,
    pub display_name: Option<String>,
    pub collect_shipping_address: bool,
    pub collect_billing_address: bool,
    /// A previously vaulted Venmo account; short-circuits the app switch.
    pub vaulted_nonce: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalPaymentParams {
    /// Local method identifier, e.g. `ideal`.
    pub payment_type: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub country_code: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub merchant_account_id: Option<String>,
    pub shipping_address: Option<PostalAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultEditParams {
    pub edit_paypal_vault_id: String,
    pub risk_correlation_id: Option<String>,
}

/// Caller-supplied parameters, one variant per flow type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum AuthParams {
    #[serde(rename = "paypal")]
    PayPal(PayPalParams),
    SepaDirectDebit(SepaParams),
    Venmo(VenmoParams),
    LocalPayment(LocalPaymentParams),
    #[serde(rename = "paypal_vault_edit")]
    PayPalVaultEdit(VaultEditParams),
}

impl AuthParams {
    pub fn flow_type(&self) -> FlowType {
        match self {
            AuthParams::PayPal(_) => FlowType::PayPal,
            AuthParams::SepaDirectDebit(_) => FlowType::SepaDirectDebit,
            AuthParams::Venmo(_) => FlowType::Venmo,
            AuthParams::LocalPayment(_) => FlowType::LocalPayment,
            AuthParams::PayPalVaultEdit(_) => FlowType::PayPalVaultEdit,
        }
    }
}

/// Where the external agent is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LaunchTarget {
    Browser { url: Url },
    App { package: String, url: Url },
}

impl LaunchTarget {
    pub fn url(&self) -> &Url {
        match self {
            LaunchTarget::Browser { url } | LaunchTarget::App { url, .. } => url,
        }
    }
}

/// A request ready to be handed to the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub flow_type: FlowType,
    pub target: LaunchTarget,
    /// The URL scheme the agent returns control through.
    pub return_scheme: String,
    /// Opaque adapter state persisted with the pending request.
    pub correlation_payload: String,
}

/// Result of building an authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentAuthRequest {
    ReadyToLaunch(LaunchRequest),
    LaunchNotRequired(PaymentNonce),
    Failure(FlowError),
}
