use super::flow::FlowType;
use super::request::{MandateType, PayPalIntent, VenmoUsage};
use crate::error::FlowError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Whatever the host delivers when it regains control: a deep-link URI, structured extras,
/// or both. An event carrying neither means the agent was dismissed without returning.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReturnEvent {
    pub uri: Option<Url>,
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
}

impl ReturnEvent {
    pub fn from_uri(uri: Url) -> Self {
        Self {
            uri: Some(uri),
            extras: BTreeMap::new(),
        }
    }

    /// The agent closed (or the user navigated back) without a return payload.
    pub fn dismissed() -> Self {
        Self::default()
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn is_dismissal(&self) -> bool {
        self.uri.is_none() && self.extras.is_empty()
    }

    /// Looks a parameter up in the URI query first, then in the extras.
    pub fn param(&self, name: &str) -> Option<String> {
        self.uri
            .as_ref()
            .and_then(|uri| {
                uri.query_pairs()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.into_owned())
            })
            .or_else(|| self.extras.get(name).cloned())
            .filter(|value| !value.is_empty())
    }

    /// The URI without query or fragment, i.e. the return route the agent used.
    pub fn target(&self) -> Option<Url> {
        self.uri.as_ref().map(strip_query)
    }
}

pub(crate) fn strip_query(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// The vendor-specific success payload parsed out of a return event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthorizationPayload {
    #[serde(rename = "paypal")]
    PayPal {
        payment_token: String,
        payer_id: Option<String>,
        intent: PayPalIntent,
        vault: bool,
        merchant_account_id: Option<String>,
    },
    SepaDirectDebit {
        customer_id: String,
        iban_last_four: String,
        mandate_type: MandateType,
        bank_reference_token: String,
        merchant_account_id: Option<String>,
    },
    Venmo {
        resource_id: Option<String>,
        payment_method_nonce: Option<String>,
        username: Option<String>,
        usage: VenmoUsage,
    },
    LocalPayment {
        payment_type: String,
        payment_token: String,
        payer_id: Option<String>,
        merchant_account_id: Option<String>,
    },
    #[serde(rename = "paypal_vault_edit")]
    PayPalVaultEdit {
        edit_paypal_vault_id: String,
        risk_correlation_id: Option<String>,
        billing_agreement_token: Option<String>,
    },
}

impl AuthorizationPayload {
    pub fn flow_type(&self) -> FlowType {
        match self {
            AuthorizationPayload::PayPal { .. } => FlowType::PayPal,
            AuthorizationPayload::SepaDirectDebit { .. } => FlowType::SepaDirectDebit,
            AuthorizationPayload::Venmo { .. } => FlowType::Venmo,
            AuthorizationPayload::LocalPayment { .. } => FlowType::LocalPayment,
            AuthorizationPayload::PayPalVaultEdit { .. } => FlowType::PayPalVaultEdit,
        }
    }

    /// Gateway path (relative to `/v1/`) that exchanges this authorization for a nonce.
    pub fn endpoint(&self) -> &'static str {
        match self {
            AuthorizationPayload::PayPal { .. } => "payment_methods/paypal_accounts",
            AuthorizationPayload::SepaDirectDebit { .. } => "payment_methods/sepa_debit_accounts",
            AuthorizationPayload::Venmo { .. } => "payment_methods/venmo_accounts",
            AuthorizationPayload::LocalPayment { .. } => "payment_methods/local_payment_accounts",
            AuthorizationPayload::PayPalVaultEdit { .. } => "paypal_vault_edit/result",
        }
    }
}

/// Opaque single-use reference to a tokenized payment credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNonce {
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PaymentNonce {
    pub fn new(nonce: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    Success(AuthorizationPayload),
    Failure(FlowError),
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizeResult {
    Success(PaymentNonce),
    Failure(FlowError),
    Cancel,
}

impl TokenizeResult {
    /// Short status label: `success`, `failure` or `cancel`.
    pub fn status(&self) -> &'static str {
        match self {
            TokenizeResult::Success(_) => "success",
            TokenizeResult::Failure(_) => "failure",
            TokenizeResult::Cancel => "cancel",
        }
    }
}
