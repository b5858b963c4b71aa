use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace prefix for every pending-request storage key.
pub const STORAGE_NAMESPACE: &str = "payresume.pending";

/// The external-authorization mechanisms sharing the continuation protocol.
///
/// Each flow type owns exactly one pending slot in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    #[serde(rename = "paypal")]
    PayPal,
    SepaDirectDebit,
    Venmo,
    LocalPayment,
    #[serde(rename = "paypal_vault_edit")]
    PayPalVaultEdit,
}

impl FlowType {
    pub const ALL: [FlowType; 5] = [
        FlowType::PayPal,
        FlowType::SepaDirectDebit,
        FlowType::Venmo,
        FlowType::LocalPayment,
        FlowType::PayPalVaultEdit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::PayPal => "paypal",
            FlowType::SepaDirectDebit => "sepa_direct_debit",
            FlowType::Venmo => "venmo",
            FlowType::LocalPayment => "local_payment",
            FlowType::PayPalVaultEdit => "paypal_vault_edit",
        }
    }

    /// The key under which this flow's pending record is persisted.
    pub fn storage_key(&self) -> String {
        format!("{STORAGE_NAMESPACE}.{}", self.as_str())
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown flow type: {0}")]
pub struct UnknownFlowType(pub String);

impl FromStr for FlowType {
    type Err = UnknownFlowType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        FlowType::ALL
            .into_iter()
            .find(|flow| flow.as_str() == normalized)
            .ok_or_else(|| UnknownFlowType(s.to_string()))
    }
}
