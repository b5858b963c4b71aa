use super::configuration::MerchantConfiguration;
use super::flow::FlowType;
use super::outcome::{AuthorizationPayload, PaymentNonce};
use super::pending::PendingRequest;
use super::request::LaunchTarget;
use crate::error::{FlowError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Durable slot-per-flow-type storage for pending requests.
///
/// Every operation is atomic with respect to a single flow type's slot. Slots of different
/// flow types never interact.
#[async_trait]
pub trait PendingRequestStore: Send + Sync {
    /// Writes the record, replacing any unread record for the same flow type.
    async fn put(&self, request: PendingRequest) -> Result<()>;
    async fn get(&self, flow_type: FlowType) -> Result<Option<PendingRequest>>;
    async fn clear(&self, flow_type: FlowType) -> Result<()>;
    /// Reads and clears the slot in one step; at most one caller observes a given record.
    async fn take(&self, flow_type: FlowType) -> Result<Option<PendingRequest>>;
    /// Clears the slot only if it still holds exactly `request`. Returns whether it did.
    async fn discard(&self, request: &PendingRequest) -> Result<bool>;
}

/// Something that can take control away from the host: a browser, a companion app.
#[async_trait]
pub trait ExternalAgent: Send + Sync {
    /// Human-readable name used in errors and logs.
    fn name(&self) -> &str;
    fn is_available(&self, target: &LaunchTarget) -> bool;
    /// Gives the agent control. Called only after the pending request is persisted.
    async fn hand_off(&self, target: &LaunchTarget) -> std::result::Result<(), FlowError>;
}

/// Provides the merchant configuration, possibly after it has been fetched.
#[async_trait]
pub trait ConfigurationSource: Send + Sync {
    async fn configuration(&self) -> std::result::Result<Arc<MerchantConfiguration>, FlowError>;
}

/// The network collaborator that trades an authorization for a nonce.
#[async_trait]
pub trait TokenizeClient: Send + Sync {
    async fn exchange(
        &self,
        payload: &AuthorizationPayload,
    ) -> std::result::Result<PaymentNonce, FlowError>;
}

pub type PendingRequestStoreRef = Arc<dyn PendingRequestStore>;
pub type ExternalAgentBox = Box<dyn ExternalAgent>;
pub type ConfigurationSourceBox = Box<dyn ConfigurationSource>;
pub type TokenizeClientBox = Box<dyn TokenizeClient>;
