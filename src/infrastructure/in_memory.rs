use crate::domain::flow::FlowType;
use crate::domain::pending::PendingRequest;
use crate::domain::ports::PendingRequestStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory pending request store.
///
/// Uses `Arc<RwLock<HashMap<FlowType, PendingRequest>>>`; `take` and `discard` hold the write
/// lock for the whole read-and-remove. Nothing survives the process, so this backs tests and
/// hosts that never restart mid-flow.
#[derive(Default, Clone)]
pub struct InMemoryPendingStore {
    slots: Arc<RwLock<HashMap<FlowType, PendingRequest>>>,
}

impl InMemoryPendingStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingRequestStore for InMemoryPendingStore {
    async fn put(&self, request: PendingRequest) -> Result<()> {
        let mut slots = self.slots.write().await;
        slots.insert(request.flow_type, request);
        Ok(())
    }

    async fn get(&self, flow_type: FlowType) -> Result<Option<PendingRequest>> {
        let slots = self.slots.read().await;
        Ok(slots.get(&flow_type).cloned())
    }

    async fn clear(&self, flow_type: FlowType) -> Result<()> {
        let mut slots = self.slots.write().await;
        slots.remove(&flow_type);
        Ok(())
    }

    async fn take(&self, flow_type: FlowType) -> Result<Option<PendingRequest>> {
        let mut slots = self.slots.write().await;
        Ok(slots.remove(&flow_type))
    }

    async fn discard(&self, request: &PendingRequest) -> Result<bool> {
        let mut slots = self.slots.write().await;
        if slots.get(&request.flow_type) == Some(request) {
            slots.remove(&request.flow_type);
            return Ok(true);
        }
        Ok(false)
    }
}
