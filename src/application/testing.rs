//! Doubles shared by the application unit tests.

use crate::domain::flow::FlowType;
use crate::domain::outcome::{AuthorizationPayload, PaymentNonce};
use crate::domain::ports::{ExternalAgent, PendingRequestStoreRef, TokenizeClient};
use crate::domain::request::LaunchTarget;
use crate::error::FlowError;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Records every hand-off along with whether the pending record was already persisted.
pub struct RecordingAgent {
    store: PendingRequestStoreRef,
    pub available: bool,
    pub fail_with: Option<FlowError>,
    pub hand_offs: Arc<Mutex<Vec<(String, bool)>>>,
}

impl RecordingAgent {
    pub fn new(store: PendingRequestStoreRef) -> Self {
        Self {
            store,
            available: true,
            fail_with: None,
            hand_offs: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ExternalAgent for RecordingAgent {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_available(&self, _target: &LaunchTarget) -> bool {
        self.available
    }

    async fn hand_off(&self, target: &LaunchTarget) -> Result<(), FlowError> {
        let mut persisted = false;
        for flow in FlowType::ALL {
            if let Ok(Some(_)) = self.store.get(flow).await {
                persisted = true;
            }
        }
        self.hand_offs
            .lock()
            .await
            .push((target.url().to_string(), persisted));
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Counts exchanges and answers with a fixed nonce or error.
#[derive(Clone, Default)]
pub struct CountingTokenizeClient {
    pub calls: Arc<AtomicUsize>,
    pub fail_with: Option<FlowError>,
}

impl CountingTokenizeClient {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenizeClient for CountingTokenizeClient {
    async fn exchange(&self, payload: &AuthorizationPayload) -> Result<PaymentNonce, FlowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(PaymentNonce::new(format!("nonce-{}", payload.flow_type()))),
        }
    }
}
