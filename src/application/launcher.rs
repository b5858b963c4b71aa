use crate::domain::pending::{PendingOutcome, PendingRequest};
use crate::domain::ports::{ExternalAgentBox, PendingRequestStoreRef};
use crate::domain::request::LaunchRequest;
use crate::error::FlowError;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

/// Hands a launchable request to the external agent.
///
/// The pending record is written strictly before the agent gets control. When the hand-off
/// cannot happen the record written for this attempt is rolled back and any unresumed attempt
/// it replaced is put back, so a failed launch leaves the store as it found it.
pub struct Launcher {
    store: PendingRequestStoreRef,
    agent: ExternalAgentBox,
    registered_schemes: BTreeSet<String>,
}

impl Launcher {
    pub fn new(
        store: PendingRequestStoreRef,
        agent: ExternalAgentBox,
        registered_schemes: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            store,
            agent,
            registered_schemes: registered_schemes.into_iter().collect(),
        }
    }

    pub fn register_scheme(&mut self, scheme: impl Into<String>) {
        self.registered_schemes.insert(scheme.into());
    }

    pub async fn launch(&self, request: &LaunchRequest) -> PendingOutcome {
        let flow = request.flow_type;
        if let Err(err) = self.check(request) {
            debug!(flow = %flow, code = err.code(), "launch rejected");
            return PendingOutcome::Failure(err);
        }

        let previous = match self.store.get(flow).await {
            Ok(Some(previous)) => {
                warn!(
                    flow = %flow,
                    created_at = %previous.created_at,
                    "overwriting an unresumed pending request"
                );
                Some(previous)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(flow = %flow, error = %err, "overwriting an unreadable pending request");
                None
            }
        };

        let pending = PendingRequest::new(flow, request.correlation_payload.clone());
        if let Err(err) = self.store.put(pending.clone()).await {
            error!(flow = %flow, error = %err, "failed to persist pending request");
            return PendingOutcome::Failure(err.into());
        }

        if let Err(err) = self.agent.hand_off(&request.target).await {
            warn!(flow = %flow, agent = self.agent.name(), code = err.code(), "hand-off failed");
            self.roll_back(&pending, previous).await;
            return PendingOutcome::Failure(err);
        }

        info!(flow = %flow, agent = self.agent.name(), "handed off to external agent");
        PendingOutcome::Started(pending)
    }

    /// Removes `pending` and reinstates the attempt it overwrote. A slot that no longer holds
    /// `pending` belongs to someone else and is left alone.
    async fn roll_back(&self, pending: &PendingRequest, previous: Option<PendingRequest>) {
        let flow = pending.flow_type;
        match self.store.discard(pending).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => {
                error!(flow = %flow, error = %err, "failed to roll back pending request");
                return;
            }
        }
        if let Some(previous) = previous {
            match self.store.put(previous).await {
                Ok(()) => debug!(flow = %flow, "restored the previous pending request"),
                Err(err) => {
                    error!(flow = %flow, error = %err, "failed to restore the previous pending request")
                }
            }
        }
    }

    fn check(&self, request: &LaunchRequest) -> Result<(), FlowError> {
        if request.correlation_payload.trim().is_empty() {
            return Err(FlowError::launch_params("correlation payload is empty"));
        }
        if request.return_scheme.is_empty() {
            return Err(FlowError::launch_params("return scheme is empty"));
        }
        if !self.registered_schemes.contains(&request.return_scheme) {
            return Err(FlowError::ReturnSchemeNotRegistered {
                scheme: request.return_scheme.clone(),
            });
        }
        if !self.agent.is_available(&request.target) {
            return Err(FlowError::AgentUnavailable {
                agent: self.agent.name().to_string(),
            });
        }
        Ok(())
    }
}
