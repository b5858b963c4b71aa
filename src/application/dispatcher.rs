use crate::domain::outcome::TokenizeResult;
use crate::domain::pending::PendingRequest;
use crate::domain::ports::PendingRequestStoreRef;
use tracing::{error, info, warn};

/// Delivers the final outcome of an attempt to the caller.
///
/// The callback is consumed, so it runs exactly once. Before it runs the attempt's record is
/// discarded if it is somehow still stored; a newer launch of the same flow type is left alone.
pub struct ResultDispatcher {
    store: PendingRequestStoreRef,
}

impl ResultDispatcher {
    pub fn new(store: PendingRequestStoreRef) -> Self {
        Self { store }
    }

    pub async fn dispatch<F>(
        &self,
        attempt: Option<&PendingRequest>,
        result: TokenizeResult,
        callback: F,
    ) where
        F: FnOnce(TokenizeResult) + Send,
    {
        if let Some(pending) = attempt {
            match self.store.discard(pending).await {
                Ok(true) => warn!(flow = %pending.flow_type, "closed a lingering pending request"),
                Ok(false) => {}
                Err(err) => error!(flow = %pending.flow_type, error = %err, "failed to close attempt"),
            }
        }

        match &result {
            TokenizeResult::Failure(err) => {
                warn!(status = result.status(), code = err.code(), "dispatching result")
            }
            _ => info!(status = result.status(), "dispatching result"),
        }
        callback(result);
    }
}
