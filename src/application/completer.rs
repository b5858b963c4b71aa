use crate::domain::outcome::{AuthorizationResult, TokenizeResult};
use crate::domain::ports::TokenizeClientBox;
use crate::error::FlowError;
use tracing::{debug, warn};

/// Exchanges a successful authorization for a payment nonce.
///
/// Only `Success` ever reaches the network; failures and cancellations pass straight through.
/// There is no retry.
pub struct TokenizeCompleter {
    client: TokenizeClientBox,
}

impl TokenizeCompleter {
    pub fn new(client: TokenizeClientBox) -> Self {
        Self { client }
    }

    pub async fn complete(&self, result: AuthorizationResult) -> TokenizeResult {
        let payload = match result {
            AuthorizationResult::Success(payload) => payload,
            AuthorizationResult::Failure(err) => return TokenizeResult::Failure(err),
            AuthorizationResult::Cancel => return TokenizeResult::Cancel,
        };

        let flow = payload.flow_type();
        match self.client.exchange(&payload).await {
            Ok(nonce) => {
                debug!(flow = %flow, "tokenized");
                TokenizeResult::Success(nonce)
            }
            Err(err) => {
                warn!(flow = %flow, code = err.code(), "tokenize exchange failed");
                TokenizeResult::Failure(match err {
                    err @ FlowError::NetworkFailure { .. } => err,
                    other => FlowError::network(other.to_string()),
                })
            }
        }
    }
}
