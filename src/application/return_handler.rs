use crate::domain::flow::FlowType;
use crate::domain::outcome::{AuthorizationResult, ReturnEvent};
use crate::domain::pending::PendingRequest;
use crate::domain::ports::PendingRequestStoreRef;
use crate::error::FlowError;
use crate::flows::{FlowAdapters, ReturnRoute};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One consumed pending attempt and what its return amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resumption {
    pub flow_type: FlowType,
    /// The consumed record. `None` only when the stored record could not be decoded.
    pub pending: Option<PendingRequest>,
    pub result: AuthorizationResult,
}

/// Consumes the pending record for a flow type and interprets the return event against it.
pub struct ReturnHandler {
    store: PendingRequestStoreRef,
    adapters: Arc<FlowAdapters>,
}

impl ReturnHandler {
    pub fn new(store: PendingRequestStoreRef, adapters: Arc<FlowAdapters>) -> Self {
        Self { store, adapters }
    }

    pub(crate) fn set_adapters(&mut self, adapters: Arc<FlowAdapters>) {
        self.adapters = adapters;
    }

    /// Returns `None` when nothing is pending for `flow_type`; otherwise the record is gone
    /// from the store before the event is looked at.
    pub async fn resume(
        &self,
        flow_type: FlowType,
        event: &ReturnEvent,
    ) -> Option<AuthorizationResult> {
        self.resume_attempt(flow_type, event)
            .await
            .map(|resumption| resumption.result)
    }

    pub async fn resume_attempt(
        &self,
        flow_type: FlowType,
        event: &ReturnEvent,
    ) -> Option<Resumption> {
        let pending = match self.store.take(flow_type).await {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                debug!(flow = %flow_type, "nothing pending");
                return None;
            }
            Err(err) => {
                error!(flow = %flow_type, error = %err, "pending request unreadable");
                return Some(Resumption {
                    flow_type,
                    pending: None,
                    result: AuthorizationResult::Failure(err.into()),
                });
            }
        };

        let result = self.interpret(&pending, event);
        match &result {
            AuthorizationResult::Success(_) => info!(flow = %flow_type, "authorization returned"),
            AuthorizationResult::Cancel => info!(flow = %flow_type, "authorization canceled"),
            AuthorizationResult::Failure(err) => {
                warn!(flow = %flow_type, code = err.code(), "authorization failed")
            }
        }

        Some(Resumption {
            flow_type,
            pending: Some(pending),
            result,
        })
    }

    fn interpret(&self, pending: &PendingRequest, event: &ReturnEvent) -> AuthorizationResult {
        let Some(adapter) = self.adapters.get(pending.flow_type) else {
            return AuthorizationResult::Failure(FlowError::Internal {
                message: format!("no adapter registered for {}", pending.flow_type),
            });
        };

        let payload = &pending.correlation_payload;
        match adapter.correlate(payload, event) {
            Err(err) => AuthorizationResult::Failure(err),
            Ok(ReturnRoute::Cancel) => AuthorizationResult::Cancel,
            Ok(ReturnRoute::Error(message)) => {
                AuthorizationResult::Failure(FlowError::ExternalAgent { message })
            }
            Ok(ReturnRoute::Success) => match adapter.parse_success(payload, event) {
                Ok(result) => AuthorizationResult::Success(result),
                Err(err) => AuthorizationResult::Failure(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::configuration::MerchantConfiguration;
    use crate::domain::outcome::AuthorizationPayload;
    use crate::domain::ports::PendingRequestStore;
    use crate::domain::request::{AuthParams, PaymentAuthRequest, SepaParams};
    use crate::domain::token::CorrelationToken;
    use crate::flows::sepa::SepaAdapter;
    use crate::flows::{BuildContext, FlowAdapter, STATE_PARAM};
    use crate::infrastructure::in_memory::InMemoryPendingStore;
    use url::Url;

    /// A SEPA record built for `token`.
    fn sepa_payload(token: &str) -> String {
        let token = CorrelationToken::from(token);
        let ctx = BuildContext {
            token: &token,
            return_scheme: "com.example.app",
        };
        let params = AuthParams::SepaDirectDebit(SepaParams {
            account_holder_name: "Jane Doe".into(),
            customer_id: "cust-1".into(),
            iban: "FR7630006000011234567890189".into(),
            ..Default::default()
        });
        match SepaAdapter.build(&params, &MerchantConfiguration::sandbox(), &ctx) {
            PaymentAuthRequest::ReadyToLaunch(request) => request.correlation_payload,
            other => panic!("expected ReadyToLaunch, got {other:?}"),
        }
    }

    async fn handler_with(token: &str) -> (ReturnHandler, Arc<InMemoryPendingStore>) {
        let store = Arc::new(InMemoryPendingStore::new());
        store
            .put(PendingRequest::new(
                FlowType::SepaDirectDebit,
                sepa_payload(token),
            ))
            .await
            .unwrap();
        let handler = ReturnHandler::new(store.clone(), Arc::new(FlowAdapters::standard()));
        (handler, store)
    }

    fn event(raw: &str) -> ReturnEvent {
        ReturnEvent::from_uri(Url::parse(raw).unwrap())
    }

    #[tokio::test]
    async fn test_nothing_pending_is_silent() {
        let store = Arc::new(InMemoryPendingStore::new());
        let handler = ReturnHandler::new(store, Arc::new(FlowAdapters::standard()));
        assert_eq!(
            handler
                .resume(FlowType::PayPal, &ReturnEvent::dismissed())
                .await,
            None
        );
    }

    #[tokio::test]
    async fn test_success_is_read_once() {
        let (handler, store) = handler_with("tok-1").await;
        let success = event("com.example.app://sepa/success?state=tok-1&bank_reference_token=B1");

        let result = handler.resume(FlowType::SepaDirectDebit, &success).await;
        assert!(matches!(
            result,
            Some(AuthorizationResult::Success(AuthorizationPayload::SepaDirectDebit { .. }))
        ));
        assert_eq!(store.get(FlowType::SepaDirectDebit).await.unwrap(), None);
        assert_eq!(handler.resume(FlowType::SepaDirectDebit, &success).await, None);
    }

    #[tokio::test]
    async fn test_stale_token_is_mismatch_and_consumes() {
        let (handler, store) = handler_with("tok-new").await;
        let stale = event("com.example.app://sepa/success?state=tok-old&bank_reference_token=B1");

        assert_eq!(
            handler.resume(FlowType::SepaDirectDebit, &stale).await,
            Some(AuthorizationResult::Failure(FlowError::ReturnMismatch))
        );
        assert_eq!(store.get(FlowType::SepaDirectDebit).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cancel_and_dismissal() {
        let (handler, _) = handler_with("tok-1").await;
        assert_eq!(
            handler
                .resume(
                    FlowType::SepaDirectDebit,
                    &event("com.example.app://sepa/cancel?state=tok-1")
                )
                .await,
            Some(AuthorizationResult::Cancel)
        );

        let (handler, _) = handler_with("tok-2").await;
        assert_eq!(
            handler
                .resume(FlowType::SepaDirectDebit, &ReturnEvent::dismissed())
                .await,
            Some(AuthorizationResult::Cancel)
        );
    }

    #[tokio::test]
    async fn test_unparsable_success_is_malformed() {
        let (handler, _) = handler_with("tok-1").await;
        let result = handler
            .resume(
                FlowType::SepaDirectDebit,
                &event("com.example.app://sepa/success?state=tok-1"),
            )
            .await;
        assert!(matches!(
            result,
            Some(AuthorizationResult::Failure(
                FlowError::MalformedReturnPayload { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_structured_return_via_extras() {
        let (handler, _) = handler_with("tok-1").await;
        let structured = ReturnEvent::dismissed()
            .with_extra(STATE_PARAM, "tok-1")
            .with_extra("outcome", "success")
            .with_extra("bank_reference_token", "B2");
        let resumption = handler
            .resume_attempt(FlowType::SepaDirectDebit, &structured)
            .await
            .unwrap();
        assert_eq!(resumption.flow_type, FlowType::SepaDirectDebit);
        assert!(resumption.pending.is_some());
        assert!(matches!(
            resumption.result,
            AuthorizationResult::Success(AuthorizationPayload::SepaDirectDebit { ref bank_reference_token, .. })
                if bank_reference_token == "B2"
        ));
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_internal() {
        let store = Arc::new(InMemoryPendingStore::new());
        store
            .put(PendingRequest::new(FlowType::PayPal, "not json"))
            .await
            .unwrap();
        let handler = ReturnHandler::new(store, Arc::new(FlowAdapters::standard()));
        let result = handler
            .resume(FlowType::PayPal, &event("com.example.app://onetouch/v1/success?state=x"))
            .await;
        assert!(matches!(
            result,
            Some(AuthorizationResult::Failure(FlowError::Internal { .. }))
        ));
    }

    #[tokio::test]
    async fn test_flow_slots_are_isolated() {
        let (handler, store) = handler_with("tok-1").await;
        assert_eq!(
            handler
                .resume(FlowType::Venmo, &ReturnEvent::dismissed())
                .await,
            None
        );
        assert!(store.get(FlowType::SepaDirectDebit).await.unwrap().is_some());
    }
}
