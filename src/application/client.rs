use super::builder::RequestBuilder;
use super::completer::TokenizeCompleter;
use super::dispatcher::ResultDispatcher;
use super::launcher::Launcher;
use super::return_handler::ReturnHandler;
use crate::domain::flow::FlowType;
use crate::domain::outcome::{AuthorizationResult, ReturnEvent, TokenizeResult};
use crate::domain::pending::{PendingOutcome, PendingRequest};
use crate::domain::ports::{
    ConfigurationSourceBox, ExternalAgentBox, PendingRequestStoreRef, TokenizeClientBox,
};
use crate::domain::request::{AuthParams, LaunchRequest, PaymentAuthRequest};
use crate::error::Result;
use crate::flows::FlowAdapters;
use std::sync::Arc;

/// Caller-facing entry point wiring every component of the continuation protocol.
///
/// The async methods map one-to-one onto the components. [`PaymentFlowClient::start`] and
/// [`PaymentFlowClient::complete_if_pending`] are the callback conveniences: between them a
/// callback is invoked exactly once per attempt, and never when nothing was pending.
pub struct PaymentFlowClient {
    store: PendingRequestStoreRef,
    builder: RequestBuilder,
    launcher: Launcher,
    return_handler: ReturnHandler,
    completer: TokenizeCompleter,
    dispatcher: ResultDispatcher,
}

impl PaymentFlowClient {
    /// Creates a client using the standard adapters. `return_scheme` is registered with the
    /// launcher.
    pub fn new(
        configuration: ConfigurationSourceBox,
        store: PendingRequestStoreRef,
        agent: ExternalAgentBox,
        tokenizer: TokenizeClientBox,
        return_scheme: impl Into<String>,
    ) -> Self {
        let return_scheme = return_scheme.into();
        let adapters = Arc::new(FlowAdapters::standard());
        Self {
            builder: RequestBuilder::new(adapters.clone(), configuration, return_scheme.clone()),
            launcher: Launcher::new(store.clone(), agent, [return_scheme]),
            return_handler: ReturnHandler::new(store.clone(), adapters),
            completer: TokenizeCompleter::new(tokenizer),
            dispatcher: ResultDispatcher::new(store.clone()),
            store,
        }
    }

    /// Replaces the adapter registry used for building and resuming.
    pub fn with_adapters(mut self, adapters: FlowAdapters) -> Self {
        let adapters = Arc::new(adapters);
        self.builder.set_adapters(adapters.clone());
        self.return_handler.set_adapters(adapters);
        self
    }

    /// Registers an additional scheme the host can receive returns on.
    pub fn with_registered_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.launcher.register_scheme(scheme);
        self
    }

    pub async fn create_auth_request(
        &self,
        flow_type: FlowType,
        params: &AuthParams,
    ) -> PaymentAuthRequest {
        self.builder.build(flow_type, params).await
    }

    pub async fn launch(&self, request: &LaunchRequest) -> PendingOutcome {
        self.launcher.launch(request).await
    }

    pub async fn resume_if_pending(
        &self,
        flow_type: FlowType,
        event: &ReturnEvent,
    ) -> Option<AuthorizationResult> {
        self.return_handler.resume(flow_type, event).await
    }

    pub async fn tokenize(&self, result: AuthorizationResult) -> TokenizeResult {
        self.completer.complete(result).await
    }

    /// Builds and launches. Returns the pending record when control went to the agent;
    /// otherwise the outcome is already known and `callback` has been invoked with it.
    pub async fn start<F>(
        &self,
        flow_type: FlowType,
        params: &AuthParams,
        callback: F,
    ) -> Option<PendingRequest>
    where
        F: FnOnce(TokenizeResult) + Send,
    {
        let immediate = match self.create_auth_request(flow_type, params).await {
            PaymentAuthRequest::ReadyToLaunch(request) => match self.launch(&request).await {
                PendingOutcome::Started(pending) => return Some(pending),
                PendingOutcome::Failure(err) => TokenizeResult::Failure(err),
            },
            PaymentAuthRequest::LaunchNotRequired(nonce) => TokenizeResult::Success(nonce),
            PaymentAuthRequest::Failure(err) => TokenizeResult::Failure(err),
        };
        self.dispatcher.dispatch(None, immediate, callback).await;
        None
    }

    /// Resumes, tokenizes and dispatches. Returns `false`, without calling `callback`, when
    /// nothing was pending for `flow_type`.
    pub async fn complete_if_pending<F>(
        &self,
        flow_type: FlowType,
        event: &ReturnEvent,
        callback: F,
    ) -> bool
    where
        F: FnOnce(TokenizeResult) + Send,
    {
        let Some(resumption) = self.return_handler.resume_attempt(flow_type, event).await else {
            return false;
        };
        let result = self.completer.complete(resumption.result).await;
        self.dispatcher
            .dispatch(resumption.pending.as_ref(), result, callback)
            .await;
        true
    }

    /// The record currently pending for `flow_type`, without consuming it.
    pub async fn status(&self, flow_type: FlowType) -> Result<Option<PendingRequest>> {
        self.store.get(flow_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{CountingTokenizeClient, RecordingAgent};
    use crate::domain::configuration::MerchantConfiguration;
    use crate::domain::outcome::PaymentNonce;
    use crate::domain::request::{PayPalParams, VenmoParams};
    use crate::error::FlowError;
    use crate::infrastructure::configuration::StaticConfiguration;
    use crate::infrastructure::in_memory::InMemoryPendingStore;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    fn client(
        merchant: MerchantConfiguration,
        tokenizer: CountingTokenizeClient,
    ) -> PaymentFlowClient {
        let store: PendingRequestStoreRef = Arc::new(InMemoryPendingStore::new());
        PaymentFlowClient::new(
            Box::new(StaticConfiguration::new(merchant)),
            store.clone(),
            Box::new(RecordingAgent::new(store)),
            Box::new(tokenizer),
            "com.example.app",
        )
    }

    fn collector() -> (Arc<Mutex<Vec<TokenizeResult>>>, impl FnOnce(TokenizeResult) + Send) {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        (delivered, move |result| sink.lock().unwrap().push(result))
    }

    #[tokio::test]
    async fn test_start_with_vaulted_nonce_completes_immediately() {
        let tokenizer = CountingTokenizeClient::default();
        let client = client(MerchantConfiguration::sandbox(), tokenizer.clone());
        let params = AuthParams::Venmo(VenmoParams {
            vaulted_nonce: Some("vaulted-1".into()),
            ..Default::default()
        });

        let (delivered, callback) = collector();
        assert_eq!(client.start(FlowType::Venmo, &params, callback).await, None);
        assert_eq!(
            *delivered.lock().unwrap(),
            vec![TokenizeResult::Success(
                PaymentNonce::new("vaulted-1").with_description("vaulted Venmo account")
            )]
        );
        assert_eq!(client.status(FlowType::Venmo).await.unwrap(), None);
        assert_eq!(tokenizer.calls(), 0);
    }

    #[tokio::test]
    async fn test_start_failure_is_dispatched() {
        let client = client(
            MerchantConfiguration::default(),
            CountingTokenizeClient::default(),
        );
        let params = AuthParams::PayPal(PayPalParams {
            amount: Some(dec!(5.00)),
            currency: Some("USD".into()),
            ..Default::default()
        });

        let (delivered, callback) = collector();
        assert_eq!(client.start(FlowType::PayPal, &params, callback).await, None);
        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert!(matches!(
            delivered[0],
            TokenizeResult::Failure(FlowError::ConfigurationInvalid { .. })
        ));
    }

    #[tokio::test]
    async fn test_complete_without_pending_is_silent() {
        let client = client(
            MerchantConfiguration::sandbox(),
            CountingTokenizeClient::default(),
        );
        let (delivered, callback) = collector();
        assert!(
            !client
                .complete_if_pending(FlowType::PayPal, &ReturnEvent::dismissed(), callback)
                .await
        );
        assert!(delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_then_dismiss_cancels_without_network() {
        let tokenizer = CountingTokenizeClient::default();
        let client = client(MerchantConfiguration::sandbox(), tokenizer.clone());
        let params = AuthParams::PayPal(PayPalParams {
            amount: Some(dec!(5.00)),
            currency: Some("USD".into()),
            ..Default::default()
        });

        let (_, ignored) = collector();
        let pending = client.start(FlowType::PayPal, &params, ignored).await;
        assert!(pending.is_some());
        assert_eq!(client.status(FlowType::PayPal).await.unwrap(), pending);

        let (delivered, callback) = collector();
        assert!(
            client
                .complete_if_pending(FlowType::PayPal, &ReturnEvent::dismissed(), callback)
                .await
        );
        assert_eq!(*delivered.lock().unwrap(), vec![TokenizeResult::Cancel]);
        assert_eq!(tokenizer.calls(), 0);
        assert_eq!(client.status(FlowType::PayPal).await.unwrap(), None);
    }
}
