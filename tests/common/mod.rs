#![allow(dead_code)]

use async_trait::async_trait;
use payresume::application::PaymentFlowClient;
use payresume::domain::configuration::MerchantConfiguration;
use payresume::domain::outcome::{AuthorizationPayload, PaymentNonce, TokenizeResult};
use payresume::domain::ports::{ExternalAgent, PendingRequestStoreRef, TokenizeClient};
use payresume::domain::request::LaunchTarget;
use payresume::error::FlowError;
use payresume::infrastructure::configuration::StaticConfiguration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

pub const RETURN_SCHEME: &str = "com.example.shop";

/// An agent that only remembers where it was sent.
#[derive(Clone, Default)]
pub struct CapturingAgent {
    pub launched: Arc<Mutex<Vec<LaunchTarget>>>,
}

impl CapturingAgent {
    pub fn last_url(&self) -> Url {
        self.launched
            .lock()
            .unwrap()
            .last()
            .map(|target| target.url().clone())
            .expect("nothing was launched")
    }
}

#[async_trait]
impl ExternalAgent for CapturingAgent {
    fn name(&self) -> &str {
        "capturing"
    }

    fn is_available(&self, _target: &LaunchTarget) -> bool {
        true
    }

    async fn hand_off(&self, target: &LaunchTarget) -> Result<(), FlowError> {
        self.launched.lock().unwrap().push(target.clone());
        Ok(())
    }
}

/// A tokenize client that counts exchanges and answers `nonce-<flow>`.
#[derive(Clone, Default)]
pub struct CountingTokenizer {
    pub calls: Arc<AtomicUsize>,
}

impl CountingTokenizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenizeClient for CountingTokenizer {
    async fn exchange(&self, payload: &AuthorizationPayload) -> Result<PaymentNonce, FlowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentNonce::new(format!("nonce-{}", payload.flow_type())))
    }
}

/// A client as a host process would build it on start-up.
pub fn client(
    store: PendingRequestStoreRef,
    agent: CapturingAgent,
    tokenizer: CountingTokenizer,
    merchant: MerchantConfiguration,
) -> PaymentFlowClient {
    PaymentFlowClient::new(
        Box::new(StaticConfiguration::new(merchant)),
        store,
        Box::new(agent),
        Box::new(tokenizer),
        RETURN_SCHEME,
    )
}

/// Reads a query parameter.
pub fn query(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// The return URL registered under `param` in a launch URL, as the agent would call it back.
pub fn return_url(launch_url: &Url, param: &str) -> Url {
    let raw = query(launch_url, param).expect("launch url lacks the return url");
    Url::parse(&raw).unwrap()
}

/// Appends vendor parameters to a return URL.
pub fn with_params(mut url: Url, params: &[(&str, &str)]) -> Url {
    url.query_pairs_mut().extend_pairs(params);
    url
}

/// Collects callback deliveries.
pub fn collector() -> (
    Arc<Mutex<Vec<TokenizeResult>>>,
    impl FnOnce(TokenizeResult) + Send,
) {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();
    (delivered, move |result| sink.lock().unwrap().push(result))
}

/// The binary, isolated from any configuration of the machine running the tests.
pub fn payresume(work_dir: &std::path::Path) -> std::process::Command {
    let mut cmd = std::process::Command::new(assert_cmd::cargo_bin!("payresume"));
    cmd.env("PAYRESUME_CONFIG", work_dir.join("absent.json"))
        .env("RUST_LOG", "info")
        .env_remove("PAYRESUME_STORE_DIR")
        .env_remove("PAYRESUME_GATEWAY_URL")
        .env_remove("PAYRESUME_RETURN_SCHEME")
        .arg("--store-dir")
        .arg(work_dir.join("store"));
    cmd
}

/// Parses the single JSON line the binary prints on stdout.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is one JSON document")
}
