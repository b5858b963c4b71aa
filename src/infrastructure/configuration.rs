use crate::domain::configuration::MerchantConfiguration;
use crate::domain::ports::ConfigurationSource;
use crate::error::FlowError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// A configuration that is already resolved.
#[derive(Debug, Clone)]
pub struct StaticConfiguration {
    configuration: Arc<MerchantConfiguration>,
}

impl StaticConfiguration {
    pub fn new(configuration: MerchantConfiguration) -> Self {
        Self {
            configuration: Arc::new(configuration),
        }
    }

    pub fn sandbox() -> Self {
        Self::new(MerchantConfiguration::sandbox())
    }
}

#[async_trait]
impl ConfigurationSource for StaticConfiguration {
    async fn configuration(&self) -> Result<Arc<MerchantConfiguration>, FlowError> {
        Ok(self.configuration.clone())
    }
}

/// A configuration that arrives later, e.g. once a remote fetch completes.
///
/// Readers park on a `watch` channel until the paired [`ConfigurationPublisher`] publishes.
/// Dropping the publisher first fails every waiting and future reader.
#[derive(Debug, Clone)]
pub struct DeferredConfiguration {
    receiver: watch::Receiver<Option<Arc<MerchantConfiguration>>>,
}

#[derive(Debug)]
pub struct ConfigurationPublisher {
    sender: watch::Sender<Option<Arc<MerchantConfiguration>>>,
}

impl DeferredConfiguration {
    pub fn pending() -> (Self, ConfigurationPublisher) {
        let (sender, receiver) = watch::channel(None);
        (Self { receiver }, ConfigurationPublisher { sender })
    }
}

impl ConfigurationPublisher {
    /// Publishes (or replaces) the configuration and wakes every waiting reader.
    pub fn publish(&self, configuration: MerchantConfiguration) {
        self.sender.send_replace(Some(Arc::new(configuration)));
    }
}

#[async_trait]
impl ConfigurationSource for DeferredConfiguration {
    async fn configuration(&self) -> Result<Arc<MerchantConfiguration>, FlowError> {
        let mut receiver = self.receiver.clone();
        let published = receiver
            .wait_for(Option::is_some)
            .await
            .map(|current| current.clone())
            .map_err(|_| FlowError::network("configuration source closed before publishing"))?;
        published.ok_or_else(|| FlowError::network("configuration source published nothing"))
    }
}
