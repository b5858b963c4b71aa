//! SDK configuration.
//!
//! Loaded from a JSON file. A missing file means defaults, which enable every flow against
//! sandbox endpoints.
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "return_scheme": "com.example.shop",
//!   "store_dir": "/var/lib/shop/payresume",
//!   "gateway_url": "https://gateway.example/",
//!   "merchant": {
//!     "merchant_id": "shop",
//!     "sepa_direct_debit": { "mandate_url": "https://bank.example/mandate" }
//!   }
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `PAYRESUME_CONFIG`: path to the configuration file (default: `payresume.json`)
//! - `PAYRESUME_STORE_DIR`: overrides `store_dir`
//! - `PAYRESUME_GATEWAY_URL`: overrides `gateway_url`
//! - `PAYRESUME_RETURN_SCHEME`: overrides `return_scheme`

use crate::domain::configuration::MerchantConfiguration;
use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "PAYRESUME_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "payresume.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Scheme the host receives returns on (default: `com.example.payresume`).
    #[serde(default = "default_return_scheme")]
    pub return_scheme: String,

    /// Installation directory for the durable pending request store (default: `.payresume`).
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Tokenization gateway base URL. Without it nonces are never exchanged over the network.
    #[serde(default)]
    pub gateway_url: Option<String>,

    /// Bearer token sent to the gateway.
    #[serde(default)]
    pub gateway_token: Option<String>,

    /// Gateway request timeout in seconds (default: `30`).
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,

    /// Merchant snapshot; an absent flow section means the merchant is not enabled for it.
    #[serde(default = "MerchantConfiguration::sandbox")]
    pub merchant: MerchantConfiguration,
}

fn default_return_scheme() -> String {
    "com.example.payresume".to_string()
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(".payresume")
}

fn default_gateway_timeout_secs() -> u64 {
    30
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            return_scheme: default_return_scheme(),
            store_dir: default_store_dir(),
            gateway_url: None,
            gateway_token: None,
            gateway_timeout_secs: default_gateway_timeout_secs(),
            merchant: MerchantConfiguration::sandbox(),
        }
    }
}

impl SdkConfig {
    /// Loads from the path in `PAYRESUME_CONFIG` (default `payresume.json`) and applies the
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Loads from a specific file; a missing file yields the defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PaymentError::ConfigError(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `PAYRESUME_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("PAYRESUME_STORE_DIR").filter(|v| !v.is_empty()) {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("PAYRESUME_GATEWAY_URL").filter(|v| !v.is_empty()) {
            self.gateway_url = Some(url);
        }
        if let Some(scheme) = lookup("PAYRESUME_RETURN_SCHEME").filter(|v| !v.is_empty()) {
            self.return_scheme = scheme;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.return_scheme.trim().is_empty() {
            return Err(PaymentError::ConfigError(
                "return_scheme must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
