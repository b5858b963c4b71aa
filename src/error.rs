use crate::domain::flow::FlowType;
use thiserror::Error;

/// Infrastructure failures raised by stores, configuration loading and other adapters.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Pending {flow} record is corrupt: {reason}")]
    CorruptRecord { flow: FlowType, reason: String },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, PaymentError>;

/// The protocol error taxonomy carried inside tagged flow results.
///
/// Unlike [`PaymentError`], these values are cloneable and comparable so they can travel
/// through `PaymentAuthRequest`, `PendingOutcome`, `AuthorizationResult` and `TokenizeResult`
/// and be asserted on by callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The merchant is not enabled for the flow, or its configuration is unusable.
    #[error("configuration invalid: {reason}")]
    ConfigurationInvalid { reason: String },
    /// The request handed to the launcher (or the builder's caller params) is malformed.
    #[error("launch parameters invalid: {reason}")]
    LaunchParamsInvalid { reason: String },
    /// No external agent can open the launch target.
    #[error("external agent unavailable: {agent}")]
    AgentUnavailable { agent: String },
    /// The host has not registered the scheme the agent must return through.
    #[error("return scheme not registered: {scheme}")]
    ReturnSchemeNotRegistered { scheme: String },
    /// The return event does not belong to the persisted attempt.
    #[error("return event does not match the pending request")]
    ReturnMismatch,
    /// The return event matched but its payload could not be parsed.
    #[error("malformed return payload: {reason}")]
    MalformedReturnPayload { reason: String },
    /// The external agent explicitly reported an error.
    #[error("external agent reported an error: {message}")]
    ExternalAgent { message: String },
    /// A network exchange failed.
    #[error("network failure: {reason}")]
    NetworkFailure { reason: String },
    /// An internal invariant was violated (e.g. a corrupt store).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl FlowError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::ConfigurationInvalid {
            reason: reason.into(),
        }
    }

    pub fn launch_params(reason: impl Into<String>) -> Self {
        Self::LaunchParamsInvalid {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedReturnPayload {
            reason: reason.into(),
        }
    }

    pub fn network(reason: impl Into<String>) -> Self {
        Self::NetworkFailure {
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigurationInvalid { .. } => "configuration_invalid",
            Self::LaunchParamsInvalid { .. } => "launch_params_invalid",
            Self::AgentUnavailable { .. } => "agent_unavailable",
            Self::ReturnSchemeNotRegistered { .. } => "return_scheme_not_registered",
            Self::ReturnMismatch => "return_mismatch",
            Self::MalformedReturnPayload { .. } => "malformed_return_payload",
            Self::ExternalAgent { .. } => "external_agent",
            Self::NetworkFailure { .. } => "network_failure",
            Self::Internal { .. } => "internal",
        }
    }
}

impl From<PaymentError> for FlowError {
    fn from(err: PaymentError) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            FlowError::configuration("x"),
            FlowError::launch_params("x"),
            FlowError::AgentUnavailable { agent: "x".into() },
            FlowError::ReturnSchemeNotRegistered { scheme: "x".into() },
            FlowError::ReturnMismatch,
            FlowError::malformed("x"),
            FlowError::ExternalAgent { message: "x".into() },
            FlowError::network("x"),
            FlowError::Internal { message: "x".into() },
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(FlowError::code).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_store_failure_becomes_internal() {
        let err = PaymentError::CorruptRecord {
            flow: FlowType::Venmo,
            reason: "truncated".into(),
        };
        let flow_err: FlowError = err.into();
        assert_eq!(flow_err.code(), "internal");
        assert!(flow_err.to_string().contains("venmo"));
    }
}
