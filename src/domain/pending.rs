use super::flow::FlowType;
use super::timestamp::UnixTimestamp;
use crate::error::{FlowError, PaymentError, Result};
use serde::{Deserialize, Serialize};

/// Durable record of an in-flight, not-yet-resumed authorization attempt.
///
/// `correlation_payload` is produced by the flow adapter at build time and is only ever
/// interpreted by that same adapter on resumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub flow_type: FlowType,
    pub correlation_payload: String,
    pub created_at: UnixTimestamp,
}

impl PendingRequest {
    pub fn new(flow_type: FlowType, correlation_payload: impl Into<String>) -> Self {
        Self {
            flow_type,
            correlation_payload: correlation_payload.into(),
            created_at: UnixTimestamp::now(),
        }
    }

    /// Serializes the record into the single string value kept under the flow's storage key.
    pub fn to_record(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a stored record, checking that it belongs to the slot it was read from.
    pub fn from_record(flow_type: FlowType, record: &str) -> Result<Self> {
        let request: PendingRequest =
            serde_json::from_str(record).map_err(|e| PaymentError::CorruptRecord {
                flow: flow_type,
                reason: e.to_string(),
            })?;
        if request.flow_type != flow_type {
            return Err(PaymentError::CorruptRecord {
                flow: flow_type,
                reason: format!("record belongs to {}", request.flow_type),
            });
        }
        Ok(request)
    }
}

/// What the launcher reports after attempting the hand-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOutcome {
    Started(PendingRequest),
    Failure(FlowError),
}
