//! blink.stream.v1 record definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DecoderEvent, Millis, Observation};

/// Current schema version
pub const SCHEMA_VERSION: &str = "blink.stream.v1";

/// One input record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Optional schema version; checked when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(flatten)]
    pub body: RecordBody,
}

/// Record payload, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordBody {
    /// Eye-state sample from the vision collaborator
    Observation { t_ms: Millis, eyes_closed: bool },
    /// Idle-check tick from a timer
    Tick { t_ms: Millis },
}

impl StreamRecord {
    pub fn observation(t_ms: Millis, eyes_closed: bool) -> Self {
        Self {
            schema_version: None,
            body: RecordBody::Observation { t_ms, eyes_closed },
        }
    }

    pub fn tick(t_ms: Millis) -> Self {
        Self {
            schema_version: None,
            body: RecordBody::Tick { t_ms },
        }
    }

    pub fn t_ms(&self) -> Millis {
        match self.body {
            RecordBody::Observation { t_ms, .. } => t_ms,
            RecordBody::Tick { t_ms } => t_ms,
        }
    }

    /// Validate structure only; ordering is checked by the decoder, and any
    /// finite time base is accepted
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(version) = &self.schema_version {
            if version != SCHEMA_VERSION {
                return Err(ValidationError::InvalidSchemaVersion {
                    expected: SCHEMA_VERSION.to_string(),
                    actual: version.clone(),
                });
            }
        }

        let t_ms = self.t_ms();
        if !t_ms.is_finite() {
            return Err(ValidationError::InvalidTime(t_ms));
        }

        Ok(())
    }
}

impl From<Observation> for StreamRecord {
    fn from(obs: Observation) -> Self {
        StreamRecord::observation(obs.t_ms, obs.eyes_closed)
    }
}

/// Validation errors for stream records
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Invalid record time: {0} (must be finite)")]
    InvalidTime(Millis),
}

/// One output record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(flatten)]
    pub event: DecoderEvent,
    /// Wall-clock time the record was written (streaming mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emitted_at: Option<DateTime<Utc>>,
}

impl OutputRecord {
    pub fn new(event: DecoderEvent) -> Self {
        Self {
            event,
            emitted_at: None,
        }
    }

    pub fn stamped(event: DecoderEvent) -> Self {
        Self {
            event,
            emitted_at: Some(Utc::now()),
        }
    }
}
