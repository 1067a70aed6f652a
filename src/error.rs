//! Error types for Blink Morse

use thiserror::Error;

use crate::types::Millis;

/// Errors that can occur while configuring or driving the decoder
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Non-finite, or earlier than the last accepted timestamp
    #[error("Invalid timestamp: {got} ms (last accepted: {last:?} ms)")]
    InvalidTimestamp { last: Option<Millis>, got: Millis },

    #[error("Cannot append letter '{0}' while no word is being built")]
    SessionInactive(char),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
