//! Decoder configuration
//!
//! Timing thresholds are supplied once at construction and never change
//! while a decoder runs.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::types::Millis;

/// Default longest blink that still counts as a dot (ms)
pub const DEFAULT_DOT_MAX_MS: Millis = 350.0;

/// Default shortest blink that toggles word building (ms)
pub const DEFAULT_WORD_TOGGLE_MIN_MS: Millis = 4000.0;

/// Default open-eye gap that closes a letter (ms)
pub const DEFAULT_LETTER_GAP_MS: Millis = 1700.0;

/// Default letter substituted for unknown symbol sequences
pub const DEFAULT_PLACEHOLDER: char = '?';

/// What a word toggle does with a partially assembled letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleFlush {
    /// Drop the partial letter; a long blink only starts or stops a word
    #[default]
    Discard,
    /// Decode the partial letter into the word before toggling
    Flush,
}

/// Timing and policy configuration for [`crate::pipeline::BlinkDecoder`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Blinks up to and including this duration are dots (ms)
    pub dot_max_ms: Millis,
    /// Blinks at least this long toggle word building (ms)
    pub word_toggle_min_ms: Millis,
    /// Open-eye gap after the last symbol that closes a letter (ms)
    pub letter_gap_ms: Millis,
    /// Partial-letter policy on word toggle
    pub toggle_flush: ToggleFlush,
    /// Letter appended for symbol strings missing from the Morse table
    pub placeholder: char,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            dot_max_ms: DEFAULT_DOT_MAX_MS,
            word_toggle_min_ms: DEFAULT_WORD_TOGGLE_MIN_MS,
            letter_gap_ms: DEFAULT_LETTER_GAP_MS,
            toggle_flush: ToggleFlush::default(),
            placeholder: DEFAULT_PLACEHOLDER,
        }
    }
}

impl DecoderConfig {
    /// Create a configuration from the three timing thresholds
    pub fn new(dot_max_ms: Millis, word_toggle_min_ms: Millis, letter_gap_ms: Millis) -> Self {
        Self {
            dot_max_ms,
            word_toggle_min_ms,
            letter_gap_ms,
            ..Self::default()
        }
    }

    /// Set the partial-letter policy on word toggle
    pub fn with_toggle_flush(mut self, toggle_flush: ToggleFlush) -> Self {
        self.toggle_flush = toggle_flush;
        self
    }

    /// Set the placeholder for unknown symbol strings
    pub fn with_placeholder(mut self, placeholder: char) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Check that thresholds are positive, finite and ordered
    pub fn validate(&self) -> Result<(), DecodeError> {
        check_positive("dot_max_ms", self.dot_max_ms)?;
        check_positive("word_toggle_min_ms", self.word_toggle_min_ms)?;
        check_positive("letter_gap_ms", self.letter_gap_ms)?;

        if self.dot_max_ms >= self.word_toggle_min_ms {
            return Err(DecodeError::InvalidConfig(format!(
                "dot_max_ms ({}) must be less than word_toggle_min_ms ({})",
                self.dot_max_ms, self.word_toggle_min_ms
            )));
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        let config: DecoderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, DecodeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn check_positive(name: &str, value: Millis) -> Result<(), DecodeError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DecodeError::InvalidConfig(format!(
            "{} must be a positive finite duration, got {}",
            name, value
        )));
    }
    Ok(())
}
