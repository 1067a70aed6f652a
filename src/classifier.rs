//! Symbol classification
//!
//! Maps a blink duration to a dot, a dash, or a word toggle with a single
//! ordered comparison chain, so every duration has exactly one symbol.

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::types::{Millis, Symbol};

/// Threshold classifier for blink durations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolClassifier {
    dot_max_ms: Millis,
    word_toggle_min_ms: Millis,
}

impl SymbolClassifier {
    /// Create a classifier; fails unless `0 < dot_max_ms < word_toggle_min_ms`
    pub fn new(dot_max_ms: Millis, word_toggle_min_ms: Millis) -> Result<Self, DecodeError> {
        let config = DecoderConfig::new(
            dot_max_ms,
            word_toggle_min_ms,
            crate::config::DEFAULT_LETTER_GAP_MS,
        );
        Self::from_config(&config)
    }

    /// Create a classifier from a full decoder configuration
    pub fn from_config(config: &DecoderConfig) -> Result<Self, DecodeError> {
        config.validate()?;
        Ok(Self {
            dot_max_ms: config.dot_max_ms,
            word_toggle_min_ms: config.word_toggle_min_ms,
        })
    }

    pub fn classify(&self, duration_ms: Millis) -> Symbol {
        if duration_ms >= self.word_toggle_min_ms {
            Symbol::WordToggle
        } else if duration_ms <= self.dot_max_ms {
            Symbol::Dot
        } else {
            Symbol::Dash
        }
    }

    pub fn word_toggle_min_ms(&self) -> Millis {
        self.word_toggle_min_ms
    }
}
