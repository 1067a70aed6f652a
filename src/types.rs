//! Core types for the Blink Morse pipeline
//!
//! This module defines the values that flow between stages: raw eye-state
//! observations, completed blink events, classified symbols, and the events
//! the decoder reports to its host.

use serde::{Deserialize, Serialize};

/// Milliseconds on the caller's monotonic clock
pub type Millis = f64;

/// One sample of the external eye-state signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Sample time (ms)
    pub t_ms: Millis,
    /// Whether the eyes were closed in this sample
    pub eyes_closed: bool,
}

impl Observation {
    pub fn new(t_ms: Millis, eyes_closed: bool) -> Self {
        Self { t_ms, eyes_closed }
    }
}

/// One complete closed-eye interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlinkEvent {
    /// Time the eyes closed (ms)
    pub start_ms: Millis,
    /// Time the eyes reopened (ms)
    pub end_ms: Millis,
    /// `end_ms - start_ms`
    pub duration_ms: Millis,
}

impl BlinkEvent {
    pub fn new(start_ms: Millis, end_ms: Millis) -> Self {
        Self {
            start_ms,
            end_ms,
            duration_ms: end_ms - start_ms,
        }
    }
}

/// Classification of a blink duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Dot,
    Dash,
    /// Long blink that starts or stops word building
    WordToggle,
}

impl Symbol {
    /// Morse mark for `Dot`/`Dash`; `None` for `WordToggle`
    pub fn mark(&self) -> Option<char> {
        match self {
            Symbol::Dot => Some('.'),
            Symbol::Dash => Some('-'),
            Symbol::WordToggle => None,
        }
    }

    /// Parse a single `.`/`-` mark
    pub fn from_mark(c: char) -> Option<Self> {
        match c {
            '.' => Some(Symbol::Dot),
            '-' => Some(Symbol::Dash),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Dot => "dot",
            Symbol::Dash => "dash",
            Symbol::WordToggle => "word_toggle",
        }
    }
}

/// Render a letter buffer as its `.`/`-` string
pub fn symbols_to_string(symbols: &[Symbol]) -> String {
    symbols.iter().filter_map(Symbol::mark).collect()
}

/// Events the decoder emits to its host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DecoderEvent {
    /// A letter was closed and decoded while building a word
    LetterDecoded {
        letter: char,
        /// Symbol string the letter was decoded from
        code: String,
        at_ms: Millis,
    },
    /// Word building ended
    WordCompleted { word: String, at_ms: Millis },
}

impl DecoderEvent {
    pub fn at_ms(&self) -> Millis {
        match self {
            DecoderEvent::LetterDecoded { at_ms, .. } => *at_ms,
            DecoderEvent::WordCompleted { at_ms, .. } => *at_ms,
        }
    }
}
