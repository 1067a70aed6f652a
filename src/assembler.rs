//! Letter assembly
//!
//! Accumulates dots and dashes into a letter buffer and closes the letter
//! once the eyes have stayed open for the letter gap. Word toggles bypass the
//! buffer and go straight to the word session.

use tracing::{debug, trace, warn};

use crate::config::{DecoderConfig, ToggleFlush};
use crate::morse::MorseTable;
use crate::session::WordSession;
use crate::types::{symbols_to_string, Millis, Symbol};

/// What happened to a closed letter buffer
#[derive(Debug, Clone, PartialEq)]
pub enum LetterOutcome {
    /// Decoded and appended to the word in progress
    Decoded {
        letter: char,
        code: String,
        /// `false` when `letter` is the placeholder for an unknown code
        known: bool,
    },
    /// Dropped without decoding
    Discarded { code: String },
}

/// Result of feeding one symbol
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    /// Dot or dash appended to the letter buffer
    Buffered,
    /// Word building toggled
    Toggled {
        /// Partial letter handled on the way, if any
        pending: Option<LetterOutcome>,
        /// Word emitted when building stopped
        completed_word: Option<String>,
    },
}

/// Owns the letter buffer between letter boundaries
#[derive(Debug, Clone)]
pub struct LetterAssembler {
    buffer: Vec<Symbol>,
    last_symbol_ms: Option<Millis>,
    letter_gap_ms: Millis,
    toggle_flush: ToggleFlush,
    placeholder: char,
    table: &'static MorseTable,
}

impl LetterAssembler {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            buffer: Vec::new(),
            last_symbol_ms: None,
            letter_gap_ms: config.letter_gap_ms,
            toggle_flush: config.toggle_flush,
            placeholder: config.placeholder,
            table: MorseTable::standard(),
        }
    }

    /// Feed one classified symbol observed at `now_ms`
    pub fn on_symbol(
        &mut self,
        symbol: Symbol,
        now_ms: Millis,
        session: &mut WordSession,
    ) -> SymbolOutcome {
        match symbol {
            Symbol::Dot | Symbol::Dash => {
                self.buffer.push(symbol);
                self.last_symbol_ms = Some(now_ms);
                debug!(
                    "Recorded {} -> {}",
                    symbol.as_str(),
                    symbols_to_string(&self.buffer)
                );
                SymbolOutcome::Buffered
            }
            Symbol::WordToggle => {
                let pending = match self.toggle_flush {
                    ToggleFlush::Flush => self.close_letter(session),
                    ToggleFlush::Discard => self.discard_letter(),
                };
                let completed_word = session.toggle();
                SymbolOutcome::Toggled {
                    pending,
                    completed_word,
                }
            }
        }
    }

    /// Close the letter once the gap since the last symbol exceeds the letter
    /// gap. `now_ms` is where the gap ends; the pipeline holds it at the start
    /// of a closure that may still turn out to be a dot or dash.
    ///
    /// Repeated checks after a close are no-ops until a new symbol.
    pub fn on_idle_check(&mut self, now_ms: Millis, session: &mut WordSession) -> Option<LetterOutcome> {
        let last_ms = self.last_symbol_ms?;
        let gap_ms = now_ms - last_ms;
        trace!("Idle check: {:.0}ms since last symbol", gap_ms);
        if gap_ms <= self.letter_gap_ms {
            return None;
        }
        self.close_letter(session)
    }

    /// Decode the buffer into the session, or discard it if no word is
    /// being built
    fn close_letter(&mut self, session: &mut WordSession) -> Option<LetterOutcome> {
        self.last_symbol_ms = None;
        if self.buffer.is_empty() {
            return None;
        }
        if !session.is_active() {
            return self.discard_letter();
        }

        let code = symbols_to_string(&self.buffer);
        let decoded = self.table.decode(&self.buffer);
        self.buffer.clear();

        let letter = decoded.unwrap_or(self.placeholder);
        if decoded.is_none() {
            warn!("Unknown Morse sequence {:?}, substituting {:?}", code, letter);
        }
        // Cannot fail: the session is active
        session.append_letter(letter).ok()?;
        Some(LetterOutcome::Decoded {
            letter,
            code,
            known: decoded.is_some(),
        })
    }

    fn discard_letter(&mut self) -> Option<LetterOutcome> {
        self.last_symbol_ms = None;
        if self.buffer.is_empty() {
            return None;
        }
        let code = symbols_to_string(&self.buffer);
        self.buffer.clear();
        debug!("Discarded partial letter {:?}", code);
        Some(LetterOutcome::Discarded { code })
    }

    /// Symbols since the last letter boundary
    pub fn pending(&self) -> &[Symbol] {
        &self.buffer
    }

    pub fn last_symbol_ms(&self) -> Option<Millis> {
        self.last_symbol_ms
    }
}
