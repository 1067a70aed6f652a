//! Word session
//!
//! Brackets the letters of one word between two word toggles. The session
//! alternates between idle and building forever; there is no terminal state.

use tracing::info;

use crate::error::DecodeError;

/// Word-building mode and the letters decoded so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordSession {
    active: bool,
    letters: Vec<char>,
}

impl WordSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip word-building mode.
    ///
    /// Ending a word returns its letters joined and clears them; starting a
    /// word returns `None`.
    pub fn toggle(&mut self) -> Option<String> {
        if self.active {
            self.active = false;
            let word: String = self.letters.drain(..).collect();
            info!("Word completed: {:?}", word);
            Some(word)
        } else {
            self.active = true;
            info!("Word building started");
            None
        }
    }

    /// Append a decoded letter.
    ///
    /// Rejected with [`DecodeError::SessionInactive`] while idle; the session
    /// is left untouched.
    pub fn append_letter(&mut self, letter: char) -> Result<(), DecodeError> {
        if !self.active {
            return Err(DecodeError::SessionInactive(letter));
        }
        self.letters.push(letter);
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Letters of the word in progress
    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    pub fn current_word(&self) -> String {
        self.letters.iter().collect()
    }
}
