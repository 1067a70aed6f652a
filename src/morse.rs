//! Morse codec
//!
//! Bidirectional mapping between characters and `.`/`-` symbol strings, plus
//! message-level translation where letters are separated by spaces and
//! words by `/`.
//!
//! `@` uses the ITU code `.--.-.`, not the five-symbol `.--.-` seen in some
//! hand-written tables.

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::debug;

use crate::types::Symbol;

/// Symbol string that encodes the space between words
pub const WORD_SEPARATOR: &str = "/";

/// Placeholder used by [`decode_message`] for unknown letters
pub const UNKNOWN_LETTER: char = '?';

const STANDARD_CODES: &[(char, &str)] = &[
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('0', "-----"),
    ('.', ".-.-.-"),
    (',', "--..--"),
    ('?', "..--.."),
    ('\'', ".----."),
    ('!', "-.-.--"),
    ('/', "-..-."),
    ('(', "-.--."),
    (')', "-.--.-"),
    ('&', ".-..."),
    (':', "---..."),
    (';', "-.-.-."),
    ('=', "-...-"),
    ('+', ".-.-."),
    ('-', "-....-"),
    ('_', "..--.-"),
    ('"', ".-..-."),
    ('@', ".--.-."),
    (' ', WORD_SEPARATOR),
];

/// Static character <-> symbol-string table
#[derive(Debug)]
pub struct MorseTable {
    by_char: HashMap<char, &'static str>,
    by_code: HashMap<&'static str, char>,
}

impl MorseTable {
    /// The standard table (letters, digits, punctuation, word space)
    pub fn standard() -> &'static MorseTable {
        static TABLE: OnceLock<MorseTable> = OnceLock::new();
        TABLE.get_or_init(|| MorseTable::from_entries(STANDARD_CODES))
    }

    fn from_entries(entries: &'static [(char, &'static str)]) -> Self {
        let mut by_char = HashMap::with_capacity(entries.len());
        let mut by_code = HashMap::with_capacity(entries.len());
        for &(c, code) in entries {
            by_char.insert(c, code);
            by_code.insert(code, c);
        }
        Self { by_char, by_code }
    }

    /// Decode a letter buffer; `None` if the sequence has no entry
    pub fn decode(&self, symbols: &[Symbol]) -> Option<char> {
        if symbols.is_empty() {
            return None;
        }
        let mut code = String::with_capacity(symbols.len());
        for symbol in symbols {
            code.push(symbol.mark()?);
        }
        self.decode_str(&code)
    }

    /// Decode a symbol string such as `"..."`
    pub fn decode_str(&self, code: &str) -> Option<char> {
        self.by_code.get(code).copied()
    }

    /// Encode one character; letters are case-insensitive
    pub fn encode(&self, c: char) -> Option<&'static str> {
        self.by_char.get(&c.to_ascii_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.by_char.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_char.is_empty()
    }

    /// Entries in table order
    pub fn iter(&self) -> impl Iterator<Item = (char, &'static str)> + '_ {
        STANDARD_CODES.iter().copied()
    }
}

/// Translate a Morse message (`"... --- ... / .-"`) to text.
///
/// Unknown letters become `?`.
pub fn decode_message(morse: &str) -> String {
    let table = MorseTable::standard();
    morse
        .split(WORD_SEPARATOR)
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(|word| {
            word.split_whitespace()
                .map(|code| table.decode_str(code).unwrap_or(UNKNOWN_LETTER))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Translate text to a Morse message; unencodable characters are dropped
pub fn encode_message(text: &str) -> String {
    let table = MorseTable::standard();
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .filter_map(|c| {
                    let code = table.encode(c);
                    if code.is_none() {
                        debug!("No Morse code for {:?}", c);
                    }
                    code
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(&format!(" {} ", WORD_SEPARATOR))
}
