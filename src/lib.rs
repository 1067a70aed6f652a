//! Blink Morse - Timing-driven decoder from eye-closed signals to text
//!
//! Blink Morse turns a stream of timestamped "eyes closed" samples into Morse
//! symbols, letters and words through a deterministic pipeline: blink sampling
//! → symbol classification → letter assembly → Morse decoding → word session.
//!
//! Camera capture and eye-landmark geometry live outside this crate; the
//! decoder only needs `(t_ms, eyes_closed)` observations and optional idle
//! ticks on the same clock.

pub mod assembler;
pub mod classifier;
pub mod config;
pub mod error;
pub mod morse;
pub mod pipeline;
pub mod sampler;
pub mod schema;
pub mod session;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{DecoderConfig, ToggleFlush};
pub use error::DecodeError;
pub use morse::{decode_message, encode_message, MorseTable};
pub use pipeline::{decode_observations, decode_stream_ndjson, BlinkDecoder, DecoderStats};
pub use types::{BlinkEvent, DecoderEvent, Millis, Observation, Symbol};

// Schema exports
pub use schema::{OutputRecord, StreamAdapter, StreamRecord, SCHEMA_VERSION};

/// Library version
pub const BLINK_MORSE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for output records and reports
pub const PRODUCER_NAME: &str = "blink-morse";
