//! blink.stream.v1 schema
//!
//! This module defines the line-oriented input format carrying eye-state
//! observations and idle-check ticks, and the records the decoder writes
//! back out.

mod adapter;
mod stream_record;

pub use adapter::*;
pub use stream_record::*;
