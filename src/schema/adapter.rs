//! Parsing helpers for blink.stream.v1 input

use crate::error::DecodeError;
use crate::schema::stream_record::{StreamRecord, ValidationError};

/// Adapter for reading stream records from NDJSON or JSON arrays
pub struct StreamAdapter;

impl StreamAdapter {
    /// Parse a JSON array of records
    pub fn parse_array(json: &str) -> Result<Vec<StreamRecord>, DecodeError> {
        let records: Vec<StreamRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (one record per line, blank lines ignored)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<StreamRecord>, DecodeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record = serde_json::from_str::<StreamRecord>(trimmed).map_err(|e| {
                DecodeError::ParseError(format!("Failed to parse line {}: {}", line_num + 1, e))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[StreamRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record
                    .validate()
                    .err()
                    .map(|error| ValidationResult { index, error })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// Zero-based position in the input
    pub index: usize,
    pub error: ValidationError,
}
