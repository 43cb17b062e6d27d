//! # proxim-proto
//!
//! Wire codec for Proxim position reports. One report is one UTF-8 JSON
//! object per line; the transport frames records by newline. Encoding and
//! decoding are pure and stateless.
//!
//! A decode failure means "drop this record, keep reading the stream";
//! it must never cross the transport boundary as a fault.

use proxim_core::{ProximError, Report, Result};

/// Encode a report as a single-line JSON wire record (no trailing newline).
///
/// Fails only for an empty device id, which valid sources never produce.
pub fn encode(report: &Report) -> Result<String> {
    if report.device_id.is_empty() {
        return Err(ProximError::Encode("report has empty device id".into()));
    }
    serde_json::to_string(report).map_err(|e| ProximError::Encode(e.to_string()))
}

/// Decode one wire record into a [`Report`].
///
/// Malformed JSON, a missing required field, or an unparseable numeric all
/// surface as [`ProximError::Decode`].
pub fn decode(line: &str) -> Result<Report> {
    serde_json::from_str(line).map_err(|e| ProximError::Decode(e.to_string()))
}
