//! Locates the single JSON document inside engine stdout, which interleaves log lines with
//! the payload.
//!
//! The marker-delimited span is preferred; when either marker is missing, stdout is scanned
//! line by line for the one brace-delimited block.

use crate::error::PipelineFailure;
use tracing::{debug, error, trace};

pub const START_MARKER: &str = "PREDICTION_RESULT_START";
pub const END_MARKER: &str = "PREDICTION_RESULT_END";

/// Upper bound, in chars, of the stdout sample echoed in [`PipelineFailure::PayloadNotFound`].
pub const RAW_SAMPLE_CHARS: usize = 512;

/// A non-empty span of engine output believed to hold one JSON object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedPayload(String);

impl ExtractedPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

pub fn extract(stdout: &str) -> Result<ExtractedPayload, PipelineFailure> {
    let payload = match between_markers(stdout) {
        Some(span) => {
            trace!("payload located between markers");
            Some(span.to_string())
        }
        None => {
            debug!("result markers absent; scanning output for a JSON block");
            scan_for_block(stdout)
        }
    };

    match payload {
        Some(payload) if !payload.trim().is_empty() => Ok(ExtractedPayload(payload)),
        _ => {
            error!("no JSON payload found in engine output");
            Err(PipelineFailure::PayloadNotFound {
                raw_output_sample: sample(stdout),
            })
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Primary: PREDICTION_RESULT_START ... PREDICTION_RESULT_END

/// The trimmed text strictly between the first start marker and the first end marker
/// after it; `None` unless both are present in that order.
fn between_markers(stdout: &str) -> Option<&str> {
    let start = stdout.find(START_MARKER)? + START_MARKER.len();
    let end = stdout[start..].find(END_MARKER)? + start;
    Some(stdout[start..end].trim())
}

// -------------------------------------------------------------------------------------------------
// Fallback: line scan
//
// Capture starts at the first line whose trimmed text starts with `{`, and stops (inclusive)
// at the first captured line that ends with `}` and closes the opening brace. Braces inside
// JSON strings are not counted, so a log line mentioning `}` mid-payload does not end it.

fn scan_for_block(stdout: &str) -> Option<String> {
    let mut captured: Vec<&str> = vec![];
    let mut depth = BraceDepth::default();

    for line in stdout.lines() {
        let trimmed = line.trim();
        if captured.is_empty() && !trimmed.starts_with('{') {
            continue;
        }

        captured.push(line);
        depth.feed(line);

        if trimmed.ends_with('}') && depth.is_closed() {
            return Some(captured.join("\n"));
        }
    }

    // either no opening line, or the block never closed
    None
}

#[derive(Default)]
struct BraceDepth {
    depth: i64,
    in_string: bool,
    escaped: bool,
}

impl BraceDepth {
    fn feed(&mut self, line: &str) {
        for c in line.chars() {
            if self.in_string {
                match c {
                    _ if self.escaped => self.escaped = false,
                    '\\' => self.escaped = true,
                    '"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => self.in_string = true,
                '{' => self.depth += 1,
                '}' => self.depth -= 1,
                _ => {}
            }
        }
    }

    fn is_closed(&self) -> bool {
        !self.in_string && self.depth <= 0
    }
}

fn sample(stdout: &str) -> String {
    match stdout.char_indices().nth(RAW_SAMPLE_CHARS) {
        Some((cut, _)) => stdout[..cut].to_string(),
        None => stdout.to_string(),
    }
}
