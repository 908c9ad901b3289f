//! Locates the JSON object embedded in free-form model output.

use crate::error::AnalysisError;
use serde_json::Value;

/// A balanced `{...}` span found in a larger text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BraceSpan<'a> {
    pub start: usize,
    pub text: &'a str,
}

/// Returns the first top-level `{...}` span that parses as JSON.
///
/// Only top-level candidates are tried: when a balanced span does not parse,
/// scanning resumes after its closing brace, so prose such as
/// `"use {name} here"` is skipped but an inner object of a broken reply is
/// never promoted to the whole result. A top-level brace that never closes
/// (typically a truncated reply) is an error straight away. Braces inside
/// JSON strings do not count towards nesting.
pub fn find_json_object(text: &str) -> Result<Value, AnalysisError> {
    let mut parse_error = None;
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('{') {
        let start = cursor + offset;
        let Some(span) = balanced_span(text, start) else {
            return Err(AnalysisError::UnbalancedBlock(start));
        };

        match serde_json::from_str::<Value>(span.text) {
            Ok(value) => return Ok(value),
            Err(error) => {
                parse_error.get_or_insert(error);
                cursor = start + span.text.len();
            }
        }
    }

    match parse_error {
        Some(error) => Err(AnalysisError::MalformedJson(error)),
        None => Err(AnalysisError::NoStructuredBlock),
    }
}

/// Scans forward from the brace at `start` to its matching close brace.
pub fn balanced_span(text: &str, start: usize) -> Option<BraceSpan<'_>> {
    let tail = text.get(start..)?;
    if !tail.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in tail.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = offset + ch.len_utf8();
                    return Some(BraceSpan {
                        start,
                        text: &tail[..end],
                    });
                }
            }
            _ => {}
        }
    }

    None
}
