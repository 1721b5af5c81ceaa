//! Locating the target series inside an exposition payload.
//!
//! The payload is never parsed as a whole. Each candidate line is reduced to
//! its leading series token, compared against the target selector, and only
//! the first matching line has its value parsed.

use crate::error::{ParseError, SearchError};

use super::selector::Selector;

/// Scan `payload` line by line and return the value of the first line whose
/// series matches `target`.
///
/// Later duplicates of the same series are ignored. `Ok(None)` means the
/// scan reached the end without a match; a malformed matching line aborts
/// the scan.
pub fn search(payload: &str, target: &Selector) -> Result<Option<f64>, ParseError> {
    for line in payload.lines() {
        match search_line(line, target) {
            Ok(value) => return Ok(Some(value)),
            Err(SearchError::VectorTypeMismatch { .. }) | Err(SearchError::TargetNotFound) => {
                continue
            }
            Err(SearchError::Parse(err)) => return Err(err),
        }
    }
    Ok(None)
}

/// Check a single line against `target`.
///
/// Blank and `#` lines, and lines of some other series, report
/// `TargetNotFound`. A leading token that is not an instant vector selector
/// reports `VectorTypeMismatch`.
pub fn search_line(line: &str, target: &Selector) -> Result<f64, SearchError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Err(SearchError::TargetNotFound);
    }

    let (series, rest) = split_series(line);
    let Some(candidate) = Selector::from_series_token(series) else {
        return Err(SearchError::VectorTypeMismatch {
            token: series.to_string(),
        });
    };
    if !candidate.matches(target) {
        return Err(SearchError::TargetNotFound);
    }

    Ok(parse_value(line, rest)?)
}

/// Split a line into its series token and the remainder.
///
/// The token ends at the first whitespace outside of a `{...}` label block,
/// so quoted label values may contain spaces.
fn split_series(line: &str) -> (&str, &str) {
    let mut in_braces = false;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' if in_braces => in_quotes = !in_quotes,
            '{' if !in_quotes => in_braces = true,
            '}' if !in_quotes => in_braces = false,
            c if c.is_whitespace() && !in_braces => return (&line[..i], &line[i..]),
            _ => {}
        }
    }
    (line, "")
}

/// The remainder of a matched line must hold exactly one value.
fn parse_value(line: &str, rest: &str) -> Result<f64, ParseError> {
    let values: Vec<&str> = rest.split_whitespace().collect();
    let [token] = values.as_slice() else {
        return Err(ParseError::ValueCount {
            count: values.len(),
            line: line.to_string(),
        });
    };

    token.parse::<f64>().map_err(|_| ParseError::InvalidValue {
        token: token.to_string(),
        line: line.to_string(),
    })
}
