//! Parser for plain-text request files.
//!
//! One request per line, `station alias, line`:
//!
//! ```text
//! # home display
//! grove, JSQ-33
//! wtc, 1
//! ```

use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::model::StationRequest;

/// A parsed request and the 1-based line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub line_no: usize,
    pub request: StationRequest,
}

/// Parses request lines. Blank lines and `#` comments are skipped.
///
/// The agency is left unset; the compiler infers it from the line.
pub fn parse_request_lines(content: &str) -> Result<Vec<StationRequest>> {
    Ok(parse_numbered_request_lines(content)?
        .into_iter()
        .map(|line| line.request)
        .collect())
}

/// Same as [`parse_request_lines`], keeping each request's line number.
pub fn parse_numbered_request_lines(content: &str) -> Result<Vec<RequestLine>> {
    let mut requests = Vec::new();

    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split(',').map(str::trim);
        let (Some(alias), Some(route)) = (parts.next(), parts.next()) else {
            bail!("line {line_no}: expected 'alias, line' format");
        };
        if alias.is_empty() {
            bail!("line {line_no}: missing station alias");
        }
        if route.is_empty() {
            bail!("line {line_no}: missing line identifier");
        }

        requests.push(RequestLine {
            line_no,
            request: StationRequest::new(None, alias, route.to_uppercase()),
        });
    }

    if requests.is_empty() {
        bail!("input did not contain any station rows");
    }
    Ok(requests)
}

/// Reads and parses a request file.
pub fn load_request_file(path: impl AsRef<Path>) -> Result<Vec<RequestLine>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request file {}", path.display()))?;
    parse_numbered_request_lines(&content).with_context(|| format!("invalid request file {}", path.display()))
}
