//! Marlin Response Parser
//!
//! Classifies reply lines: acknowledgments, errors, busy keep-alives,
//! position reports and free-form messages. Lines that cannot be trusted
//! are reported as garbled.

use penarm_core::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marlin response types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarlinResponse {
    /// Command acknowledged
    Ok,
    /// Error report
    Error(String),
    /// Keep-alive while a long move runs
    Busy,
    /// Position report (M114)
    Position(Point3),
    /// Startup banner, echo or other text
    Message(String),
    /// Corrupted or unintelligible line
    Garbled(String),
}

impl fmt::Display for MarlinResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Error(msg) => write!(f, "error:{}", msg),
            Self::Busy => write!(f, "busy"),
            Self::Position(p) => write!(f, "position:{}", p),
            Self::Message(msg) => write!(f, "message:{}", msg),
            Self::Garbled(line) => write!(f, "garbled:{:?}", line),
        }
    }
}

/// Marlin response parser
#[derive(Debug, Default)]
pub struct MarlinResponseParser;

impl MarlinResponseParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse a reply line; blank lines yield `None`
    pub fn parse(&self, line: &str) -> Option<MarlinResponse> {
        let line = line.trim();

        if line.is_empty() {
            return None;
        }

        if line
            .chars()
            .any(|c| c == char::REPLACEMENT_CHARACTER || (c.is_control() && c != '\t'))
        {
            return Some(MarlinResponse::Garbled(line.to_string()));
        }

        // "ok" may carry trailing data such as temperatures
        if line == "ok" || line.starts_with("ok ") {
            return Some(MarlinResponse::Ok);
        }
        if line.starts_with("ok") {
            return Some(MarlinResponse::Garbled(line.to_string()));
        }

        let lower = line.to_ascii_lowercase();
        if let Some(msg) = lower.strip_prefix("error:") {
            let start = line.len() - msg.len();
            return Some(MarlinResponse::Error(line[start..].trim().to_string()));
        }

        if lower.starts_with("echo:busy") || lower.starts_with("busy:") {
            return Some(MarlinResponse::Busy);
        }

        if line.starts_with("X:") {
            if let Some(position) = parse_position(line) {
                return Some(MarlinResponse::Position(position));
            }
        }

        Some(MarlinResponse::Message(line.to_string()))
    }
}

/// Parse `X:10.00 Y:0.00 Z:50.00 E:0.00 Count ...`
///
/// Only the logical coordinates before `Count` are used.
pub fn parse_position(line: &str) -> Option<Point3> {
    let logical = line.split("Count").next().unwrap_or(line);
    let mut x = None;
    let mut y = None;
    let mut z = None;
    for token in logical.split_whitespace() {
        let Some((axis, value)) = token.split_once(':') else {
            continue;
        };
        let value = value.parse::<f64>().ok();
        match axis {
            "X" => x = value,
            "Y" => y = value,
            "Z" => z = value,
            _ => {}
        }
    }
    Some(Point3::new(x?, y?, z?))
}
