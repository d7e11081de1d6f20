//! External text-transformation interface.
//!
//! One call per WorkUnit, blocking (call from `spawn_blocking` when used from
//! async code), no ordering requirement across calls. The shipped
//! implementation talks to an Ollama-style HTTP endpoint; tests substitute
//! their own `UnitTransformer`.

mod parse;
pub mod service;

pub use parse::{fallback_unit, parse_reply};
pub use service::ServiceTransformer;

use thiserror::Error;

/// Structural kind the service assigned to a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanKind {
    Header,
    List,
    #[default]
    Paragraph,
}

impl SpanKind {
    pub fn from_str(s: &str) -> Self {
        match s {
            "header" => SpanKind::Header,
            "list" => SpanKind::List,
            _ => SpanKind::Paragraph,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
    Italic,
}

impl FontStyle {
    pub fn from_str(s: &str) -> Self {
        match s {
            "bold" => FontStyle::Bold,
            "italic" => FontStyle::Italic,
            _ => FontStyle::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    Left,
    Center,
    Right,
    #[default]
    Justify,
}

impl Alignment {
    pub fn from_str(s: &str) -> Self {
        match s {
            "left" => Alignment::Left,
            "center" => Alignment::Center,
            "right" => Alignment::Right,
            _ => Alignment::Justify,
        }
    }
}

/// Transformed payload plus style hints for one span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedUnit {
    pub text: String,
    pub kind: SpanKind,
    pub font_style: FontStyle,
    pub font_size: u32,
    pub alignment: Alignment,
}

/// Error from one transformation call. Recorded in the unit's WorkResult;
/// never aborts the batch.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    #[error("service timeout")]
    Timeout,
    #[error("service connection: {0}")]
    Connection(String),
    #[error("service returned HTTP {0}")]
    Http(u32),
    #[error("service: {0}")]
    Other(String),
}

/// External transformation function, invoked once per WorkUnit.
pub trait UnitTransformer: Send + Sync {
    /// Transform one span of text. Blocking.
    fn transform_unit(&self, text: &str) -> Result<FormattedUnit, TransformError>;

    /// Cheap reachability check run before fanning a job out, so a
    /// whole-service outage surfaces as a job-level error instead of N unit
    /// failures. Default: always reachable.
    fn probe(&self) -> Result<(), TransformError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_kind_from_str_defaults_to_paragraph() {
        assert_eq!(SpanKind::from_str("header"), SpanKind::Header);
        assert_eq!(SpanKind::from_str("list"), SpanKind::List);
        assert_eq!(SpanKind::from_str("paragraph"), SpanKind::Paragraph);
        assert_eq!(SpanKind::from_str("garbage"), SpanKind::Paragraph);
    }

    #[test]
    fn style_parsers_default_on_unknown() {
        assert_eq!(FontStyle::from_str("bold"), FontStyle::Bold);
        assert_eq!(FontStyle::from_str("??"), FontStyle::Normal);
        assert_eq!(Alignment::from_str("center"), Alignment::Center);
        assert_eq!(Alignment::from_str("??"), Alignment::Justify);
    }
}
