//! Parse the model's reply into a FormattedUnit, with heuristic fallback.
//!
//! The service replies with free text that should contain one JSON object
//! (`formatted_text`, `formatting_type`, `font_style`, `font_size`,
//! `alignment`). Models wrap it in prose often enough that we extract the
//! outermost braces before parsing, and fall back to heuristic styling when
//! no usable object is found.

use super::{Alignment, FontStyle, FormattedUnit, SpanKind};

/// Extract the outermost `{...}` object from a free-text reply.
fn extract_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&reply[start..=end])
}

/// Parse a model reply for the given original span. Unparseable replies fall
/// back to heuristic styling of the original text; this never fails.
pub fn parse_reply(reply: &str, original: &str) -> FormattedUnit {
    let Some(json) = extract_json(reply) else {
        tracing::debug!("no JSON object in service reply, using fallback styling");
        return fallback_unit(original);
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(json) else {
        tracing::debug!("service reply JSON did not parse, using fallback styling");
        return fallback_unit(original);
    };

    let text = value
        .get("formatted_text")
        .and_then(|v| v.as_str())
        .unwrap_or(original)
        .to_string();
    let kind = value
        .get("formatting_type")
        .and_then(|v| v.as_str())
        .map(SpanKind::from_str)
        .unwrap_or_default();
    let font_style = value
        .get("font_style")
        .and_then(|v| v.as_str())
        .map(FontStyle::from_str)
        .unwrap_or_default();
    // font_size arrives as a number or a numeric string depending on the model.
    let font_size = match value.get("font_size") {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(14) as u32,
        Some(serde_json::Value::String(s)) => s.parse().unwrap_or(14),
        _ => 14,
    };
    let alignment = value
        .get("alignment")
        .and_then(|v| v.as_str())
        .map(Alignment::from_str)
        .unwrap_or_default();

    FormattedUnit {
        text,
        kind,
        font_style,
        font_size,
        alignment,
    }
}

/// Heuristic styling used when the service reply is unusable: the span still
/// succeeds, carrying its original text.
pub fn fallback_unit(original: &str) -> FormattedUnit {
    let trimmed = original.trim();
    let looks_like_header = !trimmed.is_empty()
        && trimmed.chars().count() < 100
        && trimmed == trimmed.to_uppercase()
        && trimmed.chars().any(|c| c.is_alphabetic());
    let looks_like_list = trimmed.starts_with('-')
        || trimmed.starts_with('•')
        || trimmed.starts_with('*')
        || trimmed
            .split_once(|c: char| c == '.' || c == ')')
            .map(|(head, _)| !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false);

    if looks_like_header {
        FormattedUnit {
            text: original.to_string(),
            kind: SpanKind::Header,
            font_style: FontStyle::Bold,
            font_size: 16,
            alignment: Alignment::Center,
        }
    } else if looks_like_list {
        FormattedUnit {
            text: original.to_string(),
            kind: SpanKind::List,
            font_style: FontStyle::Normal,
            font_size: 14,
            alignment: Alignment::Left,
        }
    } else {
        FormattedUnit {
            text: original.to_string(),
            kind: SpanKind::Paragraph,
            font_style: FontStyle::Normal,
            font_size: 14,
            alignment: Alignment::Justify,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_reply() {
        let reply = r#"Here you go:
            {"formatted_text": "Section One", "formatting_type": "header",
             "font_style": "bold", "font_size": 16, "alignment": "center"}"#;
        let unit = parse_reply(reply, "section one");
        assert_eq!(unit.text, "Section One");
        assert_eq!(unit.kind, SpanKind::Header);
        assert_eq!(unit.font_style, FontStyle::Bold);
        assert_eq!(unit.font_size, 16);
        assert_eq!(unit.alignment, Alignment::Center);
    }

    #[test]
    fn font_size_as_string_is_accepted() {
        let reply = r#"{"formatted_text": "x", "font_size": "12"}"#;
        assert_eq!(parse_reply(reply, "x").font_size, 12);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let unit = parse_reply(r#"{"formatted_text": "body"}"#, "body");
        assert_eq!(unit.kind, SpanKind::Paragraph);
        assert_eq!(unit.font_style, FontStyle::Normal);
        assert_eq!(unit.font_size, 14);
        assert_eq!(unit.alignment, Alignment::Justify);
    }

    #[test]
    fn garbage_reply_falls_back_to_original_text() {
        let unit = parse_reply("I cannot help with that.", "the original span");
        assert_eq!(unit.text, "the original span");
        assert_eq!(unit.kind, SpanKind::Paragraph);
    }

    #[test]
    fn fallback_detects_headers_and_lists() {
        assert_eq!(fallback_unit("CHAPTER ONE").kind, SpanKind::Header);
        assert_eq!(fallback_unit("- bullet point").kind, SpanKind::List);
        assert_eq!(fallback_unit("1. numbered item").kind, SpanKind::List);
        assert_eq!(fallback_unit("Plain sentence.").kind, SpanKind::Paragraph);
        assert_eq!(fallback_unit("").kind, SpanKind::Paragraph);
    }
}
