// Analyzer response parsing
//
// Responses are free text expected to contain labelled lines:
//   Confidence: [percent]
//   Reasoning: [text]

use serde::Serialize;

/// Structured view of one analyzer response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    /// Percent likelihood, if the response carried a readable one
    pub confidence: Option<f64>,
    /// Reasoning line, if present
    pub reasoning: Option<String>,
    /// Raw response text
    pub response: String,
}

impl Verdict {
    /// Extract confidence and reasoning from a response
    pub fn from_response(response: impl Into<String>) -> Self {
        let response = response.into();
        let confidence = read_value_for_label("Confidence", &response).and_then(parse_percent);
        let reasoning = read_value_for_label("Reasoning", &response).map(str::to_string);
        Self {
            confidence,
            reasoning,
            response,
        }
    }
}

/// Text following the first `label` occurrence, up to the end of that line
///
/// The single character right after the label (normally `:`) is skipped and
/// the value is trimmed.
pub fn read_value_for_label<'a>(label: &str, text: &'a str) -> Option<&'a str> {
    let start = text.find(label)? + label.len();
    let rest = &text[start..];
    let rest = rest
        .char_indices()
        .nth(1)
        .map_or("", |(offset, _)| &rest[offset..]);
    let value = rest.split('\n').next().unwrap_or_default();
    Some(value.trim())
}

/// Leading number of the text before the first `%`
pub fn parse_percent(text: &str) -> Option<f64> {
    let end = text.find('%')?;
    leading_number(&text[..end])
}

/// Longest `[+-]digits[.digits]` prefix after leading whitespace
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (i, c) in text.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if !seen_digit {
        return None;
    }
    text[..end].trim_end_matches('.').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = "Confidence: 85%\nReasoning: Key material is posted to an external URL.\n";

    #[test]
    fn test_read_value_for_label() {
        assert_eq!(read_value_for_label("Confidence", RESPONSE), Some("85%"));
        assert_eq!(
            read_value_for_label("Reasoning", RESPONSE),
            Some("Key material is posted to an external URL.")
        );
        assert_eq!(read_value_for_label("Verdict", RESPONSE), None);
    }

    #[test]
    fn test_read_value_at_end_of_text() {
        assert_eq!(read_value_for_label("Reasoning", "Reasoning: none"), Some("none"));
        assert_eq!(read_value_for_label("Reasoning", "Reasoning"), Some(""));
    }

    #[test]
    fn test_read_value_skips_one_character_after_label() {
        assert_eq!(read_value_for_label("Confidence", "Confidence=12%"), Some("12%"));
        assert_eq!(read_value_for_label("Confidence", "Confidence→12%"), Some("12%"));
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("85%"), Some(85.0));
        assert_eq!(parse_percent(" 12.5 %"), Some(12.5));
        assert_eq!(parse_percent("0%"), Some(0.0));
        assert_eq!(parse_percent("85"), None);
        assert_eq!(parse_percent("about 80%"), None);
        assert_eq!(parse_percent("40-60%"), Some(40.0));
    }

    #[test]
    fn test_verdict_from_response() {
        let verdict = Verdict::from_response(RESPONSE);
        assert_eq!(verdict.confidence, Some(85.0));
        assert_eq!(
            verdict.reasoning.as_deref(),
            Some("Key material is posted to an external URL.")
        );
        assert_eq!(verdict.response, RESPONSE);
    }

    #[test]
    fn test_verdict_without_labels() {
        let verdict = Verdict::from_response("I cannot tell.");
        assert_eq!(verdict.confidence, None);
        assert_eq!(verdict.reasoning, None);
    }
}
