//! Best-effort extraction of structured records from free-form model
//! output.
//!
//! Model text is not guaranteed well-formed: the JSON we want is usually
//! inside a fenced code block, sometimes with bare keys, trailing commas,
//! or smart quotes. Extraction is total — it never errors — so callers
//! implement their own fallback per use site.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("fence regex"))
}

fn bare_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#).expect("bare key regex")
    })
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("trailing comma regex"))
}

/// Return the first fenced region of `raw` that parses as JSON, after a
/// tolerant repair pass. `None` when no fenced region exists or none
/// parses.
pub fn extract_json(raw: &str) -> Option<Value> {
    for capture in fence_re().captures_iter(raw) {
        let candidate = capture[1].trim();

        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Some(value);
        }

        let repaired = repair_json(candidate);
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            return Some(value);
        }
    }
    None
}

/// Fix the malformations models most commonly produce. Only applied when
/// a direct parse has already failed, so valid JSON is never altered.
fn repair_json(text: &str) -> String {
    let straightened = text
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    let keyed = bare_key_re().replace_all(&straightened, "$1\"$2\":");
    trailing_comma_re().replace_all(&keyed, "$1").into_owned()
}

/// Pull a named field out of an extracted record as text. Non-string
/// values (the model occasionally emits a list where a label belongs)
/// are rendered as compact JSON rather than dropped.
pub fn field_as_text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_fenced_json() {
        let raw = "Here you go:\n```json\n{\"prediction\": \"PIN_RESET\", \"explanation\": \"x\"}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["prediction"], "PIN_RESET");
    }

    #[test]
    fn test_extract_unlabeled_fence() {
        let raw = "```\n{\"a\": 1}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_no_fence_returns_none() {
        assert!(extract_json("{\"a\": 1}").is_none());
        assert!(extract_json("no json here at all").is_none());
        assert!(extract_json("").is_none());
    }

    #[test]
    fn test_first_valid_block_wins() {
        let raw = "```json\nnot json at all\n```\nsome prose\n```json\n{\"b\": 2}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["b"], 2);
    }

    #[test]
    fn test_all_blocks_invalid_returns_none() {
        let raw = "```json\n<<<garbage>>>\n```\n```\nalso garbage {{{\n```";
        assert!(extract_json(raw).is_none());
    }

    #[test]
    fn test_repairs_trailing_comma() {
        let raw = "```json\n{\"a\": 1, \"b\": [1, 2,],}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["b"][1], 2);
    }

    #[test]
    fn test_repairs_bare_keys() {
        let raw = "```json\n{prediction: \"X\", explanation: \"y\"}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["prediction"], "X");
    }

    #[test]
    fn test_repairs_smart_quotes() {
        let raw = "```json\n{\u{201c}a\u{201d}: \u{201c}b\u{201d}}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["a"], "b");
    }

    #[test]
    fn test_valid_json_not_altered_by_repair() {
        // A string value that looks like a repair target must survive.
        let raw = "```json\n{\"note\": \"keep this, ] comma\"}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["note"], "keep this, ] comma");
    }

    #[test]
    fn test_field_as_text_stringifies_non_strings() {
        let value = serde_json::json!({"prediction": ["A", "B"], "explanation": "e"});
        assert_eq!(
            field_as_text(&value, "prediction").unwrap(),
            "[\"A\",\"B\"]"
        );
        assert_eq!(field_as_text(&value, "explanation").unwrap(), "e");
        assert!(field_as_text(&value, "missing").is_none());
    }
}
