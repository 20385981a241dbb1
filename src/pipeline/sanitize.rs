//! Response sanitisation: recover a JSON object from model text.
//!
//! Even when told "JSON only", models sometimes wrap the payload in a
//! ` ```json ... ``` ` fence or add a sentence before or after it. Two
//! deterministic steps handle that:
//!
//! 1. [`strip_code_fences`] drops one fence line anchored at the start and
//!    one anchored at the end, then trims. Well-formed fenced JSON comes out
//!    byte-for-byte as it was between the fences.
//! 2. [`parse_model_json`] parses the stripped text and, only if that fails,
//!    retries on the outermost `{ ... }` span to tolerate surrounding prose.
//!
//! [`parse_model_object`] adds one rule on top: the payload must be a JSON
//! object. Records are then built from that object's fields.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

static RE_OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*(?:\r?\n|$)").unwrap());

static RE_CLOSING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\r?\n|^)```[ \t]*$").unwrap());

/// Remove a leading and a trailing code-fence line, then trim.
///
/// Only fences anchored at the very start/end of the (trimmed) text are
/// touched; fences in the middle are left alone. Unfenced text is returned
/// trimmed but otherwise unchanged.
pub fn strip_code_fences(input: &str) -> String {
    let s = input.trim();
    let s = match RE_OPENING_FENCE.find(s) {
        Some(m) => &s[m.end()..],
        None => s,
    };
    let s = match RE_CLOSING_FENCE.find(s) {
        Some(m) => &s[..m.start()],
        None => s,
    };
    s.trim().to_string()
}

/// Sanitise model text and deserialize it.
///
/// On failure the error from the first (whole-text) attempt is returned,
/// since it describes the model's actual output best.
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<T>(&cleaned) {
        Ok(value) => Ok(value),
        Err(first) => match outermost_object(&cleaned) {
            Some(span) if span.len() < cleaned.len() => {
                serde_json::from_str::<T>(span).map_err(|_| first)
            }
            _ => Err(first),
        },
    }
}

/// Like [`parse_model_json`], but only a JSON object is accepted.
pub fn parse_model_object<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let object = parse_model_json::<Map<String, Value>>(raw)?;
    serde_json::from_value(Value::Object(object))
}

/// The slice from the first `{` to the last `}`, if any.
fn outermost_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("  {\"a\":1}\n"), "{\"a\":1}");
        assert_eq!(strip_code_fences("no json here"), "no json here");
    }

    #[test]
    fn fenced_payload_is_byte_for_byte() {
        let body = "{\n  \"producer\": \"Château Musar\",\n  \"vintage\": \"2015\"\n}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(strip_code_fences(&fenced), body);
    }

    #[test]
    fn crlf_fences() {
        assert_eq!(strip_code_fences("```JSON\r\n{\"a\":1}\r\n```"), "{\"a\":1}");
    }

    #[test]
    fn inner_fences_are_kept() {
        let text = "before\n```\ncode\n```\nafter";
        assert_eq!(strip_code_fences(text), text);
    }

    #[test]
    fn parses_fenced_json() {
        let v: Value = parse_model_json("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(v, json!({"a": 1}));
    }

    #[test]
    fn tolerates_surrounding_prose() {
        let raw = "Here is the label data:\n{\"producer\": \"Tondonia\"}\nLet me know if you need more.";
        let v: Value = parse_model_json(raw).unwrap();
        assert_eq!(v, json!({"producer": "Tondonia"}));
    }

    #[test]
    fn object_parse_rejects_other_json() {
        assert!(parse_model_object::<Value>("[1, 2]").is_err());
        assert!(parse_model_object::<Value>("\"just a sentence\"").is_err());
        let v: Value = parse_model_object("[{\"producer\": \"Tondonia\"}]").unwrap();
        assert_eq!(v, json!({"producer": "Tondonia"}));
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_model_json::<Value>("I could not read the label, sorry.").is_err());
        assert!(parse_model_json::<Value>("{ broken").is_err());
    }
}
