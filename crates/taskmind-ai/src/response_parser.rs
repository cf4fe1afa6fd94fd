//! Extraction of JSON payloads from free-form model replies.
//!
//! Models wrap their JSON in prose or markdown fences. The parser finds the
//! first bracketed region whose brackets balance (ignoring brackets inside
//! string literals) and parses exactly that region. There is no attempt to
//! repair malformed JSON beyond cutting out the region.

use serde_json::Value;
use taskmind_core::{Result, TaskMindError};

/// Which bracket pairs may start a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
    Any,
}

impl JsonShape {
    fn opens(self, c: char) -> bool {
        match self {
            JsonShape::Object => c == '{',
            JsonShape::Array => c == '[',
            JsonShape::Any => c == '{' || c == '[',
        }
    }
}

/// Parse the first balanced `{...}` or `[...]` region of `text`.
pub fn parse_json_region(text: &str) -> Result<Value> {
    parse_shape(text, JsonShape::Any)
}

/// Parse the first balanced `{...}` region of `text`.
pub fn parse_json_object(text: &str) -> Result<Value> {
    parse_shape(text, JsonShape::Object)
}

/// Parse the first balanced `[...]` region of `text`.
pub fn parse_json_array(text: &str) -> Result<Value> {
    parse_shape(text, JsonShape::Array)
}

fn parse_shape(text: &str, shape: JsonShape) -> Result<Value> {
    let region = find_balanced_region(text, shape).ok_or_else(|| {
        TaskMindError::Parse(format!(
            "no balanced JSON region in response ({} chars)",
            text.len()
        ))
    })?;

    serde_json::from_str(region)
        .map_err(|e| TaskMindError::Parse(format!("invalid JSON in response: {}", e)))
}

/// Locate the first balanced region starting with an opener allowed by
/// `shape`. Openers whose brackets never balance are skipped.
pub fn find_balanced_region(text: &str, shape: JsonShape) -> Option<&str> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find(|c: char| shape.opens(c)) {
        let start = search_from + offset;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        // Opening brackets are single-byte ASCII.
        search_from = start + 1;
    }

    None
}

/// Byte length of the balanced region at the start of `s`, if it closes.
fn balanced_end(s: &str) -> Option<usize> {
    let mut expected: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => expected.push('}'),
            '[' => expected.push(']'),
            '}' | ']' => {
                if expected.pop() != Some(c) {
                    return None;
                }
                if expected.is_empty() {
                    return Some(idx + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_object_from_noise() {
        let value = parse_json_region("noise {\"a\":1} noise").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn no_brackets_is_parse_error() {
        let err = parse_json_region("I could not analyze this task.").unwrap_err();
        assert!(matches!(err, TaskMindError::Parse(_)));
    }

    #[test]
    fn invalid_region_is_parse_error() {
        let err = parse_json_region("result: {priority: high}").unwrap_err();
        assert!(matches!(err, TaskMindError::Parse(_)));
    }

    #[test]
    fn handles_markdown_fences_and_nesting() {
        let reply = "Sure!\n```json\n{\"priority\": 7, \"tags\": [\"api\", \"auth\"], \"meta\": {\"x\": {}}}\n```\nDone.";
        let value = parse_json_object(reply).unwrap();
        assert_eq!(value["priority"], 7);
        assert_eq!(value["tags"], json!(["api", "auth"]));
    }

    #[test]
    fn brackets_inside_strings_do_not_count() {
        let reply = r#"{"title": "Fix } bracket [bug", "note": "quote \" inside"} trailing }"#;
        let value = parse_json_object(reply).unwrap();
        assert_eq!(value["title"], "Fix } bracket [bug");
        assert_eq!(value["note"], "quote \" inside");
    }

    #[test]
    fn first_region_wins_for_any_shape() {
        let value = parse_json_region("[1, 2] then {\"a\": 1}").unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn shape_specific_search_skips_other_brackets() {
        let reply = "Items [see below]: {\"a\": [1]}";
        assert_eq!(parse_json_object(reply).unwrap(), json!({"a": [1]}));

        let reply = "Here you go {not an array} [\"Plan week\", \"Review PRs\"]";
        assert_eq!(
            parse_json_array(reply).unwrap(),
            json!(["Plan week", "Review PRs"])
        );
    }

    #[test]
    fn unbalanced_opener_is_skipped() {
        let reply = "{ broken start ... {\"ok\": true}";
        // The outer brace never closes, so the inner object is the first
        // balanced region.
        assert_eq!(parse_json_object(reply).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn mismatched_closer_is_not_balanced() {
        assert!(find_balanced_region("{]", JsonShape::Any).is_none());
    }
}
