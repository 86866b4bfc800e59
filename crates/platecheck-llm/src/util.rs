//! Shared helpers for LLM response handling

/// Minimum key length to display partial key
const MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY: usize = 8;

/// Number of characters to show at start/end of masked key
const KEY_MASK_VISIBLE_CHARS: usize = 4;

/// Mask API key for safe display in logs
///
/// Shows first 4 and last 4 characters for keys longer than 8 characters,
/// otherwise shows "****" to prevent exposure of short keys.
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY {
        return "****".to_string();
    }
    format!(
        "{}...{}",
        &key[..KEY_MASK_VISIBLE_CHARS],
        &key[key.len() - KEY_MASK_VISIBLE_CHARS..]
    )
}

/// Truncate a string at a char boundary at or below `max_bytes`.
#[must_use]
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Extract the first JSON value from a model reply.
///
/// Models frequently wrap JSON in markdown fences or surround it with prose.
/// Tries, in order: the whole trimmed text, the first fenced code block, and
/// finally the longest brace/bracket-delimited suffix candidate.
#[must_use]
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Direct JSON
    if (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
    {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return Some(value);
        }
    }

    // Fenced code block (```json ... ``` or ``` ... ```)
    if let Some(inner) = extract_fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(inner.trim()) {
            return Some(value);
        }
    }

    // Fallback: scan from the first opening brace/bracket and shrink from
    // the right until a parseable candidate is found.
    let start = trimmed
        .char_indices()
        .find(|(_, c)| *c == '{' || *c == '[')
        .map(|(i, _)| i)?;
    let candidate = &trimmed[start..];
    for (end, c) in candidate.char_indices().rev() {
        if c != '}' && c != ']' {
            continue;
        }
        if let Ok(value) = serde_json::from_str(&candidate[..=end]) {
            return Some(value);
        }
    }
    None
}

fn extract_fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip the optional language tag on the fence line
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("sk-1234567890abcdef"), "sk-1...cdef");
        assert_eq!(mask_api_key("short"), "****");
    }

    #[test]
    fn test_truncate_safe_multibyte() {
        let s = "完了です";
        let t = truncate_safe(s, 4);
        assert!(t.len() <= 4);
        assert!(s.starts_with(t));
    }

    #[test]
    fn test_extract_direct_json() {
        let value = extract_json(r#"{"checkpoints": []}"#).unwrap();
        assert_eq!(value, json!({"checkpoints": []}));
    }

    #[test]
    fn test_extract_fenced_json() {
        let text = "Here you go:\n```json\n{\"results\": [{\"id\": 1}]}\n```\nDone.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["results"][0]["id"], 1);
    }

    #[test]
    fn test_extract_fenced_without_language() {
        let text = "```\n[1, 2, 3]\n```";
        assert_eq!(extract_json(text).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_extract_embedded_json() {
        let text = "The verdict is {\"id\": 2, \"result\": \"pass\"} as requested.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["result"], "pass");
    }

    #[test]
    fn test_extract_none_for_prose() {
        assert!(extract_json("no json here at all").is_none());
        assert!(extract_json("").is_none());
    }
}
