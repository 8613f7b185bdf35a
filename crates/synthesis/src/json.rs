//! Defensive extraction of a JSON object from model output that may wrap it
//! in prose or code fences.

/// Find the first balanced top-level `{...}` substring in `raw`. A fenced
/// code block is searched first so prose outside the fence cannot shadow it.
pub fn extract_json_object(raw: &str) -> Option<String> {
    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            if let Some(block) = balanced_object(&after_lang[..end]) {
                return Some(block);
            }
        }
    }

    balanced_object(raw)
}

/// The first `{` through its matching `}`, ignoring everything around it.
fn balanced_object(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let mut depth = 0i32;
    for (idx, ch) in raw[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(raw[start..start + idx + ch.len_utf8()].to_string());
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

    #[test]
    fn test_plain_object_passes_through() {
        let raw = r#"{"a": 1}"#;
        assert_eq!(extract_json_object(raw).unwrap(), raw);
    }

    #[test]
    fn test_leading_object_with_trailing_prose_is_isolated() {
        let raw = "{\"a\": 1}\nHope that helps!";
        assert_eq!(extract_json_object(raw).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_object_inside_code_fence() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nHope that helps.";
        assert_eq!(extract_json_object(raw).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let raw = "Based on the data, {\"a\": {\"b\": 2}} is my answer.";
        assert_eq!(extract_json_object(raw).unwrap(), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_no_object_yields_none() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("unbalanced { brace").is_none());
    }
}
