//! Cleaning and validation of the code model's raw output.

use serde_json::Value;

use zflow_types::api::GeneratedCode;
use zflow_types::models::{FileEntry, FileMap};

use crate::AiError;

/// Trim the text and drop a surrounding markdown fence
/// (```` ```json ```` or ```` ``` ```` at the start, ```` ``` ```` at the end).
/// Unfenced text is returned trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();

    let inner = match trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    {
        Some(rest) => rest.trim_start(),
        None => return trimmed,
    };

    match inner.strip_suffix("```") {
        Some(body) => body.trim_end(),
        None => inner,
    }
}

/// Parse the model's text into a validated file map.
///
/// The cleaned text must be a JSON object whose `files` member maps each path
/// to an object carrying a string `code`. Any other top-level members are
/// kept in [`GeneratedCode::extra`].
pub fn parse_generated_code(raw: &str) -> Result<GeneratedCode, AiError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;

    let Value::Object(mut object) = value else {
        return Err(AiError::Schema("expected a JSON object".into()));
    };

    let files = match object.remove("files") {
        Some(Value::Object(files)) => files,
        Some(_) => return Err(AiError::Schema("`files` must be an object".into())),
        None => return Err(AiError::Schema("missing `files`".into())),
    };

    let mut map = FileMap::new();
    for (path, entry) in files {
        let code = entry
            .get("code")
            .and_then(Value::as_str)
            .ok_or_else(|| AiError::Schema(format!("file `{}` has no string `code`", path)))?;
        map.insert(path, FileEntry::new(code));
    }

    Ok(GeneratedCode {
        files: map,
        extra: object,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
        let parsed: Value = serde_json::from_str(strip_code_fence(raw)).unwrap();
        assert_eq!(parsed["a"], 1);
    }

    #[test]
    fn strips_bare_fence_and_outer_whitespace() {
        assert_eq!(strip_code_fence("  ```\n[1, 2]\n```  \n"), "[1, 2]");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fence("  {\"a\": \"```\"}  "), "{\"a\": \"```\"}");
    }

    #[test]
    fn fence_without_closing_marker() {
        assert_eq!(strip_code_fence("```json\n{}"), "{}");
    }

    #[test]
    fn parses_files_and_keeps_extra_members() {
        let raw = r#"```json
        {
            "projectTitle": "Todo",
            "explanation": "A todo app",
            "files": {
                "/App.js": { "code": "export default function App() {}" },
                "/components/List.js": { "code": "" }
            },
            "generatedFiles": ["/App.js", "/components/List.js"]
        }
        ```"#;

        let generated = parse_generated_code(raw).unwrap();
        assert_eq!(generated.files.len(), 2);
        assert_eq!(generated.files["/App.js"].code, "export default function App() {}");
        assert_eq!(generated.extra["projectTitle"], "Todo");
        assert!(!generated.extra.contains_key("files"));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = parse_generated_code("```json\nnot json\n```").unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
        assert!(err.is_malformed_output());
    }

    #[test]
    fn wrong_shape_is_a_schema_error() {
        for raw in [
            "[]",
            r#"{"explanation": "no files"}"#,
            r#"{"files": ["/App.js"]}"#,
            r#"{"files": {"/App.js": {"content": "x"}}}"#,
            r#"{"files": {"/App.js": {"code": 5}}}"#,
        ] {
            let err = parse_generated_code(raw).unwrap_err();
            assert!(matches!(err, AiError::Schema(_)), "{} gave {:?}", raw, err);
        }
    }
}
