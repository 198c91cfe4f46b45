use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::types::AiVerdict;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```(?:json)?").expect("code fence pattern is valid"));

/// Removes Markdown code-fence markers anywhere in the reply.
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// Strict parse of the model reply. Prose around the object is not tolerated.
pub fn parse_verdict(raw: &str) -> Result<AiVerdict, serde_json::Error> {
    serde_json::from_str::<AiVerdict>(&strip_code_fences(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{"name":"Keanu Reeves","reason":"Same jawline","funny_comment":"Whoa."}"#;

    #[test]
    fn fenced_and_plain_replies_parse_identically() {
        let fenced = format!("```json\n{PLAIN}\n```");
        let bare_fence = format!("```\n{PLAIN}\n```");
        let expected = parse_verdict(PLAIN).unwrap();
        assert_eq!(parse_verdict(&fenced).unwrap(), expected);
        assert_eq!(parse_verdict(&bare_fence).unwrap(), expected);
        assert_eq!(expected.name, "Keanu Reeves");
        assert_eq!(expected.funny_comment, "Whoa.");
    }

    #[test]
    fn uppercase_fence_tag_is_stripped() {
        assert_eq!(strip_code_fences("  ```JSON\n{}\n```  "), "{}");
    }

    #[test]
    fn non_json_reply_fails() {
        assert!(parse_verdict("I think this is Tom Hanks!").is_err());
        assert!(parse_verdict("```json\n{\"name\": \"Tom\",\n```").is_err());
        assert!(parse_verdict("").is_err());
    }

    #[test]
    fn prose_around_json_is_rejected() {
        assert!(parse_verdict(&format!("Sure! {PLAIN}")).is_err());
    }

    #[test]
    fn every_field_must_be_a_string() {
        assert!(parse_verdict(r#"{"name":"Tom","reason":"Nose"}"#).is_err());
        assert!(parse_verdict(r#"{"name":"Tom","reason":"Nose","funny_comment":7}"#).is_err());
        assert!(parse_verdict(r#"{"name":null,"reason":"Nose","funny_comment":"Hi"}"#).is_err());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let verdict = parse_verdict(
            r#"{"name":"Tom","reason":"Nose","funny_comment":"Hi","confidence":0.4}"#,
        )
        .unwrap();
        assert_eq!(verdict.reason, "Nose");
    }
}
