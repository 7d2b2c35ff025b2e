//! Correction prompts for the self-heal loop.
//!
//! A heal round does not re-ask the original question. It shows the model its
//! own reply, names what was wrong with it, and restates the contract as a
//! field list. Temperature and model follow the original request so the
//! correction stays in-distribution.

use salvage_core::snippet;
use salvage_output::SchemaDef;

/// Build the correction prompt for one self-heal round.
pub(crate) fn correction_prompt(schema: &SchemaDef, errors: &[String], previous: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("Your previous reply could not be used:\n");
    for error in errors.iter().rev().take(3) {
        prompt.push_str("- ");
        prompt.push_str(error);
        prompt.push('\n');
    }
    prompt.push_str("\nReply again with a single strict JSON object containing exactly these fields:\n");
    prompt.push_str(&schema.describe());
    prompt.push_str("\nYour previous reply was:\n");
    prompt.push_str(&snippet(previous));
    prompt.push_str("\n\nReturn only the JSON object. No prose, no code fences.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvage_core::SchemaId;

    #[test]
    fn test_prompt_names_errors_and_fields() {
        let schema = SchemaDef::get(SchemaId::IdeaPitch);
        let prompt = correction_prompt(
            schema,
            &["missing required fields: hook".to_string()],
            r#"{"title": "A"}"#,
        );
        assert!(prompt.contains("missing required fields: hook"));
        assert!(prompt.contains("- hook (string, required, non-empty)"));
        assert!(prompt.contains(r#"{"title": "A"}"#));
        assert!(prompt.contains("Return only the JSON object"));
    }

    #[test]
    fn test_prompt_keeps_only_recent_errors() {
        let schema = SchemaDef::get(SchemaId::DeepDive);
        let errors: Vec<String> = (0..6).map(|i| format!("error {i}")).collect();
        let prompt = correction_prompt(schema, &errors, "{}");
        assert!(prompt.contains("error 5"));
        assert!(!prompt.contains("error 0"));
    }

    #[test]
    fn test_previous_reply_is_truncated() {
        let schema = SchemaDef::get(SchemaId::IdeaPitch);
        let long = "x".repeat(5000);
        let prompt = correction_prompt(schema, &[], &long);
        assert!(prompt.contains("[truncated]"));
        assert!(prompt.len() < 3000);
    }
}
