//! Prompt assembly: substitute a section's aggregated text into its JSON
//! prompt template.
//!
//! The template is serialized, the single `:replace_text` token replaced
//! verbatim, and the result parsed back. Text that breaks the JSON
//! structure (an unescaped quote, a raw newline) surfaces as a
//! [`TemplateError`] rather than a silently broken prompt, since the
//! output feeds automated downstream processing.

use serde_json::Value;
use thiserror::Error;

/// Substitution token; each template contains exactly one.
pub const PLACEHOLDER: &str = ":replace_text";

/// A section template failed to re-parse after substitution.
#[derive(Debug, Error)]
#[error("section '{section}' template failed to re-parse after substitution: {source}")]
pub struct TemplateError {
    pub section: String,
    #[source]
    pub source: serde_json::Error,
}

/// Substitute `rendered_text` into `template` and parse the result.
pub fn assemble_prompt(
    section_key: &str,
    template: &Value,
    rendered_text: &str,
) -> Result<Value, TemplateError> {
    let substituted = template.to_string().replace(PLACEHOLDER, rendered_text);
    serde_json::from_str(&substituted).map_err(|source| TemplateError {
        section: section_key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_the_placeholder() {
        let template = json!({
            "system": "You are a clinical scribe.",
            "user": "Summarize: :replace_text"
        });
        let prompt = assemble_prompt("reason", &template, "fever. cough").unwrap();
        assert_eq!(prompt["user"], "Summarize: fever. cough");
        assert_eq!(prompt["system"], "You are a clinical scribe.");
    }

    #[test]
    fn empty_text_still_parses() {
        let template = json!({ "user": ":replace_text" });
        let prompt = assemble_prompt("diagnosis", &template, "").unwrap();
        assert_eq!(prompt["user"], "");
    }

    #[test]
    fn unescaped_quote_breaks_the_template() {
        let template = json!({ "user": ":replace_text" });
        let err = assemble_prompt("reason", &template, "said \"stable\"").unwrap_err();
        assert_eq!(err.section, "reason");
    }

    #[test]
    fn substitution_reaches_nested_values() {
        let template = json!({
            "messages": [
                { "role": "system", "content": "scribe" },
                { "role": "user", "content": ":replace_text" }
            ]
        });
        let prompt = assemble_prompt("procedures", &template, "appendectomy").unwrap();
        assert_eq!(prompt["messages"][1]["content"], "appendectomy");
    }
}
