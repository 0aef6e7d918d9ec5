//! LLM-backed structuring of raw utterances into template sections.
//!
//! The structurer asks the model to split one user utterance across the
//! active template's sections and returns a section-keyed patch. It never
//! writes anything itself; the caller merges the patch into the draft.

use std::fmt::Write as _;
use std::sync::Arc;

use quill_core::{DraftData, JournalTemplate};
use thiserror::Error;

use crate::error::LlmError;
use crate::provider::LlmProvider;
use crate::types::{ApiMessage, MessageRequest};

const STRUCTURE_MAX_TOKENS: u32 = 1024;

/// Structuring failure modes. Transport failures must abort the caller's
/// write; malformed output is recoverable with a clarifying reply.
#[derive(Debug, Error)]
pub enum StructureError {
    /// The LLM transport failed; nothing may be persisted.
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] LlmError),

    /// The model answered, but not with a usable JSON object.
    #[error("structuring failed: {0}")]
    Malformed(String),
}

/// A patch produced by one structuring call.
#[derive(Debug, Clone, Default)]
pub struct StructuredPatch {
    /// Section name -> string or list of strings. Keys are canonical
    /// template names where an alias matched; unknown names pass through.
    pub sections: DraftData,
    /// Keys that did not match any template section or alias.
    pub unknown_sections: Vec<String>,
}

impl StructuredPatch {
    /// Whether the input carried no structurable content. Legal outcome.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Classifies raw text into template sections via the LLM.
#[derive(Clone)]
pub struct Structurer {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl Structurer {
    pub fn new(provider: Arc<dyn LlmProvider>, model: String) -> Self {
        Self { provider, model }
    }

    /// Split `raw_text` across the sections of `template`.
    ///
    /// # Errors
    /// `StructureError::Upstream` on transport failure, `Malformed` when the
    /// model's reply is not a JSON object of strings/lists.
    pub async fn structure(
        &self,
        raw_text: &str,
        template: &JournalTemplate,
    ) -> Result<StructuredPatch, StructureError> {
        let trimmed = raw_text.trim();
        if trimmed.is_empty() {
            return Ok(StructuredPatch::default());
        }

        let request = MessageRequest {
            model: self.model.clone(),
            messages: vec![ApiMessage::user(structure_prompt(trimmed, template))],
            system: None,
            max_tokens: STRUCTURE_MAX_TOKENS,
            tools: None,
        };
        let response = self.provider.complete(request).await?;
        let content = response.text();

        let stripped = strip_code_fence(&content);
        let value: serde_json::Value = serde_json::from_str(stripped).map_err(|e| {
            StructureError::Malformed(format!(
                "not JSON: {e} - content: {}",
                content.get(..300).unwrap_or(&content)
            ))
        })?;
        let serde_json::Value::Object(raw_sections) = value else {
            return Err(StructureError::Malformed(format!(
                "expected a JSON object, got: {value}"
            )));
        };

        Ok(resolve_patch(raw_sections, template))
    }
}

/// Rewrite alias keys to canonical section names and flag unknown ones.
/// Values other than strings and lists of strings are stringified; nulls
/// and blank strings are dropped.
fn resolve_patch(raw: DraftData, template: &JournalTemplate) -> StructuredPatch {
    let mut patch = StructuredPatch::default();
    for (key, value) in raw {
        let canonical = match template.resolve(&key) {
            Some(section) => section.name.clone(),
            None => {
                tracing::debug!(section = %key, "model emitted unknown section");
                patch.unknown_sections.push(key.clone());
                key
            },
        };
        let normalized = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) if s.trim().is_empty() => continue,
            v @ (serde_json::Value::String(_) | serde_json::Value::Array(_)) => v,
            other => serde_json::Value::String(other.to_string()),
        };
        patch.sections.insert(canonical, normalized);
    }
    patch
}

fn structure_prompt(raw_text: &str, template: &JournalTemplate) -> String {
    let mut catalogue = String::new();
    for section in &template.sections {
        let _ = write!(catalogue, "- \"{}\": {}", section.name, section.description);
        if !section.aliases.is_empty() {
            let _ = write!(catalogue, " (also called: {})", section.aliases.join(", "));
        }
        if let Some(example) = section.examples.first() {
            let _ = write!(catalogue, " e.g. \"{example}\"");
        }
        catalogue.push('\n');
    }

    format!(
        r#"You are a journal content router. Split the user's text across the journal sections below.

SECTIONS:
{catalogue}
RULES:
1. Use section names exactly as written above as JSON keys.
2. A value is a string, or a list of strings when the text carries several distinct items for one section.
3. Copy the user's wording; do not summarize, embellish, or invent content.
4. One piece of text may belong to several sections when it genuinely covers them.
5. Omit sections the text says nothing about. If nothing fits anywhere, return {{}}.

Return ONLY a JSON object. No commentary.

USER TEXT:
{raw_text}"#
    )
}

/// Strip a surrounding markdown code fence, with or without a language tag.
#[must_use]
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line if present.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").map_or(trimmed, str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::SectionDefinition;

    fn template() -> JournalTemplate {
        JournalTemplate {
            name: "t".into(),
            sections: vec![
                SectionDefinition::new("Thoughts & Feelings", "emotions")
                    .with_aliases(["Emotional State"]),
                SectionDefinition::new("Trading Journal", "trades"),
            ],
        }
    }

    #[test]
    fn strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn alias_keys_rewritten_to_canonical() {
        let raw = serde_json::json!({"Emotional State": "anxious"});
        let serde_json::Value::Object(raw) = raw else { unreachable!() };
        let patch = resolve_patch(raw, &template());
        assert!(patch.sections.contains_key("Thoughts & Feelings"));
        assert!(patch.unknown_sections.is_empty());
    }

    #[test]
    fn unknown_keys_kept_and_flagged() {
        let raw = serde_json::json!({"Recipes": "pasta"});
        let serde_json::Value::Object(raw) = raw else { unreachable!() };
        let patch = resolve_patch(raw, &template());
        assert_eq!(patch.sections["Recipes"], "pasta");
        assert_eq!(patch.unknown_sections, vec!["Recipes"]);
    }

    #[test]
    fn nulls_and_blanks_dropped() {
        let raw = serde_json::json!({"Trading Journal": null, "Thoughts & Feelings": "  "});
        let serde_json::Value::Object(raw) = raw else { unreachable!() };
        let patch = resolve_patch(raw, &template());
        assert!(patch.is_empty());
    }

    #[test]
    fn scalar_values_stringified() {
        let raw = serde_json::json!({"Trading Journal": 150});
        let serde_json::Value::Object(raw) = raw else { unreachable!() };
        let patch = resolve_patch(raw, &template());
        assert_eq!(patch.sections["Trading Journal"], "150");
    }

    #[test]
    fn prompt_lists_every_section_and_alias() {
        let prompt = structure_prompt("bought AAPL", &template());
        assert!(prompt.contains("Thoughts & Feelings"));
        assert!(prompt.contains("Emotional State"));
        assert!(prompt.contains("Trading Journal"));
        assert!(prompt.contains("bought AAPL"));
    }

    mod with_mock_provider {
        use super::*;
        use crate::mock::{MockProvider, MockReply};
        use std::sync::Arc;

        fn structurer(replies: Vec<MockReply>) -> Structurer {
            Structurer::new(Arc::new(MockProvider::with_replies(replies)), "mock".into())
        }

        #[tokio::test]
        async fn model_json_lands_in_patch() {
            let s = structurer(vec![MockReply::Text(
                r#"{"Trading Journal": "bought AAPL at 150"}"#.into(),
            )]);
            let patch = s.structure("bought AAPL at 150", &template()).await.unwrap();
            assert_eq!(patch.sections["Trading Journal"], "bought AAPL at 150");
        }

        #[tokio::test]
        async fn fenced_json_is_accepted() {
            let s = structurer(vec![MockReply::Text(
                "```json\n{\"Thoughts & Feelings\": \"anxious\"}\n```".into(),
            )]);
            let patch = s.structure("felt anxious", &template()).await.unwrap();
            assert_eq!(patch.sections["Thoughts & Feelings"], "anxious");
        }

        #[tokio::test]
        async fn empty_object_is_a_legal_empty_patch() {
            let s = structurer(vec![MockReply::Text("{}".into())]);
            let patch = s.structure("hmm", &template()).await.unwrap();
            assert!(patch.is_empty());
        }

        #[tokio::test]
        async fn blank_input_never_calls_the_model() {
            let provider = Arc::new(MockProvider::failing());
            let s = Structurer::new(provider, "mock".into());
            let patch = s.structure("   ", &template()).await.unwrap();
            assert!(patch.is_empty());
        }

        #[tokio::test]
        async fn non_json_reply_is_malformed() {
            let s = structurer(vec![MockReply::Text("sorry, I cannot do that".into())]);
            let err = s.structure("text", &template()).await.unwrap_err();
            assert!(matches!(err, StructureError::Malformed(_)));
        }

        #[tokio::test]
        async fn json_array_reply_is_malformed() {
            let s = structurer(vec![MockReply::Text(r#"["a", "b"]"#.into())]);
            let err = s.structure("text", &template()).await.unwrap_err();
            assert!(matches!(err, StructureError::Malformed(_)));
        }

        #[tokio::test]
        async fn transport_failure_is_upstream() {
            let s = Structurer::new(Arc::new(MockProvider::failing()), "mock".into());
            let err = s.structure("text", &template()).await.unwrap_err();
            assert!(matches!(err, StructureError::Upstream(_)));
        }
    }
}
