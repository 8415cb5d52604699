//! Search-term expansion.
//!
//! Broadens a literal search term into translated/synonymous variants via one
//! secondary model call. Expansion failure must never block a search: every
//! failure path degrades to the original term alone.

use crate::{ChatModel, CompletionRequest};
use atelier_core::ChatMessage;

/// Hard cap on variants per term; anything past this adds noise, not recall.
const MAX_VARIANTS: usize = 8;

const EXPANSION_SYSTEM_PROMPT: &str = "You expand inventory search terms. \
Given a term (possibly Chinese), reply with ONLY a JSON array of strings: \
the term's English and Chinese translations, common synonyms, and \
singular/plural forms. No commentary, no code fences. At most 6 entries.";

/// Expand a raw search term into an ordered, deduplicated variant set.
///
/// The returned vector always starts with the original term. With no model
/// configured, or when the call or parse fails, the result is exactly the
/// original term.
pub async fn expand_search_term(
    model: Option<&dyn ChatModel>,
    term: &str,
    model_id: Option<&str>,
) -> Vec<String> {
    let term = term.trim();
    if term.is_empty() {
        return Vec::new();
    }

    let Some(model) = model else {
        return vec![term.to_string()];
    };

    let request = CompletionRequest::new(vec![ChatMessage::user(term)])
        .with_system(EXPANSION_SYSTEM_PROMPT)
        .with_model_id(model_id.unwrap_or_else(|| model.default_model_id()));

    let variants = match model.complete(&request).await {
        Ok(response) => response
            .text
            .as_deref()
            .and_then(parse_variant_array)
            .unwrap_or_default(),
        Err(err) => {
            tracing::warn!(term = %term, error = %err, "search-term expansion failed, using literal term");
            Vec::new()
        }
    };

    let mut out = vec![term.to_string()];
    for variant in variants {
        let variant = variant.trim();
        if variant.is_empty() {
            continue;
        }
        if out.iter().any(|existing| existing.eq_ignore_ascii_case(variant)) {
            continue;
        }
        out.push(variant.to_string());
        if out.len() >= MAX_VARIANTS {
            break;
        }
    }
    out
}

/// Pull a JSON string array out of model output, tolerating stray prose
/// around the brackets.
fn parse_variant_array(text: &str) -> Option<Vec<String>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(&text[start..=end]).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect(),
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompletionResponse, MockChatModel};

    #[tokio::test]
    async fn test_expansion_prepends_original_term() {
        let mock = MockChatModel::new(vec![CompletionResponse::text_only(
            "[\"titanium\", \"titanium white\", \"钛白\"]",
        )]);
        let variants = expand_search_term(Some(&mock), "钛", None).await;
        assert_eq!(variants[0], "钛");
        assert!(variants.contains(&"titanium".to_string()));
        assert!(variants.contains(&"钛白".to_string()));
    }

    #[tokio::test]
    async fn test_expansion_tolerates_surrounding_prose() {
        let mock = MockChatModel::new(vec![CompletionResponse::text_only(
            "Here you go:\n[\"cloud\", \"clouds\"]\nHope that helps!",
        )]);
        let variants = expand_search_term(Some(&mock), "cloud", None).await;
        assert_eq!(variants, vec!["cloud", "clouds"]);
    }

    #[tokio::test]
    async fn test_expansion_dedupes_case_insensitively() {
        let mock = MockChatModel::new(vec![CompletionResponse::text_only(
            "[\"Cloud\", \"CLOUD\", \"nube\"]",
        )]);
        let variants = expand_search_term(Some(&mock), "cloud", None).await;
        assert_eq!(variants, vec!["cloud", "nube"]);
    }

    #[tokio::test]
    async fn test_expansion_degrades_on_model_failure() {
        let mock = MockChatModel::failing();
        let variants = expand_search_term(Some(&mock), "钛", None).await;
        assert_eq!(variants, vec!["钛"]);
    }

    #[tokio::test]
    async fn test_expansion_degrades_on_garbage_output() {
        let mock = MockChatModel::new(vec![CompletionResponse::text_only("no array here")]);
        let variants = expand_search_term(Some(&mock), "cloud", None).await;
        assert_eq!(variants, vec!["cloud"]);
    }

    #[tokio::test]
    async fn test_expansion_without_model_is_literal() {
        let variants = expand_search_term(None, "  cloud  ", None).await;
        assert_eq!(variants, vec!["cloud"]);
    }

    #[tokio::test]
    async fn test_empty_term_expands_to_nothing() {
        let variants = expand_search_term(None, "   ", None).await;
        assert!(variants.is_empty());
    }

    #[tokio::test]
    async fn test_model_id_override_is_forwarded() {
        let mock = MockChatModel::new(vec![CompletionResponse::text_only("[]")]);
        expand_search_term(Some(&mock), "cloud", Some("fast-model")).await;
        let requests = mock.requests();
        assert_eq!(requests[0].model_id, "fast-model");
    }
}
