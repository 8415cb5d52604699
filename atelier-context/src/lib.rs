//! Atelier Context - Conversation Context Management
//!
//! Keeps the message history sent to the language model within a token
//! budget. Two-stage algorithm: first prune stale tool exchanges and empty
//! messages (bounded, single pass), then - if still over budget - drop from
//! the second-oldest position forward, always retaining the first message
//! (task framing) and the newest window (conversational state).

use atelier_core::{ChatMessage, MessageRole};

// ============================================================================
// TOKEN ESTIMATION
// ============================================================================

/// Characters per token for mixed Latin/CJK text. Deliberately conservative:
/// CJK text runs close to one token per character, Latin text closer to
/// four, and inventories here carry both. An approximation, not a law -
/// override it via [`ContextManager::with_chars_per_token`].
pub const DEFAULT_CHARS_PER_TOKEN: f32 = 2.5;

/// Default ceiling for conversation history.
pub const DEFAULT_TOKEN_BUDGET: usize = 8_000;

/// Estimate token count for text with the default divisor.
pub fn estimate_tokens(text: &str) -> usize {
    estimate_tokens_with(text, DEFAULT_CHARS_PER_TOKEN)
}

fn estimate_tokens_with(text: &str, chars_per_token: f32) -> usize {
    if text.is_empty() {
        return 0;
    }
    (text.chars().count() as f32 / chars_per_token).ceil() as usize
}

// ============================================================================
// CONTEXT MANAGER
// ============================================================================

/// Trims a growing message history against a token budget.
#[derive(Debug, Clone)]
pub struct ContextManager {
    token_budget: usize,
    chars_per_token: f32,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_BUDGET)
    }
}

impl ContextManager {
    pub fn new(token_budget: usize) -> Self {
        Self {
            token_budget,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }

    /// Override the character-to-token divisor.
    pub fn with_chars_per_token(mut self, chars_per_token: f32) -> Self {
        self.chars_per_token = chars_per_token.max(0.1);
        self
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget
    }

    /// Estimated tokens for one message, tool payloads included.
    pub fn estimate_message(&self, message: &ChatMessage) -> usize {
        let mut tokens = estimate_tokens_with(&message.content, self.chars_per_token);
        if let Some(ref calls) = message.tool_calls {
            tokens += estimate_tokens_with(&calls.to_string(), self.chars_per_token);
        }
        // Flat overhead per message for role/framing.
        tokens + 4
    }

    /// Estimated tokens for a whole history.
    pub fn estimate_history(&self, messages: &[ChatMessage]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }

    /// Fit a history into the budget.
    ///
    /// Ordering is preserved. The first message of the pruned history and at
    /// least one most-recent message always survive.
    pub fn fit(&self, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let mut messages = prune_stale_tool_exchanges(messages);

        // Drop from the second-oldest position until we fit. Position 0 is
        // the anchor (task framing); the tail is recent conversational state.
        while messages.len() > 2 && self.estimate_history(&messages) > self.token_budget {
            messages.remove(1);
        }
        messages
    }
}

// ============================================================================
// TOOL-EXCHANGE PRUNING
// ============================================================================

/// Drop empty messages, and tool-call/tool-result messages older than the
/// last two user turns. Recent tool exchanges stay: the model may still need
/// them to ground its next step.
fn prune_stale_tool_exchanges(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    // Index of the second-to-last user message; everything from there on
    // counts as the "last two turns".
    let cutoff = messages
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, m)| m.role == MessageRole::User && !m.is_tool_exchange())
        .map(|(i, _)| i)
        .nth(1)
        .unwrap_or(0);

    messages
        .into_iter()
        .enumerate()
        .filter(|(i, m)| !m.is_empty() && (*i >= cutoff || !m.is_tool_exchange()))
        .map(|(_, m)| m)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::ChatMessage;

    fn tool_turn(id: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::assistant_tool_calls(serde_json::json!([{
                "id": id, "name": "search_artworks", "arguments": {"query": "x"}
            }])),
            ChatMessage::tool_result(id, "{\"artworks\": []}"),
        ]
    }

    #[test]
    fn test_estimate_counts_chars_not_bytes() {
        // Six CJK chars, eighteen bytes. 6 / 2.5 rounds up to 3.
        assert_eq!(estimate_tokens("云云云云云云"), 3);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_fit_is_noop_under_budget() {
        let manager = ContextManager::new(10_000);
        let messages = vec![
            ChatMessage::system("framing"),
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi"),
        ];
        assert_eq!(manager.fit(messages.clone()), messages);
    }

    #[test]
    fn test_fit_drops_empty_messages() {
        let manager = ContextManager::new(10_000);
        let messages = vec![
            ChatMessage::system("framing"),
            ChatMessage::assistant("  "),
            ChatMessage::user("hello"),
        ];
        let fitted = manager.fit(messages);
        assert_eq!(fitted.len(), 2);
    }

    #[test]
    fn test_stale_tool_exchanges_pruned_recent_kept() {
        let manager = ContextManager::new(100_000);
        let mut messages = vec![ChatMessage::system("framing")];
        // Old turn with a tool exchange
        messages.push(ChatMessage::user("first question"));
        messages.extend(tool_turn("call_old"));
        messages.push(ChatMessage::assistant("first answer"));
        // Two recent turns, the last with a tool exchange
        messages.push(ChatMessage::user("second question"));
        messages.push(ChatMessage::assistant("second answer"));
        messages.push(ChatMessage::user("third question"));
        messages.extend(tool_turn("call_new"));

        let fitted = manager.fit(messages);
        let as_json = serde_json::to_string(&fitted).unwrap();
        assert!(!as_json.contains("call_old"));
        assert!(as_json.contains("call_new"));
        // Plain conversation survives untouched.
        assert!(as_json.contains("first answer"));
    }

    #[test]
    fn test_fit_protects_anchor_and_newest() {
        let manager = ContextManager::new(60);
        let mut messages = vec![ChatMessage::system("the system framing message")];
        for i in 0..20 {
            messages.push(ChatMessage::user(format!("question number {}", i)));
            messages.push(ChatMessage::assistant(format!("answer number {}", i)));
        }
        let fitted = manager.fit(messages.clone());

        assert_eq!(fitted[0], messages[0]);
        assert_eq!(fitted.last(), messages.last());
        assert!(fitted.len() < messages.len());
    }

    #[test]
    fn test_fit_never_drops_below_two_messages() {
        // Budget nothing can satisfy: the anchor and newest message survive
        // anyway.
        let manager = ContextManager::new(1);
        let messages = vec![
            ChatMessage::system("framing that is fairly long as messages go"),
            ChatMessage::user("middle"),
            ChatMessage::user("latest"),
        ];
        let fitted = manager.fit(messages);
        assert_eq!(fitted.len(), 2);
        assert_eq!(fitted[0].content, "framing that is fairly long as messages go");
        assert_eq!(fitted[1].content, "latest");
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use atelier_core::ChatMessage;
    use proptest::prelude::*;

    fn arb_message() -> impl Strategy<Value = ChatMessage> {
        ("[a-z云研究0-9]{1,80}", 0..3u8).prop_map(|(content, kind)| match kind {
            0 => ChatMessage::user(content),
            1 => ChatMessage::assistant(content),
            _ => ChatMessage::tool_result("call", content),
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// For any over-budget history, the fitted output retains the pruned
        /// history's first message and the most recent message, and never
        /// grows.
        #[test]
        fn prop_fit_preserves_anchor_and_tail(
            messages in prop::collection::vec(arb_message(), 3..40),
            budget in 10usize..200,
        ) {
            let manager = ContextManager::new(budget);
            let fitted = manager.fit(messages.clone());

            prop_assert!(fitted.len() <= messages.len());
            prop_assert!(!fitted.is_empty());
            // The anchor is the pruned history's first message.
            let pruned = prune_stale_tool_exchanges(messages.clone());
            prop_assert_eq!(&fitted[0], &pruned[0]);
            if fitted.len() >= 2 {
                // Tail is always the newest surviving message of the input.
                let last = fitted.last().unwrap();
                prop_assert_eq!(last, messages.last().unwrap());
            }
            // Every fitted message comes from the input, in order.
            let mut cursor = 0;
            for m in &fitted {
                let found = messages[cursor..].iter().position(|orig| orig == m);
                prop_assert!(found.is_some(), "fitted message not in input order");
                cursor += found.unwrap() + 1;
            }
        }

        /// Fitting is idempotent: a fitted history fits unchanged.
        #[test]
        fn prop_fit_idempotent(
            messages in prop::collection::vec(arb_message(), 1..30),
            budget in 10usize..300,
        ) {
            let manager = ContextManager::new(budget);
            let once = manager.fit(messages);
            let twice = manager.fit(once.clone());
            prop_assert_eq!(once, twice);
        }

        /// The estimate never increases across fitting.
        #[test]
        fn prop_fit_monotone(
            messages in prop::collection::vec(arb_message(), 1..30),
            budget in 10usize..300,
        ) {
            let manager = ContextManager::new(budget);
            let before = manager.estimate_history(&messages);
            let fitted = manager.fit(messages);
            prop_assert!(manager.estimate_history(&fitted) <= before);
        }
    }
}
