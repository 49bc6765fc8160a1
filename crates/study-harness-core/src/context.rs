//! Token-budgeted conversation context assembly.
//!
//! Selects which prior turns accompany a new user message to the
//! collaborator LLM. Token counts are approximated as `len / 4` — an
//! intentionally cheap proxy, not a real tokenizer. The function is pure
//! and stateless, safe to call concurrently without coordination.
//!
//! Budget exhaustion is never an error: in the worst case only the new
//! message is emitted.

use crate::models::ConversationTurn;

/// Default cap on considered history turns.
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Default token budget for the assembled message list.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 4000;

/// Estimate token count: ~4 characters per token, rounded down.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Assemble the message list for an LLM call.
///
/// Reserves budget for the new message first, then admits history turns
/// newest-to-oldest while the running estimate fits the remainder; a
/// turn that would exceed it stops inclusion (older turns are dropped
/// whole, never truncated). If truncation cut off the considered
/// window's opening turn but it still fits, it is re-admitted to keep
/// the conversation's original grounding — unless it duplicates the
/// oldest turn already admitted. Output is chronological and always
/// ends with the new message.
pub fn build_messages(
    user_message: &str,
    history: &[ConversationTurn],
    max_history: usize,
    max_context_tokens: usize,
) -> Vec<ConversationTurn> {
    let valid: Vec<&ConversationTurn> =
        history.iter().filter(|t| !t.content.is_empty()).collect();

    let current_tokens = estimate_tokens(user_message);
    let remaining = max_context_tokens.saturating_sub(current_tokens);

    if remaining == 0 || valid.is_empty() {
        return vec![ConversationTurn::user(user_message)];
    }

    let start = valid.len().saturating_sub(max_history);
    let candidates = &valid[start..];

    // Newest first, under the remaining budget.
    let mut selected: Vec<ConversationTurn> = Vec::new();
    let mut used_tokens = 0usize;
    for turn in candidates.iter().rev() {
        let turn_tokens = estimate_tokens(&turn.content);
        if used_tokens + turn_tokens > remaining {
            break;
        }
        selected.push((*turn).clone());
        used_tokens += turn_tokens;
    }

    // Re-admit the window's opening turn if it was cut off but fits.
    if !selected.is_empty() && selected.len() < candidates.len() {
        let first = candidates[0];
        let first_tokens = estimate_tokens(&first.content);
        if used_tokens + first_tokens <= remaining {
            let oldest_admitted = selected.last().map(|t| t.content.as_str());
            if oldest_admitted != Some(first.content.as_str()) {
                selected.push(first.clone());
            }
        }
    }

    selected.reverse();
    selected.push(ConversationTurn::user(user_message));
    selected
}
