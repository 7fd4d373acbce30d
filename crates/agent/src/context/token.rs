//! Token estimation and lossy compression.
//!
//! Uses a character-based heuristic: ~3 characters per token. That is more
//! conservative than the usual 4, because notes often mix in CJK text which
//! tokenizes denser. Expect up to ±100% error against the real tokenizer.

use notechat_core::message::ChatMessage;

/// Characters assumed per token; also converts token budgets to char budgets.
pub const CHARS_PER_TOKEN: usize = 3;

/// Per-message structural overhead (role marker, separators).
pub const MESSAGE_OVERHEAD_TOKENS: usize = 10;

/// Share of the target length kept from each end by [`compress_message`].
const HEAD_TAIL_RATIO: f64 = 0.4;

/// Estimate the token count for a string.
///
/// `ceil(chars / 3)`; lengths are in characters, not bytes.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Estimate tokens for a single message including per-message overhead.
pub fn estimate_message_tokens(message: &ChatMessage) -> usize {
    estimate_tokens(message.content()) + MESSAGE_OVERHEAD_TOKENS
}

/// Estimate tokens for a slice of messages.
pub fn estimate_messages_tokens(messages: &[ChatMessage]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// Convert a token budget into a character budget.
pub fn tokens_to_chars(tokens: usize) -> usize {
    tokens.saturating_mul(CHARS_PER_TOKEN)
}

/// Keep the head and tail of `content`, eliding the middle.
///
/// Content of at most `max_length` characters is returned unchanged.
/// Otherwise the first and last `floor(max_length * 0.4)` characters are
/// kept around a marker stating how many were omitted. The marker itself is
/// not counted against `max_length`.
pub fn compress_message(content: &str, max_length: usize) -> String {
    let total = content.chars().count();
    if total <= max_length {
        return content.to_string();
    }

    let keep = (max_length as f64 * HEAD_TAIL_RATIO).floor() as usize;
    let omitted = total - 2 * keep;

    let head: String = content.chars().take(keep).collect();
    let tail: String = content.chars().skip(total - keep).collect();

    format!("{head}\n\n[... content compressed, omitted {omitted} characters ...]\n\n{tail}")
}
