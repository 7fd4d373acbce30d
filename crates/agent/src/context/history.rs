//! Conversation history budgeting.
//!
//! Two-tier selection: the recent tail is attempted verbatim in original
//! order, then older turns are admitted by importance. Anything that does not
//! fit may be compressed. The selection is finally put back into
//! chronological order by each message's original index.

use crate::context::strategy::{AdaptiveStrategy, evaluate_message_importance};
use crate::context::token::{self, compress_message, estimate_message_tokens};
use notechat_core::message::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default history budget, in tokens.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 8000;

/// Minimum leftover character budget for compressing a recent-tail message.
const MIN_RECENT_COMPRESSION_CHARS: usize = 100;

/// Minimum leftover character budget for compressing an older message.
const MIN_OLDER_COMPRESSION_CHARS: usize = 200;

/// A prior turn tagged for budgeting.
#[derive(Debug, Clone)]
pub struct ScoredMessage {
    pub message: ChatMessage,
    pub importance_score: f64,
    pub estimated_tokens: usize,
    /// Position in the input conversation; the only ordering anchor.
    pub original_index: usize,
}

/// Statistics for one history-budgeting call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryReport {
    pub budget: usize,
    pub tokens_used: usize,
    pub messages_total: usize,
    pub messages_verbatim: usize,
    pub messages_compressed: usize,
    pub messages_dropped: usize,
    /// Tokens of source messages that did not make it into the output.
    pub tokens_dropped: usize,
    /// Whether nothing fit and the most recent message was forced in.
    pub fallback_used: bool,
    pub strategy: Option<AdaptiveStrategy>,
}

/// History messages plus the report describing how they were chosen.
#[derive(Debug, Clone)]
pub struct BudgetedHistory {
    pub messages: Vec<ChatMessage>,
    pub report: HistoryReport,
}

/// Fit prior conversation turns into `max_context_tokens`, keeping their
/// original order.
pub fn manage_context_messages(
    messages: &[ChatMessage],
    max_context_tokens: usize,
    has_article_content: bool,
) -> Vec<ChatMessage> {
    budget_history(messages, max_context_tokens, has_article_content).messages
}

/// [`manage_context_messages`] with a report.
pub fn budget_history(
    messages: &[ChatMessage],
    max_context_tokens: usize,
    has_article_content: bool,
) -> BudgetedHistory {
    let mut report = HistoryReport {
        budget: max_context_tokens,
        messages_total: messages.len(),
        ..HistoryReport::default()
    };

    if messages.is_empty() {
        return BudgetedHistory {
            messages: Vec::new(),
            report,
        };
    }

    let strategy = AdaptiveStrategy::for_conversation(messages.len(), has_article_content);
    report.strategy = Some(strategy);

    let total_count = messages.len();
    let scored: Vec<ScoredMessage> = messages
        .iter()
        .enumerate()
        .map(|(original_index, message)| ScoredMessage {
            importance_score: evaluate_message_importance(message, original_index, total_count),
            estimated_tokens: estimate_message_tokens(message),
            message: message.clone(),
            original_index,
        })
        .collect();

    let tail_len = strategy.recent_tail_size.min(total_count);
    let (older, recent) = scored.split_at(total_count - tail_len);

    let mut older: Vec<&ScoredMessage> = older.iter().collect();
    older.sort_by(|a, b| {
        b.importance_score
            .total_cmp(&a.importance_score)
            .then(b.original_index.cmp(&a.original_index))
    });

    let soft_limit = max_context_tokens as f64 * strategy.compression_start_ratio;
    // Integer totals fit under `soft_limit` exactly when they fit under its floor.
    let soft_ceiling = soft_limit.floor() as usize;
    let mut selection = Selection::new(max_context_tokens);

    for entry in recent {
        if selection.total + entry.estimated_tokens <= soft_ceiling {
            selection.take_verbatim(entry);
            continue;
        }

        let available_chars =
            token::tokens_to_chars(soft_ceiling.saturating_sub(selection.total));
        if available_chars >= MIN_RECENT_COMPRESSION_CHARS {
            selection.try_compressed(entry, available_chars, strategy.max_compression_ratio);
        }
        break;
    }

    for entry in older {
        if selection.total as f64 >= soft_limit {
            break;
        }

        if selection.total + entry.estimated_tokens <= max_context_tokens {
            selection.take_verbatim(entry);
            continue;
        }

        if entry.importance_score > strategy.importance_inclusion_threshold {
            let available_chars =
                token::tokens_to_chars(max_context_tokens.saturating_sub(selection.total));
            if available_chars >= MIN_OLDER_COMPRESSION_CHARS {
                selection.try_compressed(entry, available_chars, strategy.max_compression_ratio);
            }
        }
    }

    let mut picked = selection.picked;
    picked.sort_by_key(|(index, _)| *index);

    report.messages_verbatim = selection.verbatim;
    report.messages_compressed = selection.compressed;
    report.tokens_used = selection.total;

    let mut out: Vec<ChatMessage> = picked.into_iter().map(|(_, message)| message).collect();

    if out.is_empty() {
        let last = &scored[total_count - 1];
        let message = if last.estimated_tokens <= max_context_tokens {
            last.message.clone()
        } else {
            let budget_chars = token::tokens_to_chars(max_context_tokens);
            let compressed = compress_message(last.message.content(), budget_chars);
            last.message.with_content(compressed)
        };
        report.tokens_used = estimate_message_tokens(&message);
        report.fallback_used = true;
        if message.content() == last.message.content() {
            report.messages_verbatim = 1;
        } else {
            report.messages_compressed = 1;
        }
        out.push(message);
    }

    report.messages_dropped = total_count - out.len();
    let source_tokens: usize = scored.iter().map(|s| s.estimated_tokens).sum();
    report.tokens_dropped = source_tokens.saturating_sub(report.tokens_used);

    debug!(
        budget = max_context_tokens,
        used = report.tokens_used,
        total = total_count,
        verbatim = report.messages_verbatim,
        compressed = report.messages_compressed,
        dropped = report.messages_dropped,
        recent_tail = tail_len,
        "Conversation history budgeted"
    );

    BudgetedHistory {
        messages: out,
        report,
    }
}

/// Running state of one budgeting pass.
struct Selection {
    max_tokens: usize,
    total: usize,
    picked: Vec<(usize, ChatMessage)>,
    verbatim: usize,
    compressed: usize,
}

impl Selection {
    fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            total: 0,
            picked: Vec::new(),
            verbatim: 0,
            compressed: 0,
        }
    }

    fn take_verbatim(&mut self, entry: &ScoredMessage) {
        self.total += entry.estimated_tokens;
        self.picked.push((entry.original_index, entry.message.clone()));
        self.verbatim += 1;
    }

    /// Compress `entry` to `min(available_chars, len * ratio)` characters and
    /// keep it if the result still fits the hard budget.
    fn try_compressed(&mut self, entry: &ScoredMessage, available_chars: usize, ratio: f64) {
        let by_ratio = (entry.message.char_len() as f64 * ratio).floor() as usize;
        let target = available_chars.min(by_ratio);
        let compressed = entry
            .message
            .with_content(compress_message(entry.message.content(), target));
        let tokens = estimate_message_tokens(&compressed);

        if self.total + tokens > self.max_tokens {
            return;
        }

        self.total += tokens;
        self.picked.push((entry.original_index, compressed));
        self.compressed += 1;
    }
}
