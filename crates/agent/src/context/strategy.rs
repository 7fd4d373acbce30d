//! Importance scoring and adaptive budgeting strategy for conversation history.

use notechat_core::message::ChatMessage;
use serde::{Deserialize, Serialize};

/// Phrases that mark an analytical request.
const ANALYTICAL_KEYWORDS: &[&str] = &[
    "how", "why", "what", "analyze", "analyse", "summarize", "summarise", "explain", "help",
    "如何", "怎么", "为什么", "什么", "分析", "总结", "解释", "帮助",
];

/// Score a prior turn in [0, 1] from its position, length, role and content.
///
/// The recency term `((index + 1) / total_count) * 0.4` grows strictly with
/// position, so on that term alone a later message never scores below an
/// earlier one.
pub fn evaluate_message_importance(message: &ChatMessage, index: usize, total_count: usize) -> f64 {
    let mut score = 0.0;

    if total_count > 0 {
        score += ((index + 1) as f64 / total_count as f64) * 0.4;
    }

    let len = message.char_len();
    score += if len > 50 && len < 2000 { 0.3 } else { 0.1 };

    score += if message.role().is_conversational() { 0.2 } else { 0.1 };

    let content = message.content();
    if content.contains('?') || content.contains('？') {
        score += 0.05;
    }

    let lowered = content.to_lowercase();
    if ANALYTICAL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        score += 0.05;
    }

    score.min(1.0)
}

/// Budgeting knobs derived from conversation length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveStrategy {
    /// Trailing messages attempted verbatim before anything older.
    pub recent_tail_size: usize,
    /// Fraction of the budget at which verbatim inclusion gives way to compression.
    pub compression_start_ratio: f64,
    /// Older messages must score above this to be compressed in.
    pub importance_inclusion_threshold: f64,
    /// Compressed length as a fraction of the original.
    pub max_compression_ratio: f64,
}

impl AdaptiveStrategy {
    /// Pick the strategy for a conversation of `message_count` turns.
    ///
    /// With article content present every knob shifts to leave more room
    /// for the notes.
    pub fn for_conversation(message_count: usize, has_article_content: bool) -> Self {
        let base = match message_count {
            0..=10 => Self {
                recent_tail_size: message_count,
                compression_start_ratio: 0.95,
                importance_inclusion_threshold: 0.3,
                max_compression_ratio: 0.9,
            },
            11..=30 => Self {
                recent_tail_size: 8,
                compression_start_ratio: 0.8,
                importance_inclusion_threshold: 0.5,
                max_compression_ratio: 0.7,
            },
            _ => Self {
                recent_tail_size: 6,
                compression_start_ratio: 0.7,
                importance_inclusion_threshold: 0.6,
                max_compression_ratio: 0.5,
            },
        };

        if !has_article_content {
            return base;
        }

        Self {
            recent_tail_size: ((base.recent_tail_size as f64 * 0.6).floor() as usize).max(2),
            compression_start_ratio: base.compression_start_ratio * 0.7,
            importance_inclusion_threshold: base.importance_inclusion_threshold + 0.2,
            max_compression_ratio: base.max_compression_ratio * 0.8,
        }
    }
}

/// Free-function form of [`AdaptiveStrategy::for_conversation`].
pub fn get_adaptive_strategy(message_count: usize, has_article_content: bool) -> AdaptiveStrategy {
    AdaptiveStrategy::for_conversation(message_count, has_article_content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn recency_is_monotonic() {
        let msg = ChatMessage::user("same content");
        let total = 20;
        let scores: Vec<f64> = (0..total)
            .map(|i| evaluate_message_importance(&msg, i, total))
            .collect();
        assert!(scores.windows(2).all(|w| w[1] >= w[0]));
        assert!(scores[total - 1] > scores[0]);
    }

    #[test]
    fn short_user_message_score() {
        // recency 0.4 + short 0.1 + user 0.2
        let score = evaluate_message_importance(&ChatMessage::user("ok"), 0, 1);
        assert!(approx(score, 0.7));
    }

    #[test]
    fn system_role_weighs_less() {
        let user = evaluate_message_importance(&ChatMessage::user("ok"), 0, 2);
        let system = evaluate_message_importance(&ChatMessage::system("ok"), 0, 2);
        assert!(approx(user - system, 0.1));
    }

    #[test]
    fn mid_length_bonus() {
        let text = "a".repeat(100);
        let score = evaluate_message_importance(&ChatMessage::assistant(text), 0, 4);
        // 0.1 recency + 0.3 length + 0.2 role
        assert!(approx(score, 0.6));
    }

    #[test]
    fn question_and_keyword_bonuses() {
        let plain = evaluate_message_importance(&ChatMessage::user("ok then"), 0, 4);
        let question = evaluate_message_importance(&ChatMessage::user("ok then?"), 0, 4);
        let full_width = evaluate_message_importance(&ChatMessage::user("好的？"), 0, 4);
        let keyword = evaluate_message_importance(&ChatMessage::user("Explain this"), 0, 4);
        let chinese = evaluate_message_importance(&ChatMessage::user("请总结"), 0, 4);
        assert!(approx(question - plain, 0.05));
        assert!(approx(full_width - plain, 0.05));
        assert!(approx(keyword - plain, 0.05));
        assert!(approx(chinese - plain, 0.05));
    }

    #[test]
    fn score_is_clamped() {
        let text = format!("Why and how? {}", "x".repeat(100));
        let score = evaluate_message_importance(&ChatMessage::user(text), 9, 10);
        assert!(score <= 1.0);
        assert!(approx(score, 1.0));
    }

    #[test]
    fn short_conversation_keeps_everything() {
        let s = AdaptiveStrategy::for_conversation(7, false);
        assert_eq!(s.recent_tail_size, 7);
        assert!(approx(s.compression_start_ratio, 0.95));
        assert!(approx(s.importance_inclusion_threshold, 0.3));
        assert!(approx(s.max_compression_ratio, 0.9));
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(get_adaptive_strategy(10, false).recent_tail_size, 10);
        assert_eq!(get_adaptive_strategy(11, false).recent_tail_size, 8);
        assert_eq!(get_adaptive_strategy(30, false).recent_tail_size, 8);
        assert_eq!(get_adaptive_strategy(31, false).recent_tail_size, 6);
    }

    #[test]
    fn long_conversation_with_articles() {
        let s = get_adaptive_strategy(31, true);
        assert_eq!(s.recent_tail_size, 3);
        assert!(approx(s.compression_start_ratio, 0.49));
        assert!(approx(s.importance_inclusion_threshold, 0.8));
        assert!(approx(s.max_compression_ratio, 0.4));
    }

    #[test]
    fn article_tail_never_below_two() {
        assert_eq!(get_adaptive_strategy(1, true).recent_tail_size, 2);
        assert_eq!(get_adaptive_strategy(0, true).recent_tail_size, 2);
        assert_eq!(get_adaptive_strategy(5, true).recent_tail_size, 3);
        assert_eq!(get_adaptive_strategy(20, true).recent_tail_size, 4);
    }
}
