//! Request assembly: system prompt, note content, history, user input.
//!
//! Builds the ordered message list for one completion request:
//!
//! 1. **System** (base prompt + role prompt): never trimmed
//! 2. **Articles** (note/document content): chunked or compressed to fit
//! 3. **History** (prior turns): importance-ranked, chronological output
//! 4. **User** (the new message): always last, exactly once
//!
//! The article and history layers each get a fixed share of the total
//! budget. The remainder is left for the system prompt and the user message.
//!
//! # Determinism
//!
//! Identical inputs always produce identical outputs. No random or
//! time-dependent logic is used during assembly.

use crate::context::article::{self, ArticleReport};
use crate::context::history::{self, HistoryReport};
use crate::context::token;
use notechat_config::BudgetConfig;
use notechat_core::message::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ── Types ─────────────────────────────────────────────────────────────────

/// Token budget configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Total token budget for the entire assembled request.
    pub total: usize,
    /// Share of `total` for article content.
    pub article_ratio: f64,
    /// Share of `total` for conversation history.
    pub conversation_ratio: f64,
}

impl TokenBudget {
    pub fn article_tokens(&self) -> usize {
        (self.total as f64 * self.article_ratio).floor() as usize
    }

    pub fn conversation_tokens(&self) -> usize {
        (self.total as f64 * self.conversation_ratio).floor() as usize
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            total: 16_000,
            article_ratio: 0.65,
            conversation_ratio: 0.25,
        }
    }
}

impl From<&BudgetConfig> for TokenBudget {
    fn from(config: &BudgetConfig) -> Self {
        Self {
            total: config.total_tokens,
            article_ratio: config.article_ratio,
            conversation_ratio: config.conversation_ratio,
        }
    }
}

/// All inputs required by the assembler for a single request.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    /// Base system prompt.
    pub system_prompt: &'a str,
    /// Optional role/persona prompt appended to the system prompt.
    pub role_prompt: &'a str,
    /// Note or document texts attached to this request.
    pub documents: &'a [String],
    /// Prior conversation turns, oldest first.
    pub history: &'a [ChatMessage],
    /// The new user message.
    pub user_message: &'a str,
}

/// The assembled request, ready for a completion call.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    /// System, articles, history, then the user message.
    pub messages: Vec<ChatMessage>,
    /// Assembly metadata (token counts, drops, utilization).
    pub metadata: AssemblyMetadata,
}

/// Detailed metadata about the assembly process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// Estimated tokens of all assembled messages, overhead included.
    pub total_tokens: usize,
    /// Configured token budget.
    pub budget: usize,
    /// Budget utilization percentage.
    pub utilization_pct: f32,
    /// Whether the assembled request exceeds `budget`.
    pub over_budget: bool,
    /// Per-layer statistics.
    pub per_layer: Vec<LayerStats>,
    /// Items dropped from each layer.
    pub drops: Vec<DropInfo>,
    pub articles: ArticleReport,
    pub history: HistoryReport,
}

/// Statistics for a single layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerStats {
    /// Layer name.
    pub name: String,
    /// Tokens consumed by this layer.
    pub tokens: usize,
    /// Items included after budget trimming.
    pub items_included: usize,
    /// Total items available before trimming.
    pub items_total: usize,
}

/// Information about items dropped from a layer during budget enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropInfo {
    /// Which layer.
    pub layer: String,
    /// Number of items dropped.
    pub items_dropped: usize,
    /// Estimated tokens of dropped content.
    pub tokens_dropped: usize,
    /// Reason for dropping.
    pub reason: String,
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Stateless; create one and reuse it.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    budget: TokenBudget,
    max_chunk_size: usize,
}

impl ContextAssembler {
    /// Create a new assembler with the given token budget.
    pub fn new(budget: TokenBudget) -> Self {
        Self {
            budget,
            max_chunk_size: article::DEFAULT_MAX_CHUNK_SIZE,
        }
    }

    /// Create an assembler with the default budget (16000 tokens).
    pub fn with_default_budget() -> Self {
        Self::new(TokenBudget::default())
    }

    /// Create an assembler from the `[budget]` config section.
    pub fn from_config(config: &BudgetConfig) -> Self {
        Self::new(TokenBudget::from(config)).with_max_chunk_size(config.max_chunk_size)
    }

    /// Chunk size (characters) used when splitting long documents.
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    /// Assemble the request.
    ///
    /// # Algorithm
    ///
    /// 1. Merge system and role prompts into one system message (omitted if
    ///    both are empty)
    /// 2. Budget documents into `floor(total * article_ratio)`
    /// 3. Budget history into `floor(total * conversation_ratio)`, with the
    ///    strategy tightened when any article message was produced
    /// 4. Append the user message
    ///
    /// Never fails. A request that ends up over the total budget is flagged
    /// in the metadata.
    pub fn assemble(&self, input: &AssemblyInput<'_>) -> AssembledContext {
        let mut stats: Vec<LayerStats> = Vec::new();
        let mut drops: Vec<DropInfo> = Vec::new();
        let mut messages: Vec<ChatMessage> = Vec::new();

        // ── Layer 1: System prompt ─────────────────────────────────────────
        let system = merge_prompts(input.system_prompt, input.role_prompt);
        let system_items = usize::from(system.is_some());
        if let Some(system) = system {
            messages.push(ChatMessage::system(system));
        }
        stats.push(LayerStats {
            name: "system".into(),
            tokens: token::estimate_messages_tokens(&messages),
            items_included: system_items,
            items_total: system_items,
        });

        // ── Layer 2: Articles ──────────────────────────────────────────────
        let articles = article::budget_articles(
            input.documents,
            self.budget.article_tokens(),
            input.user_message,
            self.max_chunk_size,
        );
        let has_article_content = !articles.messages.is_empty();
        stats.push(LayerStats {
            name: "articles".into(),
            tokens: token::estimate_messages_tokens(&articles.messages),
            items_included: articles.messages.len(),
            items_total: input.documents.len(),
        });
        let reduced = articles.report.documents_compressed + articles.report.documents_chunked;
        if articles.report.documents_dropped > 0 || reduced > 0 {
            drops.push(DropInfo {
                layer: "articles".into(),
                items_dropped: articles.report.documents_dropped,
                tokens_dropped: articles.report.tokens_dropped,
                reason: format!(
                    "{} dropped, {} reduced to fit the article budget",
                    articles.report.documents_dropped, reduced
                ),
            });
        }
        messages.extend(articles.messages);

        // ── Layer 3: Conversation history ──────────────────────────────────
        let history = history::budget_history(
            input.history,
            self.budget.conversation_tokens(),
            has_article_content,
        );
        stats.push(LayerStats {
            name: "history".into(),
            tokens: token::estimate_messages_tokens(&history.messages),
            items_included: history.messages.len(),
            items_total: input.history.len(),
        });
        if history.report.messages_dropped > 0 || history.report.messages_compressed > 0 {
            drops.push(DropInfo {
                layer: "history".into(),
                items_dropped: history.report.messages_dropped,
                tokens_dropped: history.report.tokens_dropped,
                reason: format!(
                    "{} dropped, {} compressed to fit the conversation budget",
                    history.report.messages_dropped, history.report.messages_compressed
                ),
            });
        }
        messages.extend(history.messages);

        // ── Layer 4: User message ──────────────────────────────────────────
        let user = ChatMessage::user(input.user_message);
        stats.push(LayerStats {
            name: "user_message".into(),
            tokens: token::estimate_message_tokens(&user),
            items_included: 1,
            items_total: 1,
        });
        messages.push(user);

        // ── Compute final metadata ─────────────────────────────────────────
        let total_tokens: usize = stats.iter().map(|s| s.tokens).sum();
        let utilization_pct = if self.budget.total == 0 {
            0.0
        } else {
            (total_tokens as f32 / self.budget.total as f32) * 100.0
        };
        let over_budget = total_tokens > self.budget.total;

        if over_budget {
            warn!(
                total_tokens,
                budget = self.budget.total,
                "Assembled request exceeds token budget"
            );
        } else {
            debug!(
                total_tokens,
                budget = self.budget.total,
                messages = messages.len(),
                "Request assembled"
            );
        }

        AssembledContext {
            messages,
            metadata: AssemblyMetadata {
                total_tokens,
                budget: self.budget.total,
                utilization_pct,
                over_budget,
                per_layer: stats,
                drops,
                articles: articles.report,
                history: history.report,
            },
        }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::with_default_budget()
    }
}

fn merge_prompts(system_prompt: &str, role_prompt: &str) -> Option<String> {
    match (system_prompt.is_empty(), role_prompt.is_empty()) {
        (true, true) => None,
        (false, true) => Some(system_prompt.to_string()),
        (true, false) => Some(role_prompt.to_string()),
        (false, false) => Some(format!("{system_prompt}\n\n{role_prompt}")),
    }
}
