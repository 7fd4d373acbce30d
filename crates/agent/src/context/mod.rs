//! Token-budgeted request assembly.
//!
//! # Layers (in request order)
//!
//! | Layer | Source | Trim Strategy |
//! |-------|--------|---------------|
//! | 1. System | Base + role prompt | Never trimmed |
//! | 2. Articles | Attached notes | Chunked by relevance, compressed, or dropped |
//! | 3. History | Prior turns | Recent tail first, then by importance |
//! | 4. User | New message | Never trimmed |

pub mod article;
pub mod assembler;
pub mod history;
pub mod strategy;
pub mod token;

pub use article::{
    ArticleReport, BudgetedArticles, ChunkCandidate, budget_articles, chunk_article,
    manage_article_content,
};
pub use assembler::{
    AssembledContext, AssemblyInput, AssemblyMetadata, ContextAssembler, DropInfo, LayerStats,
    TokenBudget,
};
pub use history::{
    BudgetedHistory, HistoryReport, ScoredMessage, budget_history, manage_context_messages,
};
pub use strategy::{AdaptiveStrategy, evaluate_message_importance, get_adaptive_strategy};
pub use token::{
    compress_message, estimate_message_tokens, estimate_messages_tokens, estimate_tokens,
};
