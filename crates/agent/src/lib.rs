//! The chat engine behind the NoteChat sidebar.
//!
//! Each turn runs through the same pipeline:
//!
//! 1. **Budget** the attached notes into the article share of the budget
//! 2. **Budget** prior turns into the conversation share
//! 3. **Assemble** system prompt + notes + history + the new user message
//! 4. **Stream** the reply from the provider, honoring cancellation
//!
//! Budgeting is synchronous and pure; only the stream step awaits.

pub mod chat;
pub mod context;
pub mod stream;

pub use chat::{ChatSession, ChatTurn};
pub use context::{
    AdaptiveStrategy, ArticleReport, AssembledContext, AssemblyInput, AssemblyMetadata,
    ContextAssembler, DropInfo, HistoryReport, LayerStats, TokenBudget,
};
pub use stream::{StreamOutcome, consume_stream};
