//! # NoteChat Core
//!
//! Domain types, traits, and error definitions for the NoteChat sidebar engine.
//! This crate has **no HTTP or storage dependencies**; it defines the domain model
//! that the budgeting, configuration, and CLI crates implement against.
//!
//! ## Design Philosophy
//!
//! The completion backend is defined as a trait here so the chat session can
//! be driven by a real HTTP client or by a scripted stub in tests. Everything
//! else in this crate is plain data.

pub mod cancel;
pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use cancel::CancellationToken;
pub use error::ProviderError;
pub use message::{ChatMessage, Role};
pub use provider::{CompletionRequest, CompletionResponse, Provider, StreamChunk, Usage};
