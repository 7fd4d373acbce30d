//! Article budgeting: fit note/document content into an article token budget.
//!
//! Short documents go in verbatim. Documents too long for the budget on
//! their own are split into paragraph-aligned chunks, scored against the
//! user's query, and the best chunks are kept until the budget runs out.

use crate::context::token::{self, compress_message, estimate_tokens};
use notechat_core::message::{ChatMessage, Role};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Default chunk size, in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 2000;

/// Default article budget, in tokens.
pub const DEFAULT_MAX_ARTICLE_TOKENS: usize = 4000;

/// A document is only compressed into the leftover budget if more than this
/// many tokens remain.
pub const MIN_COMPRESSION_BUDGET_TOKENS: usize = 500;

/// Role of a whole document that was compressed into the leftover budget.
///
/// Verbatim documents and chunk selections are `system` messages; this path
/// has always produced a `user` message and callers rely on it.
pub const COMPRESSED_DOCUMENT_ROLE: Role = Role::User;

const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// One scored chunk of a long document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkCandidate {
    pub text: String,
    /// Position of the chunk in the document (0-based).
    pub position_index: usize,
    pub total_chunks: usize,
    /// Relevance score in [0, 1].
    pub importance: f64,
    pub estimated_tokens: usize,
}

/// Statistics for one article-budgeting call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleReport {
    pub budget: usize,
    pub tokens_used: usize,
    pub documents_total: usize,
    pub documents_verbatim: usize,
    pub documents_compressed: usize,
    pub documents_chunked: usize,
    pub documents_dropped: usize,
    /// Tokens of source content that did not make it into the output.
    pub tokens_dropped: usize,
}

/// Article messages plus the report describing how they were chosen.
#[derive(Debug, Clone)]
pub struct BudgetedArticles {
    pub messages: Vec<ChatMessage>,
    pub report: ArticleReport,
}

/// Split `content` into paragraph-aligned chunks of about `max_chunk_size`
/// characters.
///
/// Paragraphs are separated by one or more blank lines. They are never split,
/// so a paragraph longer than `max_chunk_size` becomes its own chunk.
pub fn chunk_article(content: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in split_paragraphs(content) {
        let paragraph_len = paragraph.chars().count();

        if !current.is_empty() && current_len + paragraph_len + 2 > max_chunk_size {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(&paragraph);
        current_len += paragraph_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Group consecutive non-blank lines into paragraphs.
fn split_paragraphs(content: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut lines: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                paragraphs.push(lines.join("\n"));
                lines.clear();
            }
        } else {
            lines.push(line);
        }
    }
    if !lines.is_empty() {
        paragraphs.push(lines.join("\n"));
    }

    paragraphs
}

/// Score a chunk's relevance in [0, 1].
///
/// Additive: document position, length, keyword overlap with `user_query`
/// (capped at 0.3), and markdown structure.
pub fn evaluate_chunk_importance(
    chunk: &str,
    index: usize,
    total_chunks: usize,
    user_query: &str,
) -> f64 {
    let mut score = 0.0;

    if index == 0 {
        score += 0.3;
    }
    if total_chunks > 0 && index == total_chunks - 1 {
        score += 0.2;
    }

    let len = chunk.chars().count();
    if len > 500 && len < 2000 {
        score += 0.2;
    }

    score += keyword_overlap(chunk, user_query);

    if chunk.starts_with('#') {
        score += 0.1;
    }
    if chunk.lines().any(is_bullet_line) {
        score += 0.05;
    }
    if chunk.contains("```") {
        score += 0.1;
    }
    if chunk.lines().any(is_numbered_line) {
        score += 0.05;
    }

    score.min(1.0)
}

fn keyword_overlap(chunk: &str, user_query: &str) -> f64 {
    let haystack = chunk.to_lowercase();
    let hits = user_query
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .map(str::to_lowercase)
        .filter(|keyword| haystack.contains(keyword.as_str()))
        .count();
    (hits as f64 * 0.1).min(0.3)
}

fn is_bullet_line(line: &str) -> bool {
    let line = line.trim_start();
    ["- ", "* ", "+ "].iter().any(|marker| line.starts_with(marker))
}

fn is_numbered_line(line: &str) -> bool {
    let line = line.trim_start();
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with('.')
}

/// Chunk a document and score every chunk, in document order.
pub fn build_chunk_candidates(
    content: &str,
    max_chunk_size: usize,
    user_query: &str,
) -> Vec<ChunkCandidate> {
    let chunks = chunk_article(content, max_chunk_size);
    let total_chunks = chunks.len();

    chunks
        .into_iter()
        .enumerate()
        .map(|(position_index, text)| ChunkCandidate {
            importance: evaluate_chunk_importance(&text, position_index, total_chunks, user_query),
            estimated_tokens: estimate_tokens(&text),
            text,
            position_index,
            total_chunks,
        })
        .collect()
}

/// Fit `documents` into `max_article_tokens`, one message per accepted
/// document.
pub fn manage_article_content(
    documents: &[String],
    max_article_tokens: usize,
    user_query: &str,
) -> Vec<ChatMessage> {
    budget_articles(documents, max_article_tokens, user_query, DEFAULT_MAX_CHUNK_SIZE).messages
}

/// [`manage_article_content`] with an explicit chunk size and a report.
pub fn budget_articles(
    documents: &[String],
    max_article_tokens: usize,
    user_query: &str,
    max_chunk_size: usize,
) -> BudgetedArticles {
    let mut messages = Vec::new();
    let mut report = ArticleReport {
        budget: max_article_tokens,
        documents_total: documents.len(),
        ..ArticleReport::default()
    };
    let mut total = 0usize;

    for (doc_index, document) in documents.iter().enumerate() {
        if total >= max_article_tokens {
            let rest = &documents[doc_index..];
            report.documents_dropped += rest.len();
            report.tokens_dropped += rest.iter().map(|d| estimate_tokens(d)).sum::<usize>();
            break;
        }

        let doc_tokens = estimate_tokens(document);

        if doc_tokens <= max_article_tokens {
            if total + doc_tokens <= max_article_tokens {
                messages.push(ChatMessage::system(document.as_str()));
                total += doc_tokens;
                report.documents_verbatim += 1;
                continue;
            }

            let remaining = max_article_tokens - total;
            if remaining > MIN_COMPRESSION_BUDGET_TOKENS {
                let compressed = compress_message(document, token::tokens_to_chars(remaining));
                let compressed_tokens = estimate_tokens(&compressed);
                report.tokens_dropped += doc_tokens.saturating_sub(compressed_tokens);
                messages.push(ChatMessage::new(COMPRESSED_DOCUMENT_ROLE, compressed));
                total += compressed_tokens;
                report.documents_compressed += 1;
            } else {
                report.documents_dropped += 1;
                report.tokens_dropped += doc_tokens;
            }
            continue;
        }

        match select_chunks(document, max_article_tokens, total, user_query, max_chunk_size) {
            Some(content) => {
                let content_tokens = estimate_tokens(&content);
                report.tokens_dropped += doc_tokens.saturating_sub(content_tokens);
                messages.push(ChatMessage::system(content));
                total += content_tokens;
                report.documents_chunked += 1;
            }
            None => {
                report.documents_dropped += 1;
                report.tokens_dropped += doc_tokens;
            }
        }
    }

    report.tokens_used = total;
    debug!(
        budget = max_article_tokens,
        used = total,
        verbatim = report.documents_verbatim,
        compressed = report.documents_compressed,
        chunked = report.documents_chunked,
        dropped = report.documents_dropped,
        "Article content budgeted"
    );

    BudgetedArticles { messages, report }
}

/// Most important first; equal scores keep document order.
fn selection_order(a: &ChunkCandidate, b: &ChunkCandidate) -> Ordering {
    b.importance
        .total_cmp(&a.importance)
        .then(a.position_index.cmp(&b.position_index))
}

/// Pick the most relevant chunks of an oversized document.
///
/// Returns `None` when not a single chunk fits.
fn select_chunks(
    document: &str,
    max_article_tokens: usize,
    running_total: usize,
    user_query: &str,
    max_chunk_size: usize,
) -> Option<String> {
    let mut candidates = build_chunk_candidates(document, max_chunk_size, user_query);
    let total_chunks = candidates.len();

    candidates.sort_by(selection_order);

    let mut chunk_tokens = 0usize;
    let mut selected: Vec<&str> = Vec::new();
    for candidate in &candidates {
        let next = chunk_tokens + candidate.estimated_tokens;
        if next <= max_article_tokens && running_total + next <= max_article_tokens {
            selected.push(&candidate.text);
            chunk_tokens = next;
        }
    }

    if selected.is_empty() {
        return None;
    }

    let body = selected.join(CHUNK_SEPARATOR);
    if selected.len() < total_chunks {
        Some(format!(
            "[Long document: showing {} of {} most relevant sections]\n\n{}",
            selected.len(),
            total_chunks,
            body
        ))
    } else {
        Some(body)
    }
}
