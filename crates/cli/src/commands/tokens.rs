//! `notechat tokens`: Estimate tokens for a piece of text.

use notechat_agent::context::token::{MESSAGE_OVERHEAD_TOKENS, estimate_tokens};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TokenSummary {
    pub chars: usize,
    pub bytes: usize,
    pub tokens: usize,
    /// Cost of the text sent as one message.
    pub message_tokens: usize,
}

pub fn summarize(text: &str) -> TokenSummary {
    let tokens = estimate_tokens(text);
    TokenSummary {
        chars: text.chars().count(),
        bytes: text.len(),
        tokens,
        message_tokens: tokens + MESSAGE_OVERHEAD_TOKENS,
    }
}

pub fn run(text: &str) -> anyhow::Result<()> {
    let text = if text == "-" {
        super::read_input(Path::new("-"))?
    } else {
        text.to_string()
    };

    let summary = summarize(&text);
    println!("  Characters:      {}", summary.chars);
    println!("  Bytes:           {}", summary.bytes);
    println!("  Tokens (est.):   {}", summary.tokens);
    println!("  As a message:    {}", summary.message_tokens);
    Ok(())
}
