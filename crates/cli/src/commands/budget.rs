//! `notechat budget`: Assemble a request and print what would be sent.

use anyhow::Context;
use notechat_agent::{AssemblyInput, ContextAssembler};
use notechat_config::AppConfig;
use notechat_core::message::ChatMessage;
use std::path::{Path, PathBuf};

pub struct BudgetArgs {
    pub message: String,
    pub docs: Vec<PathBuf>,
    pub history: Option<PathBuf>,
    pub total_tokens: Option<usize>,
    pub role_prompt: String,
}

pub fn run(args: BudgetArgs) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let report = assemble(&args, &config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Build the request described by `args` and render it as JSON.
fn assemble(args: &BudgetArgs, config: &AppConfig) -> anyhow::Result<serde_json::Value> {
    let mut budget = config.budget.clone();
    if let Some(total) = args.total_tokens {
        anyhow::ensure!(total > 0, "--total-tokens must be > 0");
        budget.total_tokens = total;
    }

    let documents = args
        .docs
        .iter()
        .map(|path| super::read_input(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let history = match &args.history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };

    let assembled = ContextAssembler::from_config(&budget).assemble(&AssemblyInput {
        system_prompt: &config.system_prompt,
        role_prompt: &args.role_prompt,
        documents: &documents,
        history: &history,
        user_message: &args.message,
    });

    if assembled.metadata.over_budget {
        eprintln!(
            "warning: request is {} tokens, over the {} token budget",
            assembled.metadata.total_tokens, assembled.metadata.budget
        );
    }

    Ok(serde_json::json!({
        "messages": assembled.messages,
        "metadata": assembled.metadata,
    }))
}

/// Read prior turns from a JSON array of `{role, content}` objects.
fn load_history(path: &Path) -> anyhow::Result<Vec<ChatMessage>> {
    let raw = super::read_input(path)?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of messages", path.display()))
}
