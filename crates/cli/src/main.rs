//! NoteChat CLI: inspect how notes and history are budgeted.
//!
//! Commands:
//! - `tokens`  Estimate tokens for a piece of text
//! - `chunk`   Split a note into scored, paragraph-aligned chunks
//! - `budget`  Assemble a request and print messages + metadata
//! - `config`  Show or initialize configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "notechat",
    about = "NoteChat: token-budgeted context assembly for note chat",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate tokens for TEXT (use `-` to read stdin)
    Tokens {
        text: String,
    },

    /// Split a note file into chunks and score them
    Chunk {
        file: PathBuf,

        /// Target chunk size in characters
        #[arg(long)]
        max_chunk_size: Option<usize>,

        /// Query used for keyword relevance
        #[arg(short, long, default_value = "")]
        query: String,
    },

    /// Assemble a request from notes, history and a new message
    Budget {
        /// The new user message
        #[arg(short, long)]
        message: String,

        /// Note/document file to attach (repeatable)
        #[arg(short, long = "doc")]
        docs: Vec<PathBuf>,

        /// JSON file with prior turns: [{"role": "...", "content": "..."}]
        #[arg(long)]
        history: Option<PathBuf>,

        /// Override the total token budget
        #[arg(short, long, env = "NOTECHAT_TOTAL_TOKENS")]
        total_tokens: Option<usize>,

        /// Persona prompt appended to the system prompt
        #[arg(long, default_value = "")]
        role_prompt: String,
    },

    /// Show configuration, or write a default config file
    Config {
        /// Write ~/.notechat/config.toml if it does not exist
        #[arg(long)]
        init: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout carries command output, logs go to stderr
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Tokens { text } => commands::tokens::run(&text)?,
        Commands::Chunk {
            file,
            max_chunk_size,
            query,
        } => commands::chunk::run(&file, max_chunk_size, &query)?,
        Commands::Budget {
            message,
            docs,
            history,
            total_tokens,
            role_prompt,
        } => commands::budget::run(commands::budget::BudgetArgs {
            message,
            docs,
            history,
            total_tokens,
            role_prompt,
        })?,
        Commands::Config { init } => commands::config_cmd::run(init)?,
    }

    Ok(())
}
