//! CLI subcommand implementations.

pub mod budget;
pub mod chunk;
pub mod config_cmd;
pub mod tokens;

use anyhow::Context;
use std::io::Read;
use std::path::Path;

/// Read a UTF-8 file, or stdin when `path` is `-`.
pub fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
