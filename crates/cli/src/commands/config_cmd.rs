//! `notechat config`: Show or initialize configuration.

use anyhow::Context;
use notechat_config::AppConfig;
use std::path::Path;

pub fn run(init: bool) -> anyhow::Result<()> {
    let config_path = AppConfig::config_dir().join("config.toml");

    if init {
        if write_default(&config_path)? {
            println!("✅ Wrote default config to {}", config_path.display());
        } else {
            println!("⚠️  Config already exists at {}", config_path.display());
        }
        return Ok(());
    }

    let config = AppConfig::load().context("Failed to load config")?;
    println!("# {}", config_path.display());
    println!("{}", render(&config)?);
    if !config.has_api_key() {
        println!("# No API key set (add api_key or set NOTECHAT_API_KEY)");
    }
    Ok(())
}

/// Write the default config unless a file is already there.
fn write_default(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "Default config written");
    Ok(true)
}

/// Render `config` as TOML with the API key masked.
fn render(config: &AppConfig) -> anyhow::Result<String> {
    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some("***".into());
    }
    Ok(toml::to_string_pretty(&shown)?)
}
