//! `notechat chunk`: Split a note into scored chunks.

use notechat_agent::context::article::{ChunkCandidate, build_chunk_candidates};
use notechat_config::AppConfig;
use std::path::Path;

pub fn run(file: &Path, max_chunk_size: Option<usize>, query: &str) -> anyhow::Result<()> {
    let content = super::read_input(file)?;
    let max_chunk_size = match max_chunk_size {
        Some(size) => size,
        None => AppConfig::load()?.budget.max_chunk_size,
    };
    anyhow::ensure!(max_chunk_size > 0, "--max-chunk-size must be > 0");

    let candidates: Vec<ChunkCandidate> = build_chunk_candidates(&content, max_chunk_size, query);
    tracing::debug!(chunks = candidates.len(), max_chunk_size, "Note chunked");
    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_preserve_document_order() {
        let note = format!(
            "# Setup\n\nInstall the tools.\n\n{}\n\n## Deploy\n\nRun the deploy script.",
            "filler ".repeat(80)
        );
        let chunks = build_chunk_candidates(&note, 200, "deploy");
        assert!(chunks.len() >= 2);
        let positions: Vec<usize> = chunks.iter().map(|c| c.position_index).collect();
        assert_eq!(positions, (0..chunks.len()).collect::<Vec<_>>());
        assert!(chunks.iter().all(|c| c.total_chunks == chunks.len()));
    }

    #[test]
    fn candidates_serialize_to_json() {
        let chunks = build_chunk_candidates("One paragraph.", 2000, "");
        let json = serde_json::to_value(&chunks).unwrap();
        assert_eq!(json[0]["text"], "One paragraph.");
        assert_eq!(json[0]["position_index"], 0);
    }
}
