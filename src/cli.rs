//! Shared utilities for the `gptbpe` command-line tool.

use std::io::Read;
use std::path::Path;

use crate::core::BoundaryClass;

/// Initialize tracing/logging to stderr.
///
/// If `disable` is true, no output is produced.
/// Otherwise respects `RUST_LOG` env var, defaulting to WARN.
pub fn init_logging(disable: bool) {
    use tracing_subscriber::EnvFilter;

    if disable {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read raw input bytes from one of: prompt string, file path, or stdin.
///
/// Files and stdin are read as bytes, so input that is not valid UTF-8 still
/// reaches the tokenizer unchanged.
pub fn read_input(
    prompt: Option<&str>,
    file: Option<&Path>,
    use_stdin: bool,
) -> Result<Vec<u8>, String> {
    if let Some(text) = prompt {
        return Ok(text.as_bytes().to_vec());
    }

    if let Some(path) = file {
        return std::fs::read(path)
            .map_err(|e| format!("Failed to read file '{}': {}", path.display(), e));
    }

    if use_stdin {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(buf);
    }

    Err("No input provided. Use --prompt, --file, or --stdin".to_string())
}

/// Parse token ids written as `[1, 2, 3]`, `1,2,3` or whitespace separated.
pub fn parse_ids(text: &str) -> Result<Vec<u32>, String> {
    text.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map_err(|_| format!("Invalid token id '{}'", part))
        })
        .collect()
}

/// One digit per byte, `0`..=`3`, matching the numeric boundary classes.
pub fn format_labels(labels: &[BoundaryClass]) -> String {
    labels
        .iter()
        .map(|&class| char::from(b'0' + u8::from(class)))
        .collect()
}
