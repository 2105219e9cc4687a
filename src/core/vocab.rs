//! Vocabulary loaders.
//!
//! The engine only consumes parsed [`VocabularyTable`]s; this module is the
//! adapter that produces them from the two on-disk formats the r50k, p50k and
//! cl100k vocabularies are published in.
//!
//! # Tiktoken Format
//!
//! One token per line, a base64-encoded byte sequence, a space, and its rank.
//! The rank doubles as the token id and as the merge priority of the bytes.
//!
//! ```text
//! SGVsbG8= 0
//! V29ybGQ= 1
//! IQ== 2
//! ```
//!
//! # GPT-2 Format
//!
//! An `encoder.json` object mapping symbol strings to ids, plus a `vocab.bpe`
//! merge list with one `left right` pair per line in rank order, after a
//! `#version` header. Both files spell bytes in the
//! [`byte_level`](crate::core::byte_level) alphabet.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::byte_level::decode_symbols;
use super::error::TokenizerError;
use super::table::VocabularyTable;

/// Errors that can occur when loading vocabulary files.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("Invalid base64 encoding: {0}")]
    Base64Error(#[from] base64::DecodeError),
    #[error("Invalid line format: {0}")]
    ParseError(String),
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Load a tiktoken BPE rank map from raw bytes.
///
/// Format: `base64_token rank\n` per line
/// Example: `SGVsbG8= 0` (where "SGVsbG8=" decodes to "Hello")
pub fn load_tiktoken_bpe(data: &[u8]) -> Result<FxHashMap<Vec<u8>, u32>, VocabError> {
    let mut encoder = FxHashMap::default();

    for line in data.split(|&b| b == b'\n') {
        if line.is_empty() {
            continue;
        }

        let space_pos = line
            .iter()
            .rposition(|&b| b == b' ')
            .ok_or_else(|| VocabError::ParseError("Missing space separator".to_string()))?;

        let token = STANDARD.decode(&line[..space_pos])?;

        let rank_str = std::str::from_utf8(&line[space_pos + 1..])
            .map_err(|_| VocabError::ParseError("Invalid UTF-8 in rank".to_string()))?;
        let rank: u32 = rank_str
            .trim()
            .parse()
            .map_err(|_| VocabError::ParseError(format!("Invalid rank: {}", rank_str)))?;

        if encoder.insert(token, rank).is_some() {
            return Err(VocabError::ParseError(format!(
                "Duplicate token at rank {}",
                rank
            )));
        }
    }

    Ok(encoder)
}

/// Load a tiktoken rank file into a vocabulary table.
pub fn load_tiktoken_table(data: &[u8]) -> Result<VocabularyTable, TokenizerError> {
    VocabularyTable::from_ranks(load_tiktoken_bpe(data)?)
}

/// Load a tiktoken rank file from a path into a vocabulary table.
pub fn load_tiktoken_file(path: impl AsRef<Path>) -> Result<VocabularyTable, TokenizerError> {
    let data = std::fs::read(path).map_err(VocabError::from)?;
    load_tiktoken_table(&data)
}

/// Load a GPT-2 style `encoder.json` + `vocab.bpe` pair into a vocabulary table.
pub fn load_gpt2_bpe(
    encoder_json: &[u8],
    vocab_bpe: &[u8],
) -> Result<VocabularyTable, TokenizerError> {
    let encoder: FxHashMap<String, u32> =
        serde_json::from_slice(encoder_json).map_err(VocabError::from)?;

    let mut tokens: Vec<Option<Vec<u8>>> = vec![None; encoder.len()];
    for (symbols, id) in encoder {
        let bytes = decode_symbols(&symbols).ok_or_else(|| {
            VocabError::ParseError(format!("Token outside byte alphabet: {}", symbols))
        })?;
        let slot = tokens.get_mut(id as usize).ok_or_else(|| {
            TokenizerError::MalformedVocabularyTable(format!("token id {} is not dense", id))
        })?;
        *slot = Some(bytes);
    }
    let tokens = tokens
        .into_iter()
        .enumerate()
        .map(|(id, bytes)| {
            bytes.ok_or_else(|| {
                TokenizerError::MalformedVocabularyTable(format!("token id {} is missing", id))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let text = std::str::from_utf8(vocab_bpe)
        .map_err(|_| VocabError::ParseError("Merge list is not UTF-8".to_string()))?;
    let mut merges = Vec::new();
    for line in text.lines() {
        if line.is_empty() || line.starts_with("#version") {
            continue;
        }
        let (left, right) = line
            .split_once(' ')
            .ok_or_else(|| VocabError::ParseError(format!("Invalid merge: {}", line)))?;
        let decode = |symbols: &str| {
            decode_symbols(symbols).ok_or_else(|| {
                VocabError::ParseError(format!("Merge outside byte alphabet: {}", line))
            })
        };
        merges.push((decode(left)?, decode(right)?));
    }

    VocabularyTable::from_merges(tokens, merges)
}

/// Load a GPT-2 style vocabulary from its two files.
pub fn load_gpt2_files(
    encoder_path: impl AsRef<Path>,
    merges_path: impl AsRef<Path>,
) -> Result<VocabularyTable, TokenizerError> {
    let encoder = std::fs::read(encoder_path).map_err(VocabError::from)?;
    let merges = std::fs::read(merges_path).map_err(VocabError::from)?;
    load_gpt2_bpe(&encoder, &merges)
}
