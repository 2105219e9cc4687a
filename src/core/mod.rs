//! Core tokenization engine for gptbpe.
//!
//! This module contains the byte-level BPE implementation with:
//! - Immutable vocabulary tables shared across threads behind `Arc`
//! - Regex pre-tokenization aligned to grapheme cluster boundaries
//! - Lowest-rank, leftmost-first pair merging with a heap fallback for long chunks
//! - Loaders for tiktoken rank files and GPT-2 `encoder.json` + `vocab.bpe`
//!
//! # Architecture
//!
//! - [`Codec`]: entry point selecting a [`Vocabulary`] per call
//! - [`Tokenizer`]: encode/decode for one vocabulary, Aho-Corasick special
//!   token matching and Rayon batch methods
//! - [`PreTokenizer`]: chunking with the regexr (default) or PCRE2 backend
//! - [`bpe`]: the merge loops
//! - [`grapheme`](mod@grapheme): per-byte grapheme boundary labels
//! - [`VocabularyTable`]: id ⇄ bytes bijection and merge ranks
//! - [`vocab`]: file format loaders

pub mod bpe;
pub mod byte_level;
mod codec;
mod error;
pub mod grapheme;
pub mod pretokenize;
pub mod pretrained;
mod table;
mod tokenizer;
pub mod vocab;

pub use bpe::{byte_pair_encode, byte_pair_split};
pub use codec::Codec;
pub use error::TokenizerError;
pub use grapheme::{cluster_boundaries, cluster_ranges, grapheme, BoundaryClass};
pub use pretokenize::{PreTokenizer, CL100K_BASE_PATTERN, R50K_BASE_PATTERN};
pub use pretrained::Vocabulary;
pub use table::{MergeRule, Rank, VocabularyTable};
pub use tokenizer::Tokenizer;
pub use vocab::{
    load_gpt2_bpe, load_gpt2_files, load_tiktoken_bpe, load_tiktoken_file, load_tiktoken_table,
    VocabError,
};
