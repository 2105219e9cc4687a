//! gptbpe - deterministic byte-level BPE for the r50k, p50k and cl100k vocabularies
//!
//! - `encode(bytes, vocabulary) -> ids` and `decode(ids, vocabulary) -> bytes`
//!   reproduce the published tokenizations bit for bit
//! - `grapheme(bytes)` labels every byte with its grapheme boundary class
//! - Input is raw bytes; invalid UTF-8 is tokenized at the byte level
//!
//! Tables are parsed once by a loader and shared read-only, so every call is a
//! pure function over immutable data and can run on any number of threads.

pub mod cli;
pub mod core;

pub use crate::core::{
    grapheme, pretrained, vocab, BoundaryClass, Codec, PreTokenizer, Tokenizer, TokenizerError,
    Vocabulary, VocabularyTable, CL100K_BASE_PATTERN, R50K_BASE_PATTERN,
};
