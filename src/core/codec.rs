//! Public entry point: encode, decode and grapheme over a selected vocabulary.
//!
//! A [`Codec`] owns at most one [`Tokenizer`] per [`Vocabulary`]. Tables are
//! loaded once and then only read, so a codec can be shared freely across
//! threads (it is `Send + Sync`) without synchronization.
//!
//! # Example
//!
//! ```rust,ignore
//! use gptbpe::{Codec, Vocabulary};
//!
//! let codec = Codec::from_dir("/usr/share/gptbpe")?;
//! let ids = codec.encode("hello world", Vocabulary::Cl100k)?;
//! assert_eq!(codec.decode(&ids, Vocabulary::Cl100k)?, b"hello world");
//! ```

use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::{info, warn};

use super::error::TokenizerError;
use super::grapheme::{self, BoundaryClass};
use super::pretrained::{from_table, Vocabulary};
use super::table::VocabularyTable;
use super::tokenizer::Tokenizer;
use super::vocab::{load_tiktoken_file, VocabError};

/// Registry of per-vocabulary tokenizers.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    tokenizers: FxHashMap<Vocabulary, Tokenizer>,
}

impl Codec {
    /// A codec with no vocabulary loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed table for `vocab`, replacing any previous one.
    pub fn with_table(
        self,
        vocab: Vocabulary,
        table: VocabularyTable,
    ) -> Result<Self, TokenizerError> {
        Ok(self.with_tokenizer(vocab, from_table(vocab, table)?))
    }

    /// Register an already configured tokenizer for `vocab`.
    pub fn with_tokenizer(mut self, vocab: Vocabulary, tokenizer: Tokenizer) -> Self {
        self.tokenizers.insert(vocab, tokenizer);
        self
    }

    /// Load every `<name>.tiktoken` rank file found in `dir`.
    ///
    /// Missing files are skipped; a file that is present but malformed is an
    /// error.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, TokenizerError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(VocabError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("vocabulary directory {} not found", dir.display()),
            ))
            .into());
        }

        let mut codec = Self::new();
        for vocab in Vocabulary::ALL {
            let path = dir.join(vocab.file_name());
            if !path.is_file() {
                continue;
            }
            let table = load_tiktoken_file(&path)?;
            info!(
                vocab = vocab.name(),
                tokens = table.len(),
                path = %path.display(),
                "loaded vocabulary"
            );
            codec = codec.with_table(vocab, table)?;
        }

        if codec.tokenizers.is_empty() {
            warn!(dir = %dir.display(), "no vocabulary files found");
        }
        Ok(codec)
    }

    /// Whether a table is registered for `vocab`.
    pub fn is_loaded(&self, vocab: Vocabulary) -> bool {
        self.tokenizers.contains_key(&vocab)
    }

    /// Vocabularies with a registered table, in declaration order.
    pub fn loaded(&self) -> Vec<Vocabulary> {
        Vocabulary::ALL
            .into_iter()
            .filter(|vocab| self.is_loaded(*vocab))
            .collect()
    }

    /// The tokenizer serving `vocab`.
    pub fn tokenizer(&self, vocab: Vocabulary) -> Result<&Tokenizer, TokenizerError> {
        self.tokenizers
            .get(&vocab)
            .ok_or_else(|| TokenizerError::VocabularyNotLoaded(vocab.name().to_string()))
    }

    /// Encode `bytes` under `vocab`. Empty input gives empty output.
    pub fn encode(
        &self,
        bytes: impl AsRef<[u8]>,
        vocab: Vocabulary,
    ) -> Result<Vec<u32>, TokenizerError> {
        self.tokenizer(vocab)?.encode(bytes)
    }

    /// Encode `bytes` under `vocab`, emitting special token ids for their text.
    pub fn encode_with_special(
        &self,
        bytes: impl AsRef<[u8]>,
        vocab: Vocabulary,
    ) -> Result<Vec<u32>, TokenizerError> {
        self.tokenizer(vocab)?.encode_with_special(bytes)
    }

    /// Decode `ids` under `vocab`. Fails with `UnknownTokenId` on any unknown id.
    pub fn decode(&self, ids: &[u32], vocab: Vocabulary) -> Result<Vec<u8>, TokenizerError> {
        self.tokenizer(vocab)?.decode(ids)
    }

    /// Per-byte grapheme boundary labels. Independent of any vocabulary.
    pub fn grapheme(&self, bytes: impl AsRef<[u8]>) -> Vec<BoundaryClass> {
        grapheme::grapheme(bytes.as_ref())
    }
}
