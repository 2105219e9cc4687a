//! The three published vocabularies.
//!
//! - `r50k_base` - GPT-2, GPT-3 (~50k tokens)
//! - `p50k_base` - Codex, text-davinci-002/003 (~50k tokens, adds whitespace runs)
//! - `cl100k_base` - GPT-3.5-turbo, GPT-4 (~100k tokens)
//!
//! Each vocabulary fixes its chunking pattern and special tokens. The rank
//! table itself comes from a loader; see [`crate::core::vocab`].
//!
//! # Example
//!
//! ```rust,ignore
//! use gptbpe::pretrained::{from_table, Vocabulary};
//! use gptbpe::vocab::load_tiktoken_file;
//!
//! let table = load_tiktoken_file("r50k_base.tiktoken")?;
//! let tokenizer = from_table(Vocabulary::R50k, table)?;
//! let ids = tokenizer.encode("hello")?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::error::TokenizerError;
use super::pretokenize::{CL100K_BASE_PATTERN, R50K_BASE_PATTERN};
use super::table::VocabularyTable;
use super::tokenizer::Tokenizer;

/// Closed set of supported vocabularies. There is no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vocabulary {
    /// OpenAI r50k_base (GPT-2, GPT-3)
    R50k,
    /// OpenAI p50k_base (Codex)
    P50k,
    /// OpenAI cl100k_base (GPT-3.5-turbo, GPT-4)
    Cl100k,
}

impl Vocabulary {
    pub const ALL: [Vocabulary; 3] = [Vocabulary::R50k, Vocabulary::P50k, Vocabulary::Cl100k];

    /// Parse vocabulary name from string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "r50k" | "r50k_base" => Some(Self::R50k),
            "p50k" | "p50k_base" => Some(Self::P50k),
            "cl100k" | "cl100k_base" => Some(Self::Cl100k),
            _ => None,
        }
    }

    /// Get all supported vocabulary names.
    pub fn supported_names() -> &'static [&'static str] {
        &[
            "r50k",
            "r50k_base",
            "p50k",
            "p50k_base",
            "cl100k",
            "cl100k_base",
        ]
    }

    /// Canonical name, as used in published file names.
    pub fn name(self) -> &'static str {
        match self {
            Self::R50k => "r50k_base",
            Self::P50k => "p50k_base",
            Self::Cl100k => "cl100k_base",
        }
    }

    /// Rank file name this vocabulary is distributed as.
    pub fn file_name(self) -> String {
        format!("{}.tiktoken", self.name())
    }
}

impl FromStr for Vocabulary {
    type Err = TokenizerError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::from_name(name).ok_or_else(|| {
            TokenizerError::InvalidVocabulary(format!(
                "{}. Supported: {}",
                name,
                Self::supported_names().join(", ")
            ))
        })
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Create a tokenizer for `vocab` over an already loaded table.
pub fn from_table(vocab: Vocabulary, table: VocabularyTable) -> Result<Tokenizer, TokenizerError> {
    from_shared_table(vocab, Arc::new(table))
}

/// Like [`from_table`], for a table already shared with other tokenizers.
pub fn from_shared_table(
    vocab: Vocabulary,
    table: Arc<VocabularyTable>,
) -> Result<Tokenizer, TokenizerError> {
    Tokenizer::new(table, pattern(vocab), special_tokens(vocab))
}

/// Get the regex pattern for a vocabulary.
pub fn pattern(vocab: Vocabulary) -> &'static str {
    match vocab {
        // p50k only adds whitespace-run tokens to the table; chunking is unchanged.
        Vocabulary::R50k | Vocabulary::P50k => R50K_BASE_PATTERN,
        Vocabulary::Cl100k => CL100K_BASE_PATTERN,
    }
}

/// Get the EOS (end of sequence) token ID for a vocabulary.
pub fn eos_token_id(vocab: Vocabulary) -> u32 {
    match vocab {
        Vocabulary::R50k | Vocabulary::P50k => 50256, // <|endoftext|>
        Vocabulary::Cl100k => 100257,                 // <|endoftext|>
    }
}

/// Get the special tokens map for a vocabulary.
pub fn special_tokens(vocab: Vocabulary) -> FxHashMap<String, u32> {
    match vocab {
        Vocabulary::R50k => r50k_base_special_tokens(),
        Vocabulary::P50k => p50k_base_special_tokens(),
        Vocabulary::Cl100k => cl100k_base_special_tokens(),
    }
}

pub fn r50k_base_special_tokens() -> FxHashMap<String, u32> {
    let mut special = FxHashMap::default();
    special.insert("<|endoftext|>".to_string(), 50256);
    special
}

pub fn p50k_base_special_tokens() -> FxHashMap<String, u32> {
    r50k_base_special_tokens()
}

/// Get the standard special tokens for cl100k_base encoding (GPT-4, GPT-3.5-turbo).
pub fn cl100k_base_special_tokens() -> FxHashMap<String, u32> {
    let mut special = FxHashMap::default();
    special.insert("<|endoftext|>".to_string(), 100257);
    special.insert("<|fim_prefix|>".to_string(), 100258);
    special.insert("<|fim_middle|>".to_string(), 100259);
    special.insert("<|fim_suffix|>".to_string(), 100260);
    special.insert("<|endofprompt|>".to_string(), 100276);
    special
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::tests::rank_table;

    #[test]
    fn test_vocab_from_name() {
        assert_eq!(Vocabulary::from_name("r50k"), Some(Vocabulary::R50k));
        assert_eq!(Vocabulary::from_name("r50k_base"), Some(Vocabulary::R50k));
        assert_eq!(Vocabulary::from_name("p50k_base"), Some(Vocabulary::P50k));
        assert_eq!(Vocabulary::from_name("cl100k"), Some(Vocabulary::Cl100k));
        assert_eq!(Vocabulary::from_name("o200k_base"), None);
        assert_eq!(Vocabulary::from_name(""), None);
        assert_eq!(Vocabulary::from_name("R50K"), None);
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let err = "gpt2".parse::<Vocabulary>().unwrap_err();
        assert!(matches!(err, TokenizerError::InvalidVocabulary(_)));
        assert_eq!("p50k".parse::<Vocabulary>().unwrap(), Vocabulary::P50k);
    }

    #[test]
    fn test_names_round_trip() {
        for vocab in Vocabulary::ALL {
            assert_eq!(Vocabulary::from_name(vocab.name()), Some(vocab));
            assert_eq!(vocab.to_string(), vocab.name());
        }
        for name in Vocabulary::supported_names() {
            assert!(Vocabulary::from_name(name).is_some(), "{}", name);
        }
        assert_eq!(Vocabulary::Cl100k.file_name(), "cl100k_base.tiktoken");
    }

    #[test]
    fn test_eos_token_ids() {
        assert_eq!(eos_token_id(Vocabulary::R50k), 50256);
        assert_eq!(eos_token_id(Vocabulary::P50k), 50256);
        assert_eq!(eos_token_id(Vocabulary::Cl100k), 100257);
        for vocab in Vocabulary::ALL {
            let eos = special_tokens(vocab)["<|endoftext|>"];
            assert_eq!(eos, eos_token_id(vocab));
        }
    }

    #[test]
    fn test_cl100k_special_tokens() {
        let special = cl100k_base_special_tokens();
        assert_eq!(special.len(), 5);
        assert_eq!(special["<|fim_middle|>"], 100259);
        assert_eq!(special["<|endofprompt|>"], 100276);
    }

    #[test]
    fn test_pattern_is_per_vocabulary() {
        assert_eq!(pattern(Vocabulary::R50k), pattern(Vocabulary::P50k));
        assert_ne!(pattern(Vocabulary::R50k), pattern(Vocabulary::Cl100k));
    }

    #[test]
    fn test_from_table() {
        let tokenizer = from_table(Vocabulary::Cl100k, rank_table(&[b"hi"])).unwrap();
        assert_eq!(tokenizer.encode("hi").unwrap(), vec![256]);
        assert_eq!(tokenizer.max_token_id(), Some(100276));
    }
}
