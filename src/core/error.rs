use thiserror::Error;

use super::vocab::VocabError;

/// Errors raised by vocabulary construction, encoding and decoding.
///
/// None of these are retriable: a call either fully succeeds or fails as a whole.
#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Unknown token id: {0}")]
    UnknownTokenId(u32),
    #[error("No token for byte sequence {0:?}")]
    UnknownByteSequence(Vec<u8>),
    #[error("Merged symbol {0:?} has no token id")]
    UnmergeableSymbol(Vec<u8>),
    #[error("Invalid vocabulary: {0}")]
    InvalidVocabulary(String),
    #[error("Vocabulary not loaded: {0}")]
    VocabularyNotLoaded(String),
    #[error("Malformed vocabulary table: {0}")]
    MalformedVocabularyTable(String),
    #[error("Vocabulary error: {0}")]
    VocabError(#[from] VocabError),
    #[error("Decoding error: invalid UTF-8")]
    Utf8Error,
    #[error("Regex compilation error (regexr): {0}")]
    RegexrError(#[from] regexr::Error),
    #[cfg(feature = "pcre2")]
    #[error("Regex compilation error (PCRE2): {0}")]
    Pcre2Error(#[from] pcre2::Error),
    #[error("PCRE2 feature not enabled. Compile with --features pcre2")]
    Pcre2NotEnabled,
    #[error("Aho-Corasick build error: {0}")]
    AhoCorasickError(#[from] aho_corasick::BuildError),
}
