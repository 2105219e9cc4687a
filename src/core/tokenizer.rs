use std::ops::Range;
use std::sync::Arc;

use aho_corasick::AhoCorasick;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::bpe::byte_pair_encode;
use super::error::TokenizerError;
use super::pretokenize::PreTokenizer;
use super::table::{MergeRule, VocabularyTable};

/// Byte-level BPE tokenizer for a single vocabulary.
///
/// Encoding runs the pre-tokenizer over the input bytes, merges each chunk
/// independently against the shared [`VocabularyTable`] and concatenates the
/// resulting ids in input order. Decoding maps each id back to its bytes.
///
/// Chunk edges are kept on grapheme cluster boundaries by default; see
/// [`grapheme_aligned`](Self::grapheme_aligned) for where that departs from
/// tiktoken.
///
/// The table is held behind an `Arc` and never mutated, so one tokenizer (or
/// many clones of it) can serve any number of threads without locking.
///
/// # Regex Backend
///
/// By default, uses the `regexr` backend (pure Rust with JIT and SIMD support).
/// To use PCRE2 instead, enable the `pcre2` feature and call `.pcre2(true)`:
///
/// ```ignore
/// let tokenizer = Tokenizer::new(table, CL100K_BASE_PATTERN, special)?.pcre2(true)?;
/// ```
///
/// # Special Tokens
///
/// [`encode`](Self::encode) treats special token text as ordinary bytes.
/// [`encode_with_special`](Self::encode_with_special) recognizes it with an
/// Aho-Corasick automaton and emits the special id directly. Special ids are
/// always accepted by [`decode`](Self::decode).
#[derive(Debug, Clone)]
pub struct Tokenizer {
    table: Arc<VocabularyTable>,
    pretokenizer: PreTokenizer,
    special_tokens: FxHashMap<String, u32>,
    special_tokens_decoder: FxHashMap<u32, String>,
    special_token_strings: Vec<String>,
    special_matcher: Option<AhoCorasick>,
}

impl Tokenizer {
    /// Create a tokenizer over `table` that chunks input with `pattern`.
    ///
    /// # Errors
    ///
    /// Fails if the pattern does not compile or a special token id belongs to
    /// a regular token with different bytes.
    pub fn new(
        table: Arc<VocabularyTable>,
        pattern: &str,
        special_tokens: FxHashMap<String, u32>,
    ) -> Result<Self, TokenizerError> {
        // GPT-2 era tables may list a special token as a regular entry too.
        let clashes = |text: &String, id: u32| {
            table
                .bytes_of(id)
                .is_ok_and(|bytes| bytes != text.as_bytes())
        };
        if let Some((text, id)) = special_tokens.iter().find(|&(text, &id)| clashes(text, id)) {
            return Err(TokenizerError::MalformedVocabularyTable(format!(
                "special token {} reuses regular token id {}",
                text, id
            )));
        }

        let special_tokens_decoder: FxHashMap<u32, String> = special_tokens
            .iter()
            .map(|(k, v)| (*v, k.clone()))
            .collect();

        let mut special_token_strings: Vec<String> = special_tokens.keys().cloned().collect();
        special_token_strings.sort();
        let special_matcher = if special_token_strings.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(&special_token_strings)?)
        };

        debug!(
            tokens = table.len(),
            special = special_tokens.len(),
            "created tokenizer"
        );

        Ok(Self {
            table,
            pretokenizer: PreTokenizer::new(pattern)?,
            special_tokens,
            special_tokens_decoder,
            special_token_strings,
            special_matcher,
        })
    }

    /// Use PCRE2 instead of regexr for chunking. Requires the `pcre2` feature.
    pub fn pcre2(mut self, use_pcre2: bool) -> Result<Self, TokenizerError> {
        self.pretokenizer = self.pretokenizer.pcre2(use_pcre2)?;
        Ok(self)
    }

    /// Enable or disable JIT compilation of the chunking regex.
    pub fn jit(mut self, use_jit: bool) -> Result<Self, TokenizerError> {
        self.pretokenizer = self.pretokenizer.jit(use_jit)?;
        Ok(self)
    }

    /// Keep chunk edges on grapheme cluster boundaries (on by default).
    ///
    /// While on, input whose regex chunks split a grapheme cluster (a
    /// decomposed combining mark, or `"\r\n"` under the r50k pattern) encodes
    /// differently from tiktoken. Pass `false` for regex-only chunking.
    pub fn grapheme_aligned(mut self, grapheme_aligned: bool) -> Self {
        self.pretokenizer = self.pretokenizer.grapheme_aligned(grapheme_aligned);
        self
    }

    /// Chunk ranges the pre-tokenizer produces for `input`.
    pub fn chunks(&self, input: impl AsRef<[u8]>) -> Vec<Range<usize>> {
        self.pretokenizer.chunks(input.as_ref())
    }

    /// Encode bytes to token IDs (ignores special tokens in input).
    ///
    /// Input need not be valid UTF-8. Empty input encodes to no ids.
    pub fn encode(&self, input: impl AsRef<[u8]>) -> Result<Vec<u32>, TokenizerError> {
        let bytes = input.as_ref();
        let chunks = self.pretokenizer.chunks(bytes);
        trace!(bytes = bytes.len(), chunks = chunks.len(), "encode");

        let mut ids = Vec::with_capacity(chunks.len());
        for range in chunks {
            self.encode_chunk(&bytes[range], &mut ids)?;
        }
        Ok(ids)
    }

    fn encode_chunk(&self, piece: &[u8], ids: &mut Vec<u32>) -> Result<(), TokenizerError> {
        // A rank file lists every token it can produce, so a chunk that is
        // itself a token encodes to that token.
        if matches!(self.table.merge_rule(), MergeRule::Concatenation) {
            if let Some(id) = self.table.get(piece) {
                ids.push(id);
                return Ok(());
            }
        }
        ids.extend(byte_pair_encode(piece, &self.table)?);
        Ok(())
    }

    /// Encode with special token handling.
    ///
    /// Special tokens in the input are encoded directly without BPE.
    pub fn encode_with_special(
        &self,
        input: impl AsRef<[u8]>,
    ) -> Result<Vec<u32>, TokenizerError> {
        let bytes = input.as_ref();
        let Some(ref special_matcher) = self.special_matcher else {
            return self.encode(bytes);
        };

        let mut result = Vec::new();
        let mut last_end = 0;

        for m in special_matcher.find_iter(bytes) {
            if m.start() > last_end {
                result.extend(self.encode(&bytes[last_end..m.start()])?);
            }

            let token_str = &self.special_token_strings[m.pattern().as_usize()];
            if let Some(&id) = self.special_tokens.get(token_str) {
                result.push(id);
            }

            last_end = m.end();
        }

        if last_end < bytes.len() {
            result.extend(self.encode(&bytes[last_end..])?);
        }

        Ok(result)
    }

    /// Decode token IDs back to bytes.
    ///
    /// Fails as a whole with `UnknownTokenId` on the first id that is neither a
    /// regular nor a special token.
    pub fn decode(&self, ids: &[u32]) -> Result<Vec<u8>, TokenizerError> {
        let mut result = Vec::with_capacity(ids.len() * 4);

        for &id in ids {
            if let Ok(bytes) = self.table.bytes_of(id) {
                result.extend_from_slice(bytes);
            } else if let Some(special) = self.special_tokens_decoder.get(&id) {
                result.extend_from_slice(special.as_bytes());
            } else {
                return Err(TokenizerError::UnknownTokenId(id));
            }
        }

        Ok(result)
    }

    /// Decode token IDs to a string.
    pub fn decode_to_string(&self, ids: &[u32]) -> Result<String, TokenizerError> {
        String::from_utf8(self.decode(ids)?).map_err(|_| TokenizerError::Utf8Error)
    }

    /// Decode token IDs to a string, replacing invalid UTF-8 with replacement character.
    pub fn decode_lossy(&self, ids: &[u32]) -> Result<String, TokenizerError> {
        let bytes = self.decode(ids)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Batch encode multiple inputs in parallel.
    pub fn encode_batch<T>(&self, inputs: &[T]) -> Result<Vec<Vec<u32>>, TokenizerError>
    where
        T: AsRef<[u8]> + Sync,
    {
        inputs.par_iter().map(|input| self.encode(input)).collect()
    }

    /// Batch encode multiple inputs with special token handling.
    pub fn encode_batch_with_special<T>(
        &self,
        inputs: &[T],
    ) -> Result<Vec<Vec<u32>>, TokenizerError>
    where
        T: AsRef<[u8]> + Sync,
    {
        inputs
            .par_iter()
            .map(|input| self.encode_with_special(input))
            .collect()
    }

    /// Batch decode multiple token lists in parallel.
    pub fn decode_batch(&self, id_lists: &[Vec<u32>]) -> Result<Vec<Vec<u8>>, TokenizerError> {
        id_lists.par_iter().map(|ids| self.decode(ids)).collect()
    }

    /// Largest id this tokenizer can produce or decode, special tokens included.
    pub fn max_token_id(&self) -> Option<u32> {
        let max_special = self.special_tokens.values().max().copied();
        self.table.max_token_id().max(max_special)
    }

    /// Get the vocabulary size (number of token ID slots, including special tokens).
    pub fn vocab_size(&self) -> usize {
        self.max_token_id().map_or(0, |id| id as usize + 1)
    }

    /// The shared vocabulary table.
    pub fn table(&self) -> &Arc<VocabularyTable> {
        &self.table
    }

    /// Get the special tokens map.
    pub fn special_tokens(&self) -> &FxHashMap<String, u32> {
        &self.special_tokens
    }

    pub fn pretokenizer(&self) -> &PreTokenizer {
        &self.pretokenizer
    }
}
