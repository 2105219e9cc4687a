//! Immutable vocabulary tables.
//!
//! A [`VocabularyTable`] holds the token id ⇄ byte sequence bijection and the
//! pair-merge priorities for one vocabulary. Tables are built once by a loader
//! (see [`crate::core::vocab`]) and never mutated afterwards, so a single table
//! can be shared behind an `Arc` by any number of concurrent readers.
//!
//! # Merge rules
//!
//! Two families of rank tables exist in the wild:
//!
//! - **Rank files** (tiktoken format): every token carries a rank equal to its
//!   id, and merging `left` with `right` is ranked by the id of `left ++ right`.
//!   This is [`MergeRule::Concatenation`].
//! - **Merge lists** (GPT-2 `vocab.bpe`): an explicit, rank-ordered list of
//!   `(left, right)` pairs. This is [`MergeRule::Pairs`].
//!
//! Both produce the same lookup contract through [`VocabularyTable::rank_of`]:
//! a present rank always means the concatenation has an id.

use rustc_hash::FxHashMap;
use tracing::debug;

use super::error::TokenizerError;

/// Merge priority. Lower ranks merge first.
pub type Rank = u32;

/// How adjacent symbol pairs are ranked.
#[derive(Debug, Clone)]
pub enum MergeRule {
    /// Rank of a pair is the id of the concatenated bytes.
    Concatenation,
    /// Explicit merge list keyed by the ids of the left and right symbols.
    Pairs(FxHashMap<(u32, u32), Rank>),
}

/// Token id ⇄ bytes bijection plus merge ranks for a single vocabulary.
#[derive(Debug, Clone)]
pub struct VocabularyTable {
    id_to_bytes: FxHashMap<u32, Vec<u8>>,
    bytes_to_id: FxHashMap<Vec<u8>, u32>,
    merges: MergeRule,
    max_token_id: Option<u32>,
}

impl VocabularyTable {
    /// Build a table from a rank map where each token's rank is also its id.
    ///
    /// Ranks must be distinct. They may leave gaps: p50k_base skips 50256,
    /// which belongs to `<|endoftext|>`.
    pub fn from_ranks(encoder: FxHashMap<Vec<u8>, u32>) -> Result<Self, TokenizerError> {
        let mut id_to_bytes = FxHashMap::default();
        id_to_bytes.reserve(encoder.len());

        for (bytes, &id) in &encoder {
            if bytes.is_empty() {
                return Err(TokenizerError::MalformedVocabularyTable(format!(
                    "rank {} has an empty byte sequence",
                    id
                )));
            }
            if id_to_bytes.insert(id, bytes.clone()).is_some() {
                return Err(TokenizerError::MalformedVocabularyTable(format!(
                    "rank {} assigned to more than one byte sequence",
                    id
                )));
            }
        }

        let table = Self {
            max_token_id: id_to_bytes.keys().max().copied(),
            id_to_bytes,
            bytes_to_id: encoder,
            merges: MergeRule::Concatenation,
        };
        table.check_byte_alphabet()?;

        debug!(
            tokens = table.len(),
            max_token_id = table.max_token_id,
            "built rank-ordered vocabulary table"
        );
        Ok(table)
    }

    /// Build a table from an id-ordered token list and a rank-ordered merge list.
    ///
    /// `tokens[i]` is the byte sequence of token id `i`; `merges[r]` is the pair
    /// merged at rank `r`.
    pub fn from_merges(
        tokens: Vec<Vec<u8>>,
        merges: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<Self, TokenizerError> {
        let mut bytes_to_id = FxHashMap::default();
        bytes_to_id.reserve(tokens.len());

        for (id, bytes) in tokens.iter().enumerate() {
            let id = u32::try_from(id).map_err(|_| {
                TokenizerError::MalformedVocabularyTable("too many tokens".to_string())
            })?;
            if bytes.is_empty() {
                return Err(TokenizerError::MalformedVocabularyTable(format!(
                    "token {} has an empty byte sequence",
                    id
                )));
            }
            if let Some(previous) = bytes_to_id.insert(bytes.clone(), id) {
                return Err(TokenizerError::MalformedVocabularyTable(format!(
                    "byte sequence {:?} has ids {} and {}",
                    bytes, previous, id
                )));
            }
        }

        let mut pairs = FxHashMap::default();
        pairs.reserve(merges.len());

        for (rank, (left, right)) in merges.iter().enumerate() {
            let lookup = |bytes: &[u8]| {
                bytes_to_id.get(bytes).copied().ok_or_else(|| {
                    TokenizerError::MalformedVocabularyTable(format!(
                        "merge {} references {:?} which has no id",
                        rank, bytes
                    ))
                })
            };
            let left_id = lookup(left.as_slice())?;
            let right_id = lookup(right.as_slice())?;
            let mut merged = Vec::with_capacity(left.len() + right.len());
            merged.extend_from_slice(left);
            merged.extend_from_slice(right);
            lookup(merged.as_slice())?;

            if pairs.insert((left_id, right_id), rank as Rank).is_some() {
                return Err(TokenizerError::MalformedVocabularyTable(format!(
                    "merge pair {:?} + {:?} listed twice",
                    left, right
                )));
            }
        }

        let table = Self {
            max_token_id: tokens.len().checked_sub(1).map(|id| id as u32),
            id_to_bytes: bytes_to_id.iter().map(|(bytes, &id)| (id, bytes.clone())).collect(),
            bytes_to_id,
            merges: MergeRule::Pairs(pairs),
        };
        table.check_byte_alphabet()?;

        debug!(
            tokens = table.len(),
            merges = merges.len(),
            "built merge-list vocabulary table"
        );
        Ok(table)
    }

    /// Every single byte must be a symbol, otherwise arbitrary input cannot be encoded.
    fn check_byte_alphabet(&self) -> Result<(), TokenizerError> {
        match (0u8..=255).find(|b| !self.bytes_to_id.contains_key([*b].as_slice())) {
            Some(missing) => Err(TokenizerError::MalformedVocabularyTable(format!(
                "single byte 0x{:02X} has no id",
                missing
            ))),
            None => Ok(()),
        }
    }

    /// Byte sequence of a token id.
    #[inline]
    pub fn bytes_of(&self, id: u32) -> Result<&[u8], TokenizerError> {
        self.id_to_bytes
            .get(&id)
            .map(Vec::as_slice)
            .ok_or(TokenizerError::UnknownTokenId(id))
    }

    /// Token id of an exact byte sequence.
    #[inline]
    pub fn id_of(&self, bytes: &[u8]) -> Result<u32, TokenizerError> {
        self.bytes_to_id
            .get(bytes)
            .copied()
            .ok_or_else(|| TokenizerError::UnknownByteSequence(bytes.to_vec()))
    }

    /// Token id of an exact byte sequence, if there is one.
    #[inline]
    pub fn get(&self, bytes: &[u8]) -> Option<u32> {
        self.bytes_to_id.get(bytes).copied()
    }

    /// Whether `bytes` is a token of this vocabulary.
    #[inline]
    pub fn contains(&self, bytes: &[u8]) -> bool {
        self.bytes_to_id.contains_key(bytes)
    }

    /// Merge rank of two adjacent symbols, or `None` if they never merge.
    pub fn rank_of(&self, left: &[u8], right: &[u8]) -> Option<Rank> {
        match &self.merges {
            MergeRule::Concatenation => {
                let mut merged = Vec::with_capacity(left.len() + right.len());
                merged.extend_from_slice(left);
                merged.extend_from_slice(right);
                self.bytes_to_id.get(&merged).copied()
            }
            MergeRule::Pairs(pairs) => {
                let left = self.bytes_to_id.get(left)?;
                let right = self.bytes_to_id.get(right)?;
                pairs.get(&(*left, *right)).copied()
            }
        }
    }

    /// Rank of merging `piece[start..mid]` with `piece[mid..end]`.
    ///
    /// Symbols inside a chunk are always contiguous, so the concatenation is a
    /// plain sub-slice and needs no allocation.
    #[inline]
    pub(crate) fn span_rank(
        &self,
        piece: &[u8],
        start: usize,
        mid: usize,
        end: usize,
    ) -> Option<Rank> {
        match &self.merges {
            MergeRule::Concatenation => self.bytes_to_id.get(&piece[start..end]).copied(),
            MergeRule::Pairs(pairs) => {
                let left = self.bytes_to_id.get(&piece[start..mid])?;
                let right = self.bytes_to_id.get(&piece[mid..end])?;
                pairs.get(&(*left, *right)).copied()
            }
        }
    }

    /// The merge rule this table was built with.
    pub fn merge_rule(&self) -> &MergeRule {
        &self.merges
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.bytes_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_to_id.is_empty()
    }

    /// Largest token id in the table.
    pub fn max_token_id(&self) -> Option<u32> {
        self.max_token_id
    }
}
