//! Pre-tokenization: splitting input bytes into independently merged chunks.
//!
//! Chunking is driven by a per-vocabulary regex. Input does not have to be
//! valid UTF-8: the regex only ever sees valid runs, every invalid sequence is
//! a chunk of its own, and bytes the regex leaves uncovered form chunks too, so
//! the returned ranges always tile the input.
//!
//! When grapheme alignment is on (the default), a chunk edge that falls
//! inside a grapheme cluster is dropped and the two neighbouring chunks are
//! joined. On precomposed text this never fires. It does change chunks, and
//! so token ids, relative to tiktoken for decomposed combining marks
//! (`"cafe\u{301}"` stays one chunk) and for `"\r\n"` under the r50k
//! pattern, which the regex alone splits into `"\r"` and `"\n"`.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use regexr::{Regex as RegexrRegex, RegexBuilder};
use tracing::debug;

#[cfg(feature = "pcre2")]
use pcre2::bytes::Regex as Pcre2Regex;

use super::error::TokenizerError;
use super::grapheme::cluster_boundaries;

/// Chunking rule for r50k_base and p50k_base (GPT-2, GPT-3, Codex).
pub const R50K_BASE_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Chunking rule for cl100k_base (GPT-3.5-turbo, GPT-4).
///
/// Contractions match case-insensitively, digit runs are capped at three and
/// punctuation may carry trailing line breaks.
pub const CL100K_BASE_PATTERN: &str = r"(?i:'s|'t|'re|'ve|'m|'ll|'d)|[^\r\n\p{L}\p{N}]?\p{L}+|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// Regex backend: regexr (default) or PCRE2 (optional).
enum RegexBackend {
    Regexr(Box<RegexrRegex>),
    #[cfg(feature = "pcre2")]
    Pcre2(Pcre2Regex),
}

impl RegexBackend {
    fn regexr(pattern: &str, use_jit: bool) -> Result<Self, TokenizerError> {
        let regex = RegexBuilder::new(pattern).jit(use_jit).build()?;
        debug!(backend = "regexr", jit = use_jit, "compiled chunking pattern");
        Ok(RegexBackend::Regexr(Box::new(regex)))
    }

    #[cfg(feature = "pcre2")]
    fn pcre2(pattern: &str, use_jit: bool) -> Result<Self, TokenizerError> {
        let mut builder = pcre2::bytes::RegexBuilder::new();
        if use_jit {
            builder.jit_if_available(true);
        }
        builder.utf(true);
        builder.ucp(true);
        let regex = builder.build(pattern)?;
        debug!(backend = "pcre2", jit = use_jit, "compiled chunking pattern");
        Ok(RegexBackend::Pcre2(regex))
    }

    /// Find all matches in the given text, returning (start, end) byte offsets
    fn find_iter(&self, text: &str) -> Vec<(usize, usize)> {
        match self {
            RegexBackend::Regexr(regex) => regex
                .find_iter(text)
                .map(|m| (m.start(), m.end()))
                .collect(),
            #[cfg(feature = "pcre2")]
            RegexBackend::Pcre2(regex) => regex
                .find_iter(text.as_bytes())
                .filter_map(|m| m.ok())
                .map(|m| (m.start(), m.end()))
                .collect(),
        }
    }
}

/// Splits byte buffers into chunks for the merge encoder.
///
/// The compiled regex is shared between clones.
#[derive(Clone)]
pub struct PreTokenizer {
    regex: Arc<RegexBackend>,
    pattern: String,
    use_jit: bool,
    use_pcre2: bool,
    grapheme_aligned: bool,
}

impl PreTokenizer {
    /// Compile `pattern` with the regexr backend, JIT on, grapheme alignment on.
    pub fn new(pattern: &str) -> Result<Self, TokenizerError> {
        Ok(Self {
            regex: Arc::new(RegexBackend::regexr(pattern, true)?),
            pattern: pattern.to_string(),
            use_jit: true,
            use_pcre2: false,
            grapheme_aligned: true,
        })
    }

    /// Switch between the PCRE2 and regexr backends.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    #[cfg(feature = "pcre2")]
    pub fn pcre2(mut self, use_pcre2: bool) -> Result<Self, TokenizerError> {
        self.use_pcre2 = use_pcre2;
        self.rebuild()?;
        Ok(self)
    }

    /// PCRE2 is unavailable without the `pcre2` feature.
    #[cfg(not(feature = "pcre2"))]
    pub fn pcre2(self, use_pcre2: bool) -> Result<Self, TokenizerError> {
        if use_pcre2 {
            Err(TokenizerError::Pcre2NotEnabled)
        } else {
            Ok(self)
        }
    }

    /// Enable or disable JIT compilation for the active backend.
    pub fn jit(mut self, use_jit: bool) -> Result<Self, TokenizerError> {
        self.use_jit = use_jit;
        self.rebuild()?;
        Ok(self)
    }

    /// Join chunks whose shared edge would split a grapheme cluster.
    ///
    /// On by default. Ids then differ from tiktoken wherever the regex splits
    /// a cluster, e.g. a decomposed combining mark or an r50k `"\r\n"`.
    /// Turning this off gives chunks exactly as the regex finds them.
    pub fn grapheme_aligned(mut self, grapheme_aligned: bool) -> Self {
        self.grapheme_aligned = grapheme_aligned;
        self
    }

    #[cfg(feature = "pcre2")]
    fn rebuild(&mut self) -> Result<(), TokenizerError> {
        let backend = if self.use_pcre2 {
            RegexBackend::pcre2(&self.pattern, self.use_jit)?
        } else {
            RegexBackend::regexr(&self.pattern, self.use_jit)?
        };
        self.regex = Arc::new(backend);
        Ok(())
    }

    #[cfg(not(feature = "pcre2"))]
    fn rebuild(&mut self) -> Result<(), TokenizerError> {
        self.regex = Arc::new(RegexBackend::regexr(&self.pattern, self.use_jit)?);
        Ok(())
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_grapheme_aligned(&self) -> bool {
        self.grapheme_aligned
    }

    /// Split `bytes` into chunk ranges, in order, tiling the whole buffer.
    pub fn chunks(&self, bytes: &[u8]) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut base = 0;

        for run in bytes.utf8_chunks() {
            let valid = run.valid();
            let mut covered = 0;

            for (start, end) in self.regex.find_iter(valid) {
                if start > covered {
                    ranges.push(base + covered..base + start);
                }
                if end > start {
                    ranges.push(base + start..base + end);
                }
                covered = covered.max(end);
            }
            if covered < valid.len() {
                ranges.push(base + covered..base + valid.len());
            }
            base += valid.len();

            let invalid = run.invalid();
            if !invalid.is_empty() {
                ranges.push(base..base + invalid.len());
                base += invalid.len();
            }
        }

        if self.grapheme_aligned && ranges.len() > 1 {
            ranges = snap_to_clusters(bytes, ranges);
        }
        ranges
    }
}

impl fmt::Debug for PreTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreTokenizer")
            .field("pattern", &self.pattern)
            .field("use_jit", &self.use_jit)
            .field("use_pcre2", &self.use_pcre2)
            .field("grapheme_aligned", &self.grapheme_aligned)
            .finish()
    }
}

/// Join adjacent ranges whose shared edge is not a cluster boundary.
fn snap_to_clusters(bytes: &[u8], ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    let boundaries = cluster_boundaries(bytes);
    let count = ranges.len();
    let mut snapped: Vec<Range<usize>> = Vec::with_capacity(count);

    for range in ranges {
        match snapped.last_mut() {
            Some(last) if boundaries.binary_search(&range.start).is_err() => {
                last.end = range.end;
            }
            _ => snapped.push(range),
        }
    }

    if snapped.len() < count {
        debug!(
            joined = count - snapped.len(),
            "joined chunks split inside a grapheme cluster"
        );
    }
    snapped
}
