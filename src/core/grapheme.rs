//! Grapheme-cluster segmentation over raw byte buffers.
//!
//! Labels every byte of a buffer with a [`BoundaryClass`] so callers can tell
//! where user-perceived characters begin. Cluster rules are the Unicode
//! extended grapheme cluster rules (UAX #29) as implemented by
//! `unicode-segmentation`: a base character is never split from its combining
//! marks, emoji modifier and ZWJ sequences stay whole, and CR LF is one cluster.
//!
//! Input is not required to be valid UTF-8. Each byte of an invalid or truncated
//! sequence is labelled [`BoundaryClass::Invalid`] and always starts a new
//! cluster of its own.

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

/// Per-byte segmentation label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BoundaryClass {
    /// Non-leading byte of a multi-byte code point.
    Continuation = 0,
    /// First byte of a code point that continues the current cluster.
    Extend = 1,
    /// First byte of a code point that opens a new cluster.
    ClusterStart = 2,
    /// Byte that is not part of any valid UTF-8 sequence.
    Invalid = 3,
}

impl BoundaryClass {
    /// Whether a grapheme boundary sits immediately before this byte.
    #[inline]
    pub fn is_boundary(self) -> bool {
        matches!(self, BoundaryClass::ClusterStart | BoundaryClass::Invalid)
    }
}

impl From<BoundaryClass> for u8 {
    fn from(class: BoundaryClass) -> Self {
        class as u8
    }
}

/// Label every byte of `bytes` with its boundary class.
///
/// The output has exactly one entry per input byte, so an empty buffer yields
/// an empty vector.
pub fn grapheme(bytes: &[u8]) -> Vec<BoundaryClass> {
    let mut labels = Vec::with_capacity(bytes.len());

    for chunk in bytes.utf8_chunks() {
        label_valid(chunk.valid(), &mut labels);
        labels.extend(std::iter::repeat(BoundaryClass::Invalid).take(chunk.invalid().len()));
    }

    labels
}

fn label_valid(text: &str, labels: &mut Vec<BoundaryClass>) {
    let mut starts = text.grapheme_indices(true).map(|(i, _)| i).peekable();

    for (offset, ch) in text.char_indices() {
        let class = if starts.next_if_eq(&offset).is_some() {
            BoundaryClass::ClusterStart
        } else {
            BoundaryClass::Extend
        };
        labels.push(class);
        labels.extend(std::iter::repeat(BoundaryClass::Continuation).take(ch.len_utf8() - 1));
    }
}

/// Byte ranges of every grapheme cluster in `bytes`, in order.
///
/// The ranges tile the buffer. Invalid bytes form one-byte clusters.
pub fn cluster_ranges(bytes: &[u8]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut base = 0;

    for chunk in bytes.utf8_chunks() {
        let valid = chunk.valid();
        ranges.extend(
            valid
                .grapheme_indices(true)
                .map(|(i, g)| base + i..base + i + g.len()),
        );
        base += valid.len();

        for _ in chunk.invalid() {
            ranges.push(base..base + 1);
            base += 1;
        }
    }

    ranges
}

/// Byte offsets at which a cluster begins, followed by `bytes.len()`.
///
/// An empty buffer yields `[0]`.
pub fn cluster_boundaries(bytes: &[u8]) -> Vec<usize> {
    let mut boundaries: Vec<usize> = cluster_ranges(bytes).iter().map(|r| r.start).collect();
    boundaries.push(bytes.len());
    boundaries
}
