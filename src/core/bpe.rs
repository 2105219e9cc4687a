//! Byte-pair merging within a single chunk.
//!
//! A chunk starts as one symbol per byte. The adjacent pair with the lowest
//! merge rank is merged, ties going to the leftmost pair, until no adjacent
//! pair has a rank. Every symbol is a contiguous sub-slice of the chunk, so a
//! symbol is represented only by where it starts.
//!
//! Two merge loops share that contract:
//!
//! - [`merge_linear`] keeps the rank of every adjacent pair cached in a flat
//!   vector and rescans it for the minimum after each merge. Best for short
//!   chunks, which is almost all of them.
//! - [`merge_heap`] keeps candidate pairs in a min-heap keyed by
//!   `(rank, position)` over a flat linked list of symbols. Entries go stale
//!   when either symbol of their pair changes; a per-symbol version counter
//!   detects that lazily on pop. O(n log n) on pathological chunks such as long
//!   runs of a single character.
//!
//! Both produce exactly the same split as the naive rescan-everything loop.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::Range;

use super::error::TokenizerError;
use super::table::{Rank, VocabularyTable};

/// Chunks longer than this use the heap-based loop.
const HEAP_THRESHOLD: usize = 128;

/// Sentinel for "no neighbour" in the linked list.
const NONE: usize = usize::MAX;

/// Encode one chunk into token ids.
pub fn byte_pair_encode(
    piece: &[u8],
    table: &VocabularyTable,
) -> Result<Vec<u32>, TokenizerError> {
    byte_pair_split(piece, table)
        .into_iter()
        .map(|range| {
            let symbol = &piece[range];
            table.id_of(symbol).map_err(|err| match err {
                TokenizerError::UnknownByteSequence(bytes) if bytes.len() > 1 => {
                    TokenizerError::UnmergeableSymbol(bytes)
                }
                other => other,
            })
        })
        .collect()
}

/// Split one chunk into the byte ranges of its final merged symbols.
pub fn byte_pair_split(piece: &[u8], table: &VocabularyTable) -> Vec<Range<usize>> {
    match piece.len() {
        0 => Vec::new(),
        1 => vec![0..1],
        n if n <= HEAP_THRESHOLD => merge_linear(piece, table),
        _ => merge_heap(piece, table),
    }
}

pub(crate) fn merge_linear(piece: &[u8], table: &VocabularyTable) -> Vec<Range<usize>> {
    if piece.len() < 2 {
        return (0..piece.len()).map(|i| i..i + 1).collect();
    }

    // parts[i].0 is where symbol i starts; the last entry is the end of the piece.
    // parts[i].1 is the rank of merging symbol i with symbol i + 1.
    let mut parts: Vec<(usize, Rank)> = (0..=piece.len()).map(|i| (i, Rank::MAX)).collect();

    let rank_at = |parts: &[(usize, Rank)], i: usize| -> Rank {
        if i + 2 < parts.len() {
            table
                .span_rank(piece, parts[i].0, parts[i + 1].0, parts[i + 2].0)
                .unwrap_or(Rank::MAX)
        } else {
            Rank::MAX
        }
    };

    for i in 0..parts.len() - 2 {
        parts[i].1 = rank_at(&parts, i);
    }

    loop {
        let mut min = (Rank::MAX, 0);
        for (i, &(_, rank)) in parts[..parts.len() - 1].iter().enumerate() {
            if rank < min.0 {
                min = (rank, i);
            }
        }
        let (rank, i) = min;
        if rank == Rank::MAX {
            break;
        }

        parts.remove(i + 1);
        parts[i].1 = rank_at(&parts, i);
        if i > 0 {
            parts[i - 1].1 = rank_at(&parts, i - 1);
        }
    }

    parts.windows(2).map(|w| w[0].0..w[1].0).collect()
}

pub(crate) fn merge_heap(piece: &[u8], table: &VocabularyTable) -> Vec<Range<usize>> {
    let n = piece.len();
    if n < 2 {
        return (0..n).map(|i| i..i + 1).collect();
    }

    // Symbol i covers piece[i..next[i]]. A merged-away symbol is marked dead.
    let mut next: Vec<usize> = (1..=n).collect();
    let mut prev: Vec<usize> = (0..n).map(|i| i.checked_sub(1).unwrap_or(NONE)).collect();
    let mut alive = vec![true; n];
    // Bumped whenever symbol i or its right neighbour changes.
    let mut version = vec![0u32; n];

    let pair_rank = |i: usize, next: &[usize]| -> Option<Rank> {
        let j = next[i];
        if j >= n {
            return None;
        }
        table.span_rank(piece, i, j, next[j])
    };

    let mut heap: BinaryHeap<Reverse<(Rank, usize, u32)>> = BinaryHeap::with_capacity(n);
    for i in 0..n - 1 {
        if let Some(rank) = pair_rank(i, &next) {
            heap.push(Reverse((rank, i, 0)));
        }
    }

    while let Some(Reverse((_, i, seen))) = heap.pop() {
        if !alive[i] || version[i] != seen {
            continue;
        }

        let j = next[i];
        let k = next[j];
        next[i] = k;
        alive[j] = false;
        if k < n {
            prev[k] = i;
        }

        version[i] += 1;
        if let Some(rank) = pair_rank(i, &next) {
            heap.push(Reverse((rank, i, version[i])));
        }

        let p = prev[i];
        if p != NONE {
            version[p] += 1;
            if let Some(rank) = pair_rank(p, &next) {
                heap.push(Reverse((rank, p, version[p])));
            }
        }
    }

    let mut ranges = Vec::new();
    let mut i = 0;
    while i < n {
        ranges.push(i..next[i]);
        i = next[i];
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::tests::{byte_tokens, rank_table};

    /// Textbook BPE: rescan every adjacent pair after each merge.
    fn merge_naive(piece: &[u8], table: &VocabularyTable) -> Vec<Vec<u8>> {
        let mut symbols: Vec<Vec<u8>> = piece.iter().map(|&b| vec![b]).collect();
        loop {
            let best = symbols
                .windows(2)
                .enumerate()
                .filter_map(|(i, w)| table.rank_of(&w[0], &w[1]).map(|r| (r, i)))
                .min();
            let Some((_, i)) = best else { break };
            let right = symbols.remove(i + 1);
            symbols[i].extend(right);
        }
        symbols
    }

    fn symbols(piece: &[u8], ranges: Vec<Range<usize>>) -> Vec<Vec<u8>> {
        ranges.into_iter().map(|r| piece[r].to_vec()).collect()
    }

    fn assert_all_loops_agree(piece: &[u8], table: &VocabularyTable) {
        let expected = merge_naive(piece, table);
        let linear = symbols(piece, merge_linear(piece, table));
        assert_eq!(linear, expected, "linear loop diverged on {:?}", piece);
        let heap = symbols(piece, merge_heap(piece, table));
        assert_eq!(heap, expected, "heap loop diverged on {:?}", piece);
    }

    #[test]
    fn test_loops_accept_short_pieces() {
        let table = rank_table(&[b"ab"]);
        assert!(merge_linear(b"", &table).is_empty());
        assert!(merge_heap(b"", &table).is_empty());
        assert_eq!(merge_linear(b"a", &table), vec![0..1]);
        assert_eq!(merge_heap(b"a", &table), vec![0..1]);
        assert_eq!(merge_linear(b"ab", &table), vec![0..2]);
    }

    #[test]
    fn test_merges_to_single_token() {
        let table = rank_table(&[b"he", b"ll", b"hell", b"hello"]);
        assert_eq!(byte_pair_encode(b"hello", &table).unwrap(), vec![259]);
    }

    #[test]
    fn test_stops_when_nothing_merges() {
        let table = rank_table(&[b"he"]);
        assert_eq!(
            byte_pair_encode(b"hex", &table).unwrap(),
            vec![256, b'x' as u32]
        );
        assert_eq!(byte_pair_encode(b"xyz", &table).unwrap(), vec![120, 121, 122]);
    }

    #[test]
    fn test_empty_and_single_byte() {
        let table = rank_table(&[]);
        assert!(byte_pair_encode(b"", &table).unwrap().is_empty());
        assert_eq!(byte_pair_encode(b"\xFF", &table).unwrap(), vec![255]);
    }

    #[test]
    fn test_lowest_rank_wins() {
        // "bc" (256) outranks "ab" (257), so "abc" splits as a + bc.
        let table = rank_table(&[b"bc", b"ab"]);
        assert_eq!(byte_pair_encode(b"abc", &table).unwrap(), vec![97, 256]);
    }

    #[test]
    fn test_leftmost_wins_ties() {
        // Both "aa" pairs in "aaa" share a rank; the left one merges.
        let table = rank_table(&[b"aa"]);
        assert_eq!(byte_pair_encode(b"aaa", &table).unwrap(), vec![256, 97]);
        assert_all_loops_agree(b"aaa", &table);
    }

    #[test]
    fn test_merge_list_table() {
        let mut tokens = byte_tokens();
        tokens.push(b"ab".to_vec());
        tokens.push(b"bc".to_vec());
        tokens.push(b"abc".to_vec());
        // "abc" is only reachable from ("ab", "c"), which ranks below ("b", "c").
        let merges = vec![
            (b"b".to_vec(), b"c".to_vec()),
            (b"a".to_vec(), b"b".to_vec()),
            (b"ab".to_vec(), b"c".to_vec()),
        ];
        let table = VocabularyTable::from_merges(tokens, merges).unwrap();
        assert_eq!(byte_pair_encode(b"abc", &table).unwrap(), vec![97, 257]);
        assert_eq!(byte_pair_encode(b"abab", &table).unwrap(), vec![256, 256]);
    }

    #[test]
    fn test_loops_agree_on_long_runs() {
        let table = rank_table(&[b"aa", b"aaaa", b"ab", b"aab", b"aaaaaaaa"]);
        let mut piece = vec![b'a'; 300];
        piece.extend_from_slice(b"ab");
        piece.extend(std::iter::repeat(b'a').take(77));
        assert_all_loops_agree(&piece, &table);

        let split = byte_pair_split(&piece, &table);
        assert_eq!(split.first(), Some(&(0..8)));
    }

    #[test]
    fn test_loops_agree_on_mixed_text() {
        let table = rank_table(&[
            b"th", b" t", b"he", b" th", b"the", b" the", b"in", b"er", b"an", b"ing", b"  ",
        ]);
        let text = b"the theatre in the   thing there then another banner ";
        for len in 0..text.len() {
            assert_all_loops_agree(&text[..len], &table);
        }
        let repeated = text.repeat(8);
        assert_all_loops_agree(&repeated, &table);
    }

    #[test]
    fn test_split_tiles_piece() {
        let table = rank_table(&[b"ab", b"ba"]);
        let piece = b"abababbaab".repeat(20);
        let split = byte_pair_split(&piece, &table);
        assert_eq!(split.first().map(|r| r.start), Some(0));
        assert_eq!(split.last().map(|r| r.end), Some(piece.len()));
        assert!(split.windows(2).all(|w| w[0].end == w[1].start));
    }
}
