//! Integration tests for the codec facade over small synthetic vocabularies.
//!
//! Every vocabulary gets the same hand-built rank table, so these tests pin
//! down behaviour that must hold regardless of table contents: round-trips,
//! determinism, chunk locality, empty input and unknown ids.

use gptbpe::{BoundaryClass, Codec, TokenizerError, Vocabulary, VocabularyTable};
use rustc_hash::FxHashMap;

const EXTRA_TOKENS: &[&[u8]] = &[
    b"he", b"ll", b"hell", b"hello", b" w", b"or", b" wor", b"ld", b" world", b"12", b"123",
    b"  ", b"\r\n", b"\xF0\x9F",
];

fn synthetic_table() -> VocabularyTable {
    let mut ranks: FxHashMap<Vec<u8>, u32> = FxHashMap::default();
    let tokens = (0u8..=255)
        .map(|b| vec![b])
        .chain(EXTRA_TOKENS.iter().map(|t| t.to_vec()));
    for (rank, token) in tokens.enumerate() {
        ranks.insert(token, rank as u32);
    }
    VocabularyTable::from_ranks(ranks).unwrap()
}

fn create_codec() -> Codec {
    Vocabulary::ALL
        .into_iter()
        .fold(Codec::new(), |codec, vocab| {
            codec.with_table(vocab, synthetic_table()).unwrap()
        })
}

/// Deterministic pseudo-random bytes (64-bit LCG).
fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 56) as u8
        })
        .collect()
}

fn samples() -> Vec<Vec<u8>> {
    let mut samples: Vec<Vec<u8>> = [
        "hello world",
        "Hello, world!",
        "The quick brown fox jumps over the lazy dog.",
        "1234567890 12 123 1",
        "Multi-line\ntext\r\nwith\n\n  newlines   ",
        "caf\u{e9} cafe\u{0301} na\u{ef}ve",
        "\u{3053}\u{3093}\u{306b}\u{3061}\u{306f} \u{4e16}\u{754c} \u{1F980}",
        "hello \u{1F44B} world \u{1F30D}.",
        "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467} \u{1F1EF}\u{1F1F5}\u{1F44D}\u{1F3FD}",
        "I'm here, you're there, they'LL see",
        "<|endoftext|> is plain text here",
    ]
    .iter()
    .map(|s| s.as_bytes().to_vec())
    .collect();

    samples.push(b"\xFF\xFEhello\xC3 world\xE2\x82".to_vec());
    samples.push(vec![b'a'; 1000]);
    samples.push(noise(4096, 7));
    samples.push(noise(257, 42));
    samples
}

#[test]
fn test_round_trip_every_vocabulary() {
    let codec = create_codec();
    for vocab in Vocabulary::ALL {
        for sample in samples() {
            let ids = codec.encode(&sample, vocab).unwrap();
            let decoded = codec.decode(&ids, vocab).unwrap();
            assert_eq!(decoded, sample, "{} round-trip failed for {:?}", vocab, sample);
        }
    }
}

#[test]
fn test_merges_apply() {
    let codec = create_codec();
    // hello = 259, " world" = 264
    for vocab in Vocabulary::ALL {
        assert_eq!(codec.encode("hello world", vocab).unwrap(), vec![259, 264]);
    }
}

#[test]
fn test_deterministic() {
    let codec = create_codec();
    for vocab in Vocabulary::ALL {
        for sample in samples() {
            let first = codec.encode(&sample, vocab).unwrap();
            let second = codec.encode(&sample, vocab).unwrap();
            assert_eq!(first, second);
            assert_eq!(
                codec.decode(&first, vocab).unwrap(),
                codec.decode(&second, vocab).unwrap()
            );
            assert_eq!(codec.grapheme(&sample), codec.grapheme(&sample));
        }
    }
}

#[test]
fn test_chunks_encode_independently() {
    let codec = create_codec();
    for vocab in Vocabulary::ALL {
        let tokenizer = codec.tokenizer(vocab).unwrap();
        for sample in samples() {
            let whole = tokenizer.encode(&sample).unwrap();
            let pieced: Vec<u32> = tokenizer
                .chunks(&sample)
                .into_iter()
                .flat_map(|range| tokenizer.encode(&sample[range]).unwrap())
                .collect();
            assert_eq!(whole, pieced, "{} chunking is not local for {:?}", vocab, sample);
        }
    }
}

#[test]
fn test_split_inside_a_chunk_changes_result() {
    let codec = create_codec();
    for vocab in Vocabulary::ALL {
        let whole = codec.encode("hello", vocab).unwrap();
        let mut split = codec.encode("hel", vocab).unwrap();
        split.extend(codec.encode("lo", vocab).unwrap());
        assert_eq!(whole, vec![259]);
        assert_ne!(whole, split);
    }
}

#[test]
fn test_empty_input() {
    let codec = create_codec();
    for vocab in Vocabulary::ALL {
        assert!(codec.encode(b"", vocab).unwrap().is_empty());
        assert!(codec.decode(&[], vocab).unwrap().is_empty());
    }
    assert!(codec.grapheme(b"").is_empty());
}

#[test]
fn test_unknown_id() {
    let codec = create_codec();
    for vocab in Vocabulary::ALL {
        let max = codec.tokenizer(vocab).unwrap().max_token_id().unwrap();
        let result = codec.decode(&[259, max + 1], vocab);
        assert!(
            matches!(result, Err(TokenizerError::UnknownTokenId(id)) if id == max + 1),
            "{} accepted id {}",
            vocab,
            max + 1
        );
        // The largest id is the last special token and decodes fine.
        assert!(codec.decode(&[max], vocab).is_ok());
    }
}

#[test]
fn test_special_tokens_per_vocabulary() {
    let codec = create_codec();
    let text = "hello<|endoftext|>";
    assert_eq!(
        codec.encode_with_special(text, Vocabulary::R50k).unwrap(),
        vec![259, 50256]
    );
    assert_eq!(
        codec.encode_with_special(text, Vocabulary::P50k).unwrap(),
        vec![259, 50256]
    );
    assert_eq!(
        codec.encode_with_special(text, Vocabulary::Cl100k).unwrap(),
        vec![259, 100257]
    );
    assert_eq!(
        codec
            .encode_with_special("<|fim_prefix|>hello<|fim_suffix|>", Vocabulary::Cl100k)
            .unwrap(),
        vec![100258, 259, 100260]
    );
}

#[test]
fn test_vocabularies_chunk_differently() {
    let codec = create_codec();
    let r50k = codec.tokenizer(Vocabulary::R50k).unwrap();
    let cl100k = codec.tokenizer(Vocabulary::Cl100k).unwrap();
    assert_eq!(r50k.chunks("12345").len(), 1);
    assert_eq!(cl100k.chunks("12345").len(), 2);
    assert_eq!(cl100k.encode("12345").unwrap(), vec![266, 52, 53]);
}

#[test]
fn test_invalid_selector() {
    for name in ["", "gpt2", "o200k_base", "R50K", "cl100k_base "] {
        assert!(matches!(
            name.parse::<Vocabulary>(),
            Err(TokenizerError::InvalidVocabulary(_))
        ));
    }
}

#[test]
fn test_unloaded_vocabulary() {
    let codec = Codec::new()
        .with_table(Vocabulary::R50k, synthetic_table())
        .unwrap();
    assert!(matches!(
        codec.encode("hello", Vocabulary::Cl100k),
        Err(TokenizerError::VocabularyNotLoaded(_))
    ));
}

#[test]
fn test_grapheme_never_splits_clusters() {
    let codec = Codec::new();
    let fixtures = [
        "e\u{0301}",
        "\u{0928}\u{093F}",
        "\u{1F44D}\u{1F3FD}",
        "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}",
        "\u{1F1EF}\u{1F1F5}",
        "\r\n",
    ];
    for fixture in fixtures {
        let labels = codec.grapheme(fixture);
        assert_eq!(labels.len(), fixture.len());
        assert_eq!(labels[0], BoundaryClass::ClusterStart);
        assert!(
            labels[1..].iter().all(|class| !class.is_boundary()),
            "boundary inside {:?}",
            fixture
        );
    }
}

#[test]
fn test_concurrent_callers() {
    let codec = create_codec();
    let samples = samples();
    let expected: Vec<Vec<u32>> = samples
        .iter()
        .map(|s| codec.encode(s, Vocabulary::Cl100k).unwrap())
        .collect();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for (sample, ids) in samples.iter().zip(&expected) {
                    assert_eq!(&codec.encode(sample, Vocabulary::Cl100k).unwrap(), ids);
                    assert_eq!(&codec.decode(ids, Vocabulary::Cl100k).unwrap(), sample);
                }
            });
        }
    });
}
