//! GPT-2 byte ⇄ symbol alphabet.
//!
//! GPT-2 era merge files (`encoder.json`, `vocab.bpe`) do not store raw bytes.
//! Each byte is written as a printable Unicode symbol so the files stay plain
//! text: printable ASCII and most of Latin-1 stand for themselves, and the 68
//! remaining bytes (controls, space, DEL, NBSP, soft hyphen) are assigned
//! U+0100 onwards in byte order. Space, for instance, is written `Ġ` (U+0120).
//!
//! The loader in [`crate::core::vocab`] uses [`decode_symbols`] to turn those
//! strings back into the raw byte sequences stored in a
//! [`VocabularyTable`](crate::core::VocabularyTable).

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

/// First code point handed out to bytes that are not printable as themselves.
const SHIFTED_BASE: u32 = 0x100;

#[inline]
fn is_self_printable(byte: u8) -> bool {
    matches!(byte, b'!'..=b'~' | 0xA1..=0xAC | 0xAE..=0xFF)
}

static BYTE_TO_SYMBOL: LazyLock<[char; 256]> = LazyLock::new(|| {
    let mut symbols = ['\0'; 256];
    let mut shifted = SHIFTED_BASE;

    for byte in 0u8..=255 {
        symbols[byte as usize] = if is_self_printable(byte) {
            char::from(byte)
        } else {
            let symbol = char::from_u32(shifted).unwrap_or(char::REPLACEMENT_CHARACTER);
            shifted += 1;
            symbol
        };
    }

    symbols
});

static SYMBOL_TO_BYTE: LazyLock<FxHashMap<char, u8>> = LazyLock::new(|| {
    BYTE_TO_SYMBOL
        .iter()
        .enumerate()
        .map(|(byte, &symbol)| (symbol, byte as u8))
        .collect()
});

/// Symbol standing for `byte`.
#[inline]
pub fn symbol_of(byte: u8) -> char {
    BYTE_TO_SYMBOL[byte as usize]
}

/// Byte a symbol stands for, if it belongs to the alphabet.
#[inline]
pub fn byte_of(symbol: char) -> Option<u8> {
    SYMBOL_TO_BYTE.get(&symbol).copied()
}

/// Write raw bytes in the symbol alphabet.
pub fn encode_symbols(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| symbol_of(b)).collect()
}

/// Recover raw bytes from a symbol string.
///
/// Returns `None` if any character is outside the alphabet.
pub fn decode_symbols(text: &str) -> Option<Vec<u8>> {
    text.chars().map(byte_of).collect()
}
