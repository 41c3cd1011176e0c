use std::borrow::Cow;

use md5::Md5;
use sha1::{Digest, Sha1};

/// Digest algorithms the collector accepts for signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// 160-bit
    Sha1,
    /// 128-bit
    Md5,
}

impl Algorithm {
    /// Look up an algorithm by its conventional name (`SHA-1`, `SHA1`, `MD5`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SHA-1" | "SHA1" => Some(Self::Sha1),
            "MD5" => Some(Self::Md5),
            _ => None,
        }
    }
}

/// Lowercase hex digest of `text` encoded as ISO-8859-1.
///
/// Characters above U+00FF have no single-byte form and are encoded as `?`,
/// matching the encoder the collector's reference signatures were built with.
pub fn digest(text: &str, algorithm: Algorithm) -> String {
    let bytes = latin1_bytes(text);
    match algorithm {
        Algorithm::Sha1 => hex::encode(Sha1::digest(&*bytes)),
        Algorithm::Md5 => hex::encode(Md5::digest(&*bytes)),
    }
}

/// Like [`digest`], but with the algorithm given by name.
///
/// Returns an empty string for an unknown algorithm. Callers treat `""` as
/// "no signature available", never as the digest of empty input.
pub fn digest_named(text: &str, algorithm: &str) -> String {
    match Algorithm::from_name(algorithm) {
        Some(algorithm) => digest(text, algorithm),
        None => String::new(),
    }
}

pub fn sha1(text: &str) -> String {
    digest(text, Algorithm::Sha1)
}

pub fn md5(text: &str) -> String {
    digest(text, Algorithm::Md5)
}

/// Encode `text` as ISO-8859-1, one byte per character.
///
/// Characters above U+00FF become `?`. ASCII input is borrowed as is.
pub fn latin1_bytes(text: &str) -> Cow<'_, [u8]> {
    if text.is_ascii() {
        Cow::Borrowed(text.as_bytes())
    } else {
        Cow::Owned(
            text.chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(sha1(""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(sha1("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(md5(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn digest_lengths() {
        assert_eq!(sha1("02:3F:A1:9C:44:7B").len(), 40);
        assert_eq!(md5("02:3F:A1:9C:44:7B").len(), 32);
    }

    #[test]
    fn uses_single_byte_encoding() {
        // U+00E9 must hash as the single byte 0xE9, not its two UTF-8 bytes.
        assert_eq!(md5("\u{e9}"), hex::encode(Md5::digest([0xE9u8])));
        assert_ne!(md5("\u{e9}"), hex::encode(Md5::digest("\u{e9}".as_bytes())));
        // No single-byte form: replaced with '?'.
        assert_eq!(sha1("\u{20ac}"), sha1("?"));
    }

    #[test]
    fn latin1_bytes_map_one_byte_per_char() {
        assert!(matches!(latin1_bytes("plain"), Cow::Borrowed(b"plain")));
        assert_eq!(&latin1_bytes("K\u{f6}ln")[..], &[b'K', 0xF6, b'l', b'n'][..]);
        assert_eq!(&latin1_bytes("5\u{20ac}\u{1f600}")[..], &b"5??"[..]);
    }

    #[test]
    fn named_lookup() {
        assert_eq!(digest_named("abc", "SHA-1"), sha1("abc"));
        assert_eq!(digest_named("abc", "sha1"), sha1("abc"));
        assert_eq!(digest_named("abc", "md5"), md5("abc"));
        assert_eq!(digest_named("abc", "SHA-256"), "");
        assert_eq!(Algorithm::from_name("whirlpool"), None);
    }
}
