//! Text encodings shared between the reader and writer

use serde::{Deserialize, Serialize};

/// Byte encoding of a CSV source or output.
///
/// The reader auto-detects the encoding from a byte-order mark when none is
/// configured, falling back to UTF-8. A recognized BOM is skipped on every
/// rewind so it never leaks into the first field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    /// The byte-order mark for this encoding.
    pub(crate) fn bom(self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8 => &[0xEF, 0xBB, 0xBF],
            TextEncoding::Utf16Le => &[0xFF, 0xFE],
            TextEncoding::Utf16Be => &[0xFE, 0xFF],
        }
    }

    /// Detect an encoding from the first bytes of a source.
    ///
    /// Returns the encoding and the number of BOM bytes to skip. With no
    /// recognizable BOM the source is assumed to be UTF-8 starting at byte 0.
    pub(crate) fn detect(prefix: &[u8]) -> (TextEncoding, u64) {
        for encoding in [
            TextEncoding::Utf8,
            TextEncoding::Utf16Le,
            TextEncoding::Utf16Be,
        ] {
            let bom = encoding.bom();
            if prefix.len() >= bom.len() && &prefix[..bom.len()] == bom {
                return (encoding, bom.len() as u64);
            }
        }

        (TextEncoding::Utf8, 0)
    }

    /// Encode a string into bytes under this encoding. No BOM is emitted.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Utf16Le => text
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect(),
            TextEncoding::Utf16Be => text
                .encode_utf16()
                .flat_map(|unit| unit.to_be_bytes())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_utf8_bom() {
        let (encoding, skip) = TextEncoding::detect(&[0xEF, 0xBB, 0xBF, b'a']);
        assert_eq!(encoding, TextEncoding::Utf8);
        assert_eq!(skip, 3);
    }

    #[test]
    fn test_detect_utf16_boms() {
        assert_eq!(
            TextEncoding::detect(&[0xFF, 0xFE, b'a', 0]),
            (TextEncoding::Utf16Le, 2)
        );
        assert_eq!(
            TextEncoding::detect(&[0xFE, 0xFF, 0, b'a']),
            (TextEncoding::Utf16Be, 2)
        );
    }

    #[test]
    fn test_detect_defaults_to_utf8() {
        assert_eq!(TextEncoding::detect(b"a,b"), (TextEncoding::Utf8, 0));
        assert_eq!(TextEncoding::detect(b""), (TextEncoding::Utf8, 0));
    }

    #[test]
    fn test_encode_round_trips_utf16le() {
        let bytes = TextEncoding::Utf16Le.encode("a,ü");
        assert_eq!(bytes, vec![b'a', 0, b',', 0, 0xFC, 0]);
    }
}
