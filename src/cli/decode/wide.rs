//! UTF-16 text as exchanged with the wide-character CLI entry points.
//!
//! Code units are native-endian, matching `SQLWCHAR` on the client.

/// Encode `s` as native-endian UTF-16 bytes followed by a two-byte terminator.
pub fn encode_utf16z(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity((s.len() + 1) * 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_ne_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out
}

/// Decode native-endian UTF-16 bytes, replacing invalid sequences.
///
/// A trailing odd byte is ignored.
pub fn decode_utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Byte length of the UTF-16 text before the first terminator.
pub fn terminated_len(bytes: &[u8]) -> usize {
    bytes
        .chunks_exact(2)
        .position(|pair| pair == [0, 0])
        .map(|units| units * 2)
        .unwrap_or(bytes.len() & !1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_world() {
        let units: Vec<u16> = "Hello, 世界".encode_utf16().collect();
        assert_eq!(units.len(), 9);
        let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_ne_bytes()).collect();
        assert_eq!(decode_utf16(&bytes), "Hello, 世界");
    }

    #[test]
    fn test_encode_appends_terminator() {
        let bytes = encode_utf16z("ab");
        assert_eq!(bytes.len(), 6);
        assert_eq!(&bytes[4..], &[0, 0]);
        assert_eq!(terminated_len(&bytes), 4);
        assert_eq!(decode_utf16(&bytes[..4]), "ab");
    }

    #[test]
    fn test_empty_string() {
        let bytes = encode_utf16z("");
        assert_eq!(bytes, vec![0, 0]);
        assert_eq!(terminated_len(&bytes), 0);
        assert_eq!(decode_utf16(&[]), "");
    }

    #[test]
    fn test_surrogate_pair() {
        let bytes = encode_utf16z("🎉");
        assert_eq!(terminated_len(&bytes), 4);
        assert_eq!(decode_utf16(&bytes[..4]), "🎉");
    }

    #[test]
    fn test_unterminated_uses_whole_buffer() {
        let bytes = encode_utf16z("xyz");
        assert_eq!(terminated_len(&bytes[..6]), 6);
    }
}
