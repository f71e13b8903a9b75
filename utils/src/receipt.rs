//! Receipt transport encoding.
//!
//! Verification servers take the device receipt as standard, padded base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode raw receipt bytes for a verification request.
pub fn encode_receipt(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 receipt; `None` if the input is not valid base64.
pub fn decode_receipt(encoded: &str) -> Option<Vec<u8>> {
    STANDARD.decode(encoded.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_padding() {
        assert_eq!(encode_receipt(b"ab"), "YWI=");
        assert_eq!(encode_receipt(b""), "");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode_receipt("YWI=\n"), Some(b"ab".to_vec()));
        assert_eq!(decode_receipt("not base64!"), None);
    }
}
