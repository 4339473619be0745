// ABOUTME: Reversible encoding of markup fragments into attribute-safe payload strings.
// ABOUTME: Standard padded base64 over the UTF-8 bytes, mirrored by atob + TextDecoder in the runtime.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::OptimizeError;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

impl From<CodecError> for OptimizeError {
    fn from(err: CodecError) -> Self {
        OptimizeError::codec("DecodePayload", Some(err.into()))
    }
}

/// Encode markup for storage in a `data-*` attribute.
pub fn encode_payload(markup: &str) -> String {
    STANDARD.encode(markup.as_bytes())
}

/// Decode a payload produced by [`encode_payload`].
pub fn decode_payload(payload: &str) -> Result<String, CodecError> {
    let bytes = STANDARD.decode(payload.trim())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_ascii_survives() {
        let markup = r#"<blockquote class="twitter-tweet"><p lang="ja">こんにちは — “quotes” 🎉</p></blockquote>"#;
        let payload = encode_payload(markup);
        assert!(payload.is_ascii());
        assert!(!payload.contains('"'));
        assert_eq!(decode_payload(&payload).unwrap(), markup);
    }

    #[test]
    fn test_rejects_garbage() {
        let err = decode_payload("not*base64!").unwrap_err();
        assert!(matches!(err, CodecError::InvalidBase64(_)));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let payload = STANDARD.encode([0xff, 0xfe, 0xfd]);
        let err = decode_payload(&payload).unwrap_err();
        assert!(matches!(err, CodecError::InvalidUtf8(_)));
        let wrapped: OptimizeError = err.into();
        assert!(wrapped.is_codec());
    }
}
