use crate::directory::AttributeValue;
use base64::engine::general_purpose::STANDARD;
use base64::{DecodeError, Engine as _};
use std::borrow::Cow;

/// Decodes standard, padded base64. Line breaks and other ASCII whitespace
/// (as found in wrapped LDIF values) are ignored.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, DecodeError> {
    if text.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact)
    } else {
        STANDARD.decode(text)
    }
}

/// Raw bytes of an attribute value.
pub fn decode_value(value: &AttributeValue) -> Result<Cow<'_, [u8]>, DecodeError> {
    match value {
        AttributeValue::Text(text) => decode_base64(text).map(Cow::Owned),
        AttributeValue::Binary(bytes) => Ok(Cow::Borrowed(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reverses_standard_encoding() {
        let samples: [&[u8]; 5] = [
            b"",
            b"AA",
            &[0x30, 0x82, 0x01, 0x0a],
            &[0u8, 255, 128, 7, 64, 63],
            b"a certificate body that is long enough to need several base64 groups",
        ];

        for sample in samples {
            let encoded = STANDARD.encode(sample);
            assert_eq!(decode_base64(&encoded).unwrap(), sample);
        }
    }

    #[test]
    fn test_decode_ignores_line_wrapping() {
        let encoded = STANDARD.encode([7u8; 90]);
        let wrapped = format!("{}\n {}\r\n", &encoded[..60], &encoded[60..]);
        assert_eq!(decode_base64(&wrapped).unwrap(), vec![7u8; 90]);
    }

    #[test]
    fn test_decode_rejects_invalid_input() {
        assert!(decode_base64("not base64!").is_err());
        assert!(decode_base64("QUE").is_err());
    }

    #[test]
    fn test_decode_value_variants() {
        let text = AttributeValue::Text("QUE=".to_string());
        assert_eq!(decode_value(&text).unwrap().as_ref(), b"AA");

        let binary = AttributeValue::Binary(vec![0x30, 0x00]);
        assert!(matches!(decode_value(&binary).unwrap(), Cow::Borrowed(_)));
        assert_eq!(decode_value(&binary).unwrap().as_ref(), &[0x30, 0x00]);
    }
}
