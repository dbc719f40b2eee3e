//! Base64 keystore credentials supplied through the environment.
//!
//! CI systems often wrap long secret values at 64 or 76 columns, so decoding
//! strips ASCII whitespace and accepts missing `=` padding. Any other
//! character outside the standard alphabet is rejected.

use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::STANDARD},
};
use zeroize::Zeroizing;

use crate::error::{KeyforgeError, Result};

/// Standard alphabet with optional padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// MIME line length used by `encode_keystore` callers that want wrapping.
pub const MIME_LINE_LENGTH: usize = 76;

/// A non-empty base64 keystore credential and the variable it came from.
pub struct EncodedCredential {
    var: String,
    value: Zeroizing<String>,
}

impl EncodedCredential {
    /// Builds a credential from a raw value. Returns `None` when the value is
    /// empty after trimming.
    pub fn from_value(var: impl Into<String>, raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            var: var.into(),
            value: Zeroizing::new(trimmed.to_string()),
        })
    }

    /// Reads a credential from the process environment.
    ///
    /// Unset and whitespace-only variables yield `Ok(None)`. A value that is
    /// not valid unicode cannot be base64 and is reported as a decode error.
    pub fn from_env(var: &str) -> Result<Option<Self>> {
        match std::env::var(var) {
            Ok(raw) => {
                let raw = Zeroizing::new(raw);
                Ok(Self::from_value(var, &raw))
            }
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(KeyforgeError::Decode {
                var: var.to_string(),
                message: "value is not valid unicode".to_string(),
            }),
        }
    }

    /// Name of the environment variable this credential was read from.
    pub fn var(&self) -> &str {
        &self.var
    }

    /// Decodes the credential into raw keystore bytes.
    pub fn decode(&self) -> Result<Zeroizing<Vec<u8>>> {
        let compact: Zeroizing<String> = Zeroizing::new(
            self.value
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect(),
        );

        let bytes = LENIENT
            .decode(compact.as_bytes())
            .map_err(|e| KeyforgeError::Decode {
                var: self.var.clone(),
                message: e.to_string(),
            })?;

        if bytes.is_empty() {
            return Err(KeyforgeError::EmptyKeystore {
                var: self.var.clone(),
            });
        }

        Ok(Zeroizing::new(bytes))
    }
}

impl std::fmt::Debug for EncodedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EncodedCredential({}, [REDACTED; {} chars])",
            self.var,
            self.value.len()
        )
    }
}

/// Encodes keystore bytes as padded standard base64, optionally wrapped at
/// `wrap` columns with `\n` line breaks.
pub fn encode_keystore(data: &[u8], wrap: Option<usize>) -> String {
    let encoded = STANDARD.encode(data);
    match wrap {
        Some(width) if width > 0 && encoded.len() > width => encoded
            .as_bytes()
            .chunks(width)
            // base64 output is ASCII
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => encoded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VAR: &str = "KEYSTORE_BASE64";

    fn credential(raw: &str) -> EncodedCredential {
        EncodedCredential::from_value(VAR, raw).unwrap()
    }

    #[test]
    fn test_decode_standard() {
        assert_eq!(credential("aGVsbG8=").decode().unwrap().as_slice(), b"hello");
    }

    #[test]
    fn test_empty_and_whitespace_values_are_absent() {
        assert!(EncodedCredential::from_value(VAR, "").is_none());
        assert!(EncodedCredential::from_value(VAR, " \n\t ").is_none());
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert_eq!(credential("  aGVsbG8=\n").decode().unwrap().as_slice(), b"hello");
    }

    #[test]
    fn test_decode_mime_wrapped() {
        let data: Vec<u8> = (0..=255u8).collect();
        let wrapped = encode_keystore(&data, Some(MIME_LINE_LENGTH)).replace('\n', "\r\n");
        assert!(wrapped.contains("\r\n"));
        assert_eq!(credential(&wrapped).decode().unwrap().as_slice(), data.as_slice());
    }

    #[test]
    fn test_missing_padding_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(credential("YWJjZA").decode().unwrap().as_slice(), b"abcd");
        }
        assert_eq!(credential("YWJjZA==").decode().unwrap().as_slice(), b"abcd");
        assert_eq!(credential("aGVsbG8").decode().unwrap().as_slice(), b"hello");
    }

    #[test]
    fn test_invalid_symbol_names_variable() {
        let err = credential("aGVs!bG8=").decode().unwrap_err();
        match err {
            KeyforgeError::Decode { var, .. } => assert_eq!(var, VAR),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(
            credential("aGVs!bG8=")
                .decode()
                .unwrap_err()
                .to_string()
                .contains(VAR)
        );
    }

    #[test]
    fn test_dangling_symbol_rejected() {
        // A single trailing symbol can never encode a whole byte.
        assert!(matches!(
            credential("aGVsb").decode(),
            Err(KeyforgeError::Decode { .. })
        ));
    }

    #[test]
    fn test_padding_only_rejected() {
        assert!(credential("====").decode().is_err());
    }

    #[test]
    fn test_debug_redacts_value() {
        let output = format!("{:?}", credential("aGVsbG8="));
        assert!(output.contains(VAR));
        assert!(!output.contains("aGVsbG8"));
    }

    #[test]
    fn test_encode_wraps_lines() {
        let data = vec![0xABu8; 120];
        let encoded = encode_keystore(&data, Some(MIME_LINE_LENGTH));
        assert!(encoded.lines().all(|l| l.len() <= MIME_LINE_LENGTH));
        assert_eq!(encoded.lines().count(), 3);
        assert!(!encode_keystore(&data, None).contains('\n'));
    }

    #[test]
    fn test_from_env() {
        temp_env::with_var(VAR, Some("aGVsbG8="), || {
            let credential = EncodedCredential::from_env(VAR).unwrap().unwrap();
            assert_eq!(credential.var(), VAR);
            assert_eq!(credential.decode().unwrap().as_slice(), b"hello");
        });

        temp_env::with_var(VAR, None::<&str>, || {
            assert!(EncodedCredential::from_env(VAR).unwrap().is_none());
        });

        temp_env::with_var(VAR, Some(""), || {
            assert!(EncodedCredential::from_env(VAR).unwrap().is_none());
        });
    }

    #[cfg(unix)]
    #[test]
    fn test_from_env_non_unicode_is_decode_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let value = OsStr::from_bytes(&[0x66, 0x6f, 0x80]);
        temp_env::with_var(VAR, Some(value), || {
            let err = EncodedCredential::from_env(VAR).unwrap_err();
            assert!(matches!(err, KeyforgeError::Decode { ref var, .. } if var == VAR));
        });
    }
}
