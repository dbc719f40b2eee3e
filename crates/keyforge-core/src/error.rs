//! Error types for the Keyforge core library.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for keystore provisioning.
#[derive(Error, Debug)]
pub enum KeyforgeError {
    #[error("{var} is not valid base64: {message}")]
    Decode { var: String, message: String },

    #[error("{var} decoded to an empty keystore")]
    EmptyKeystore { var: String },

    #[error(
        "No keystore credential was supplied and the local fallback keystore {} does not exist",
        path.display()
    )]
    FallbackMissing { path: PathBuf },

    #[error("Keystore {} is not usable: {reason}", path.display())]
    KeystoreUnusable { path: PathBuf, reason: String },

    #[error("{var} must be set to sign release builds")]
    MissingSecret { var: String },

    #[error("Invalid build id '{0}': use letters, digits, '.', '_' or '-'")]
    InvalidBuildId(String),

    #[error("Already configured: {0}")]
    AlreadyConfigured(String),

    #[error("Provisioning already failed: {0}")]
    ProvisionFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl KeyforgeError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for Keyforge operations.
pub type Result<T> = std::result::Result<T, KeyforgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_names_variable() {
        let err = KeyforgeError::Decode {
            var: "KEYSTORE_BASE64".to_string(),
            message: "Invalid symbol 33, offset 4.".to_string(),
        };
        assert!(err.to_string().starts_with("KEYSTORE_BASE64 is not valid base64"));
    }

    #[test]
    fn test_fallback_missing_mentions_path() {
        let err = KeyforgeError::FallbackMissing {
            path: PathBuf::from("android/app/permanent-key.jks"),
        };
        assert!(err.to_string().contains("android/app/permanent-key.jks"));
    }
}
