//! Signing models for Android release builds.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{KeyforgeError, Result};

// ============================================================================
// Keystore Type
// ============================================================================

/// Android keystore type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeystoreType {
    Jks,
    Pkcs12,
}

impl KeystoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeystoreType::Jks => "jks",
            KeystoreType::Pkcs12 => "pkcs12",
        }
    }

    /// Value for the Gradle `storeType` property.
    pub fn gradle_store_type(&self) -> &'static str {
        match self {
            KeystoreType::Jks => "JKS",
            KeystoreType::Pkcs12 => "PKCS12",
        }
    }
}

impl std::str::FromStr for KeystoreType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jks" => Ok(KeystoreType::Jks),
            "pkcs12" | "p12" => Ok(KeystoreType::Pkcs12),
            _ => Err(format!("Unknown keystore type: {}", s)),
        }
    }
}

impl std::fmt::Display for KeystoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Keystore Source
// ============================================================================

/// Where the active keystore file came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeystoreSource {
    /// Decoded from an environment credential during this build.
    Decoded {
        var: String,
        keystore_type: KeystoreType,
        sha256: String,
        size: usize,
    },
    /// Pre-provisioned local keystore used for development builds.
    LocalFallback,
}

impl KeystoreSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, KeystoreSource::LocalFallback)
    }

    /// Keystore type, when known without reading the file.
    pub fn keystore_type(&self) -> Option<KeystoreType> {
        match self {
            KeystoreSource::Decoded { keystore_type, .. } => Some(*keystore_type),
            KeystoreSource::LocalFallback => None,
        }
    }
}

// ============================================================================
// Signing Secrets
// ============================================================================

/// Passwords and alias that unlock the signing key.
pub struct SigningSecrets {
    store_password: SecretString,
    key_alias: String,
    key_password: SecretString,
}

impl SigningSecrets {
    /// Creates signing secrets. The key password falls back to the store
    /// password, which is what `keytool -genkey` produces by default.
    pub fn new(
        store_password: SecretString,
        key_alias: impl Into<String>,
        key_password: Option<SecretString>,
    ) -> Result<Self> {
        let key_alias = key_alias.into();
        if key_alias.trim().is_empty() {
            return Err(KeyforgeError::Configuration(
                "Key alias must not be empty".to_string(),
            ));
        }
        if store_password.expose_secret().is_empty() {
            return Err(KeyforgeError::Configuration(
                "Store password must not be empty".to_string(),
            ));
        }

        let key_password = match key_password {
            Some(p) if !p.expose_secret().is_empty() => p,
            _ => SecretString::from(store_password.expose_secret().to_owned()),
        };

        Ok(Self {
            store_password,
            key_alias,
            key_password,
        })
    }

    pub fn store_password(&self) -> &str {
        self.store_password.expose_secret()
    }

    pub fn key_alias(&self) -> &str {
        &self.key_alias
    }

    pub fn key_password(&self) -> &str {
        self.key_password.expose_secret()
    }
}

impl std::fmt::Debug for SigningSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecrets")
            .field("store_password", &"[REDACTED]")
            .field("key_alias", &self.key_alias)
            .field("key_password", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Signing Identity
// ============================================================================

/// Everything the packaging step needs to sign a release build.
#[derive(Debug)]
pub struct SigningIdentity {
    pub store_file: PathBuf,
    pub secrets: SigningSecrets,
    pub source: KeystoreSource,
}

impl SigningIdentity {
    pub fn store_file(&self) -> &Path {
        &self.store_file
    }

    pub fn key_alias(&self) -> &str {
        self.secrets.key_alias()
    }

    /// Checks that the keystore file exists, is a regular file and is not
    /// empty. Must pass before the signing step reads the file.
    pub async fn ensure_usable(&self) -> Result<()> {
        let metadata = match tokio::fs::metadata(&self.store_file).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(if self.source.is_fallback() {
                    KeyforgeError::FallbackMissing {
                        path: self.store_file.clone(),
                    }
                } else {
                    KeyforgeError::KeystoreUnusable {
                        path: self.store_file.clone(),
                        reason: "file not found".to_string(),
                    }
                });
            }
            Err(e) => return Err(KeyforgeError::io(&self.store_file, e)),
        };

        if !metadata.is_file() {
            return Err(KeyforgeError::KeystoreUnusable {
                path: self.store_file.clone(),
                reason: "not a regular file".to_string(),
            });
        }
        if metadata.len() == 0 {
            return Err(KeyforgeError::KeystoreUnusable {
                path: self.store_file.clone(),
                reason: "file is empty".to_string(),
            });
        }

        Ok(())
    }

    /// Secret-free view of the identity for logs and CLI output.
    pub fn summary(&self) -> SigningIdentitySummary {
        SigningIdentitySummary {
            store_file: self.store_file.display().to_string(),
            key_alias: self.secrets.key_alias().to_string(),
            source: self.source.clone(),
        }
    }
}

/// Response for a provisioned identity (no secrets).
#[derive(Debug, Clone, Serialize)]
pub struct SigningIdentitySummary {
    pub store_file: String,
    pub key_alias: String,
    pub source: KeystoreSource,
}
