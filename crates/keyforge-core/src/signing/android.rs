//! Android keystore files and key.properties generation.
//!
//! This module handles writing decoded keystores into the build directory,
//! inspecting keystore files, and generating the key.properties file
//! read by Flutter/Gradle for release signing.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{KeyforgeError, Result};
use crate::models::{KeystoreType, SigningIdentity};
use crate::signing::provisioner::BuildScope;

/// Information extracted from a keystore file.
#[derive(Debug, Clone)]
pub struct KeystoreInfo {
    /// Type of the keystore (JKS or PKCS12).
    pub keystore_type: KeystoreType,
    /// SHA-256 of the file contents, hex encoded.
    pub sha256: String,
    /// File size in bytes.
    pub size: usize,
}

/// Detects the keystore type from its magic bytes.
pub fn detect_keystore_type(data: &[u8]) -> KeystoreType {
    // JKS files start with magic bytes 0xFEEDFEED
    // PKCS12 files start with 0x30 (ASN.1 SEQUENCE)
    if data.starts_with(&[0xFE, 0xED, 0xFE, 0xED]) {
        return KeystoreType::Jks;
    }

    // Default to PKCS12 for other formats
    KeystoreType::Pkcs12
}

/// Computes the SHA-256 of keystore bytes as a hex string.
pub fn fingerprint(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Reads a keystore file and reports its type and fingerprint.
pub async fn inspect_keystore(path: &Path) -> Result<KeystoreInfo> {
    let data = zeroize::Zeroizing::new(
        tokio::fs::read(path)
            .await
            .map_err(|e| KeyforgeError::io(path, e))?,
    );

    if data.is_empty() {
        return Err(KeyforgeError::KeystoreUnusable {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }

    Ok(KeystoreInfo {
        keystore_type: detect_keystore_type(&data),
        sha256: fingerprint(&data),
        size: data.len(),
    })
}

/// Writes keystore bytes to `path`.
///
/// The bytes go to a sibling `.tmp` file first and are renamed into place, so
/// the signing step never observes a partially written keystore.
pub async fn write_keystore(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| KeyforgeError::io(parent, e))?;
    }

    write_private(path, data).await?;

    tracing::debug!("Wrote keystore to {}", path.display());

    Ok(())
}

/// Writes `data` to a fresh owner-only `.tmp` sibling, then renames it over
/// `path`. The file is never readable by others, not even while being written.
async fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let temp_path = temp_sibling(path);
    match tokio::fs::remove_file(&temp_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(KeyforgeError::io(&temp_path, e)),
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(&temp_path)
        .await
        .map_err(|e| KeyforgeError::io(&temp_path, e))?;
    file.write_all(data)
        .await
        .map_err(|e| KeyforgeError::io(&temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| KeyforgeError::io(&temp_path, e))?;
    drop(file);

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| KeyforgeError::io(path, e))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Generates key.properties file content for Flutter/Gradle.
///
/// The key.properties file is read by the Gradle build script to
/// configure signing for release builds.
pub fn generate_key_properties(identity: &SigningIdentity) -> String {
    let mut content = format!(
        "storePassword={}\n\
         keyPassword={}\n\
         keyAlias={}\n\
         storeFile={}\n",
        escape_property(identity.secrets.store_password()),
        escape_property(identity.secrets.key_password()),
        escape_property(identity.key_alias()),
        escape_property(&identity.store_file.display().to_string()),
    );

    if let Some(keystore_type) = identity.source.keystore_type() {
        content.push_str(&format!("storeType={}\n", keystore_type.gradle_store_type()));
    }

    content
}

/// Escapes a value for the Java properties format.
fn escape_property(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            // Leading whitespace is dropped by the properties parser
            ' ' if i == 0 => escaped.push_str("\\ "),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Writes the key.properties file for the given identity.
pub async fn write_key_properties(path: &Path, identity: &SigningIdentity) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(KeyforgeError::Configuration(format!(
                "Directory for key.properties not found: {}",
                parent.display()
            )));
        }
    }

    let content = zeroize::Zeroizing::new(generate_key_properties(identity));

    write_private(path, content.as_bytes()).await?;

    tracing::debug!("Wrote key.properties to {}", path.display());

    Ok(())
}

/// Removes the keystores of a build scope.
///
/// A scope with a build id only removes its own directory, leaving concurrent
/// builds alone. An unscoped clean removes the whole signing directory.
/// Returns `true` if there was something to remove.
pub async fn cleanup_signing_dir(scope: &BuildScope) -> Result<bool> {
    let target = match scope.build_id() {
        Some(_) => scope.output_dir(),
        None => scope.signing_dir(),
    };

    if !target.exists() {
        return Ok(false);
    }

    tokio::fs::remove_dir_all(&target)
        .await
        .map_err(|e| KeyforgeError::io(&target, e))?;
    tracing::debug!("Removed signing directory: {}", target.display());

    Ok(true)
}
