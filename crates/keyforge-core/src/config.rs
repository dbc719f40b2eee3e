//! Provisioner configuration and defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{KeyforgeError, Result};
use crate::signing::provisioner::is_safe_component;

/// Environment variable holding the base64 keystore.
pub const DEFAULT_CREDENTIAL_VAR: &str = "KEYSTORE_BASE64";

/// Repository-relative path of the local development keystore.
pub const DEFAULT_FALLBACK_KEYSTORE: &str = "android/app/permanent-key.jks";

/// File name of the decoded keystore inside the build scope.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "release.jks";

/// Default key alias.
pub const DEFAULT_KEY_ALIAS: &str = "upload";

/// Build directory relative to the project root.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Environment variables for signing secrets.
pub const STORE_PASSWORD_VAR: &str = "KEYSTORE_PASSWORD";
pub const KEY_PASSWORD_VAR: &str = "KEY_PASSWORD";
pub const KEY_ALIAS_VAR: &str = "KEY_ALIAS";

/// Settings for a [`Provisioner`](crate::signing::Provisioner).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProvisionerConfig {
    /// Environment variable read for the encoded keystore.
    pub credential_var: String,
    /// Keystore used when no credential is supplied.
    pub fallback_keystore: PathBuf,
    /// File name of the decoded keystore.
    pub output_file_name: String,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            credential_var: DEFAULT_CREDENTIAL_VAR.to_string(),
            fallback_keystore: PathBuf::from(DEFAULT_FALLBACK_KEYSTORE),
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
        }
    }
}

impl ProvisionerConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_env_var_name(&self.credential_var) {
            return Err(KeyforgeError::Configuration(format!(
                "credential_var '{}' is not a valid environment variable name",
                self.credential_var
            )));
        }

        if self.fallback_keystore.as_os_str().is_empty() {
            return Err(KeyforgeError::Configuration(
                "fallback_keystore must not be empty".to_string(),
            ));
        }

        if !is_safe_component(&self.output_file_name) {
            return Err(KeyforgeError::Configuration(format!(
                "output_file_name '{}' must be a plain file name",
                self.output_file_name
            )));
        }

        Ok(())
    }
}

fn is_env_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
