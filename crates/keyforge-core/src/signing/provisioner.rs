//! Keystore provisioning for a single build.
//!
//! A [`Provisioner`] turns an optional base64 credential into a
//! [`SigningIdentity`]. With a credential, the decoded keystore is written to
//! a build-scoped path; without one, the local fallback keystore is used and
//! nothing is decoded or written.

use std::path::{Path, PathBuf};

use crate::config::ProvisionerConfig;
use crate::error::{KeyforgeError, Result};
use crate::models::{KeystoreSource, SigningIdentity, SigningSecrets};
use crate::signing::android::{detect_keystore_type, fingerprint, write_keystore};
use crate::signing::credential::EncodedCredential;

/// Name of the directory under the build directory that holds keystores.
pub const SIGNING_DIR: &str = "signing";

/// Returns true if `s` is safe to use as a single path component.
pub(crate) fn is_safe_component(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Output location for one build invocation.
///
/// Keystores are written to `<build_dir>/signing[/<build_id>]/`. Concurrent
/// builds sharing a build directory must use distinct build ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildScope {
    build_dir: PathBuf,
    build_id: Option<String>,
}

impl BuildScope {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            build_id: None,
        }
    }

    /// Scopes the output to a build id, such as a CI job number.
    pub fn with_build_id(mut self, build_id: &str) -> Result<Self> {
        let build_id = build_id.trim();
        if !is_safe_component(build_id) {
            return Err(KeyforgeError::InvalidBuildId(build_id.to_string()));
        }
        self.build_id = Some(build_id.to_string());
        Ok(self)
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn build_id(&self) -> Option<&str> {
        self.build_id.as_deref()
    }

    /// Directory holding every build's keystores.
    pub fn signing_dir(&self) -> PathBuf {
        self.build_dir.join(SIGNING_DIR)
    }

    /// Directory holding this build's keystore.
    pub fn output_dir(&self) -> PathBuf {
        match &self.build_id {
            Some(id) => self.signing_dir().join(id),
            None => self.signing_dir(),
        }
    }

    pub fn keystore_path(&self, file_name: &str) -> PathBuf {
        self.output_dir().join(file_name)
    }
}

/// Provisioning state of a build.
#[derive(Debug)]
pub enum ProvisionState {
    Unconfigured,
    Configured(SigningIdentity),
    Failed(String),
}

/// Resolves the signing identity for one build.
#[derive(Debug)]
pub struct Provisioner {
    config: ProvisionerConfig,
    scope: BuildScope,
    secrets: Option<SigningSecrets>,
    state: ProvisionState,
}

impl Provisioner {
    pub fn new(config: ProvisionerConfig, scope: BuildScope, secrets: SigningSecrets) -> Self {
        Self {
            config,
            scope,
            secrets: Some(secrets),
            state: ProvisionState::Unconfigured,
        }
    }

    pub fn state(&self) -> &ProvisionState {
        &self.state
    }

    pub fn scope(&self) -> &BuildScope {
        &self.scope
    }

    /// The identity, once provisioning succeeded.
    pub fn identity(&self) -> Option<&SigningIdentity> {
        match &self.state {
            ProvisionState::Configured(identity) => Some(identity),
            _ => None,
        }
    }

    /// Consumes the provisioner, returning the identity if configured.
    pub fn into_identity(self) -> Option<SigningIdentity> {
        match self.state {
            ProvisionState::Configured(identity) => Some(identity),
            _ => None,
        }
    }

    /// Reads the configured credential variable and provisions from it.
    pub async fn provision_from_env(&mut self) -> Result<&SigningIdentity> {
        let credential = match EncodedCredential::from_env(&self.config.credential_var) {
            Ok(credential) => credential,
            Err(e) => {
                self.state = ProvisionState::Failed(e.to_string());
                return Err(e);
            }
        };
        self.provision(credential).await
    }

    /// Provisions the keystore. Succeeds at most once per provisioner.
    pub async fn provision(
        &mut self,
        credential: Option<EncodedCredential>,
    ) -> Result<&SigningIdentity> {
        match &self.state {
            ProvisionState::Unconfigured => {}
            ProvisionState::Configured(identity) => {
                return Err(KeyforgeError::AlreadyConfigured(format!(
                    "keystore already provisioned at {}",
                    identity.store_file.display()
                )));
            }
            ProvisionState::Failed(message) => {
                return Err(KeyforgeError::ProvisionFailed(message.clone()));
            }
        }

        let (store_file, source) = match self.resolve(credential).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::error!("Keystore provisioning failed: {}", e);
                self.state = ProvisionState::Failed(e.to_string());
                return Err(e);
            }
        };

        let secrets = self.secrets.take().ok_or_else(|| {
            KeyforgeError::AlreadyConfigured("signing secrets already consumed".to_string())
        })?;

        self.state = ProvisionState::Configured(SigningIdentity {
            store_file,
            secrets,
            source,
        });

        match &self.state {
            ProvisionState::Configured(identity) => Ok(identity),
            _ => unreachable!("state was just set to Configured"),
        }
    }

    async fn resolve(
        &self,
        credential: Option<EncodedCredential>,
    ) -> Result<(PathBuf, KeystoreSource)> {
        let Some(credential) = credential else {
            let path = absolute(&self.config.fallback_keystore)?;
            tracing::warn!(
                "{} is not set; using local fallback keystore {}",
                self.config.credential_var,
                path.display()
            );
            return Ok((path, KeystoreSource::LocalFallback));
        };

        let data = credential.decode()?;
        let path = absolute(&self.scope.keystore_path(&self.config.output_file_name))?;
        write_keystore(&path, &data).await?;

        let keystore_type = detect_keystore_type(&data);
        let sha256 = fingerprint(&data);
        tracing::info!(
            keystore_type = %keystore_type,
            sha256 = %sha256,
            size = data.len(),
            "Decoded keystore from {} into {}",
            credential.var(),
            path.display()
        );

        let source = KeystoreSource::Decoded {
            var: credential.var().to_string(),
            keystore_type,
            sha256,
            size: data.len(),
        };

        Ok((path, source))
    }
}

/// Gradle resolves a relative `storeFile` against the app module, not the
/// directory the tool ran in, so identities always carry absolute paths.
fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| KeyforgeError::io(path, e))
}
