//! Provisioning tests against a scratch build directory.

use std::path::Path;

use keyforge_core::KeyforgeError;
use keyforge_core::config::ProvisionerConfig;
use keyforge_core::models::{KeystoreSource, KeystoreType, SigningSecrets};
use keyforge_core::signing::{
    BuildScope, EncodedCredential, MIME_LINE_LENGTH, Provisioner, encode_keystore,
    generate_key_properties,
};
use rand::RngCore;
use secrecy::SecretString;

const VAR: &str = "KEYSTORE_BASE64";

fn secrets() -> SigningSecrets {
    SigningSecrets::new(SecretString::from("storepass"), "upload", None).unwrap()
}

fn config(root: &Path) -> ProvisionerConfig {
    ProvisionerConfig {
        fallback_keystore: root.join("android/app/permanent-key.jks"),
        ..ProvisionerConfig::default()
    }
}

fn random_keystore(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    // JKS magic so type detection is exercised too
    data[..4].copy_from_slice(&[0xFE, 0xED, 0xFE, 0xED]);
    data
}

// =============================================================================
// Decoded credentials
// =============================================================================

mod decoded {
    use super::*;

    #[tokio::test]
    async fn hello_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let scope = BuildScope::new(dir.path().join("build"));
        let mut provisioner = Provisioner::new(config(dir.path()), scope, secrets());

        let identity = provisioner
            .provision(EncodedCredential::from_value(VAR, "aGVsbG8="))
            .await
            .unwrap();

        let written = std::fs::read(&identity.store_file).unwrap();
        assert_eq!(written, b"hello");
        assert_eq!(written.len(), 5);
        assert!(identity.store_file.starts_with(dir.path().join("build")));
        identity.ensure_usable().await.unwrap();
    }

    #[tokio::test]
    async fn wrapped_and_unwrapped_inputs_round_trip() {
        let data = random_keystore(2048);

        for wrap in [None, Some(64), Some(MIME_LINE_LENGTH)] {
            let dir = tempfile::tempdir().unwrap();
            let scope = BuildScope::new(dir.path().join("build"));
            let mut provisioner = Provisioner::new(config(dir.path()), scope, secrets());

            let encoded = encode_keystore(&data, wrap);
            let identity = provisioner
                .provision(EncodedCredential::from_value(VAR, &encoded))
                .await
                .unwrap();

            assert_eq!(std::fs::read(&identity.store_file).unwrap(), data);
            match &identity.source {
                KeystoreSource::Decoded {
                    keystore_type,
                    size,
                    ..
                } => {
                    assert_eq!(*keystore_type, KeystoreType::Jks);
                    assert_eq!(*size, data.len());
                }
                other => panic!("unexpected source: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn sequential_builds_do_not_leak_keystores() {
        let dir = tempfile::tempdir().unwrap();
        let first_data = random_keystore(512);
        let second_data = random_keystore(768);

        let first_scope = BuildScope::new(dir.path().join("build"))
            .with_build_id("1001")
            .unwrap();
        let mut first = Provisioner::new(config(dir.path()), first_scope, secrets());
        first
            .provision(EncodedCredential::from_value(
                VAR,
                &encode_keystore(&first_data, None),
            ))
            .await
            .unwrap();
        let first_identity = first.into_identity().unwrap();

        let second_scope = BuildScope::new(dir.path().join("build"))
            .with_build_id("1002")
            .unwrap();
        let mut second = Provisioner::new(config(dir.path()), second_scope, secrets());
        let second_identity = second
            .provision(EncodedCredential::from_value(
                VAR,
                &encode_keystore(&second_data, None),
            ))
            .await
            .unwrap();

        assert_ne!(first_identity.store_file, second_identity.store_file);
        assert_eq!(std::fs::read(&second_identity.store_file).unwrap(), second_data);

        let properties = generate_key_properties(second_identity);
        assert!(!properties.contains("1001"));
    }

    #[tokio::test]
    async fn unscoped_rebuild_overwrites_previous_keystore() {
        let dir = tempfile::tempdir().unwrap();

        for data in [random_keystore(300), random_keystore(100)] {
            let scope = BuildScope::new(dir.path().join("build"));
            let mut provisioner = Provisioner::new(config(dir.path()), scope, secrets());
            let identity = provisioner
                .provision(EncodedCredential::from_value(
                    VAR,
                    &encode_keystore(&data, None),
                ))
                .await
                .unwrap();

            assert_eq!(std::fs::read(&identity.store_file).unwrap(), data);
        }
    }

    #[tokio::test]
    async fn malformed_credential_aborts_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let scope = BuildScope::new(dir.path().join("build"));
        let mut provisioner = Provisioner::new(config(dir.path()), scope, secrets());

        let err = provisioner
            .provision(EncodedCredential::from_value(VAR, "aGVs bG8=\n@@@@"))
            .await
            .unwrap_err();

        assert!(matches!(err, KeyforgeError::Decode { ref var, .. } if var == VAR));
        assert!(!dir.path().join("build").exists());
    }
}

// =============================================================================
// Local fallback
// =============================================================================

mod fallback {
    use super::*;

    #[tokio::test]
    async fn empty_credential_selects_fallback_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let scope = BuildScope::new(dir.path().join("build"));
        let mut provisioner = Provisioner::new(config(dir.path()), scope, secrets());

        let identity = provisioner
            .provision(EncodedCredential::from_value(VAR, ""))
            .await
            .unwrap();

        assert_eq!(
            identity.store_file,
            dir.path().join("android/app/permanent-key.jks")
        );
        assert!(!dir.path().join("build").exists());
    }

    #[tokio::test]
    async fn missing_fallback_is_reported_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let scope = BuildScope::new(dir.path().join("build"));
        let mut provisioner = Provisioner::new(config(dir.path()), scope, secrets());

        let identity = provisioner.provision(None).await.unwrap();
        let err = identity.ensure_usable().await.unwrap_err();

        assert!(matches!(err, KeyforgeError::FallbackMissing { .. }));
        assert!(err.to_string().contains("permanent-key.jks"));
    }

    #[tokio::test]
    async fn present_fallback_is_usable() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("android/app/permanent-key.jks");
        std::fs::create_dir_all(fallback.parent().unwrap()).unwrap();
        std::fs::write(&fallback, random_keystore(64)).unwrap();

        let scope = BuildScope::new(dir.path().join("build"));
        let mut provisioner = Provisioner::new(config(dir.path()), scope, secrets());

        let identity = provisioner.provision(None).await.unwrap();
        identity.ensure_usable().await.unwrap();
        assert_eq!(identity.key_alias(), "upload");
    }
}

// =============================================================================
// Environment
// =============================================================================

mod environment {
    use super::*;

    #[test]
    fn credential_is_read_from_configured_variable() {
        let credential = temp_env::with_vars(
            [(VAR, Some("aGVsbG8=")), ("CI_KEYSTORE", Some("  "))],
            || {
                assert!(EncodedCredential::from_env("CI_KEYSTORE").unwrap().is_none());
                EncodedCredential::from_env(VAR).unwrap()
            },
        );

        let credential = credential.unwrap();
        assert_eq!(credential.var(), VAR);
        assert_eq!(credential.decode().unwrap().as_slice(), b"hello");
    }
}
