//! Android release signing.
//!
//! This module provides functionality for:
//! - Decoding base64 keystore credentials from the environment
//! - Writing keystores into build-scoped directories
//! - Generating key.properties for Flutter/Gradle
//! - Resolving the signing identity for a build

pub mod android;
pub mod credential;
pub mod provisioner;

pub use android::*;
pub use credential::*;
pub use provisioner::*;
