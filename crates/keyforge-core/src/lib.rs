//! Keyforge Core Library
//!
//! Keystore provisioning for Android release builds: decoding CI credentials,
//! writing build-scoped keystores, and assembling the signing identity.

pub mod config;
pub mod error;
pub mod models;
pub mod signing;

pub use error::{KeyforgeError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
