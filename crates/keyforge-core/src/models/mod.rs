//! Domain models for Keyforge.

pub mod signing;

pub use signing::*;
