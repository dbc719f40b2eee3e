//! CLI command implementations.

pub mod clean;
pub mod config;
pub mod encode;
pub mod provision;
pub mod verify;
