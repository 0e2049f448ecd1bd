//! Common utilities and types shared across the voice lifecycle crates.

#![warn(clippy::pedantic)]

/// Module for platform identifier types
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;
