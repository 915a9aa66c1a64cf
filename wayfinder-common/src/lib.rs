//! Common types and utilities shared across Wayfinder crates.
//!
//! This crate holds the shared error type and the observability helpers used
//! throughout the Wayfinder workspace. It is intentionally lightweight so
//! that every crate can depend on it without pulling in browser or model
//! dependencies.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`WayfinderError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use wayfinder_common::WayfinderError;
//!
//! let err = WayfinderError::Config("no model configured".into());
//! assert_eq!(err.to_string(), "Configuration error: no model configured");
//! ```
pub mod observability;

/// Error types used across the Wayfinder system.
#[derive(thiserror::Error, Debug)]
pub enum WayfinderError {
    /// A model provider failed to answer a request.
    #[error("Provider error: {0}")]
    Provider(String),

    /// A driver (browser, network, etc.) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider response could not be interpreted.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,
}

/// Convenient alias for results that use [`WayfinderError`].
pub type Result<T> = std::result::Result<T, WayfinderError>;
