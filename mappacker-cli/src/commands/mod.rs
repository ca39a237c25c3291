//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, init, show)
//! - [`render`] - One-shot archive packaging
//! - [`worker`] - Queue drain loop

pub mod config;
pub mod render;
pub mod worker;
