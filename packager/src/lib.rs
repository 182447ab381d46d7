//! Baasha release packager library.
//!
//! This crate provides the core functionality for producing Baasha release
//! packages: for each target it provisions toolchain support, builds the
//! compiler in release mode, stages the binary together with the runtime
//! file, and compresses the staging directory into a zip archive. It is used
//! by the `baasha-release` CLI binary and can be driven programmatically with
//! a substitute [`executor::CommandExecutor`] for testing.
//!
//! # Modules
//!
//! - [`archiver`] - Zip archives of staging directories
//! - [`builder`] - Cargo release builds for one target
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Release configuration loaded from `release.toml`
//! - [`enumerator`] - Target list sources (static or toolchain-reported)
//! - [`error`] - Error types
//! - [`executor`] - External command execution
//! - [`layout`] - Deterministic naming of release outputs
//! - [`output`] - Progress and dry-run text
//! - [`pipeline`] - Per-target release orchestration
//! - [`stager`] - Copying artefacts into staging directories
//! - [`target`] - Target triple identifiers
//! - [`toolchain`] - Toolchain provisioning through rustup

pub mod archiver;
pub mod builder;
pub mod cli;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod executor;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod stager;
pub mod target;
pub mod toolchain;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
