//! rendr CLI - server-side rendering harness.
//!
//! Drives a front-end bundler, keeps the compiled bundle in memory and
//! renders pages over HTTP through the render pipeline in `rendr-core`.
//!
//! # Architecture
//!
//! - [`cli`] - argument definitions
//! - [`config`] - environment-driven configuration
//! - [`error`] - error types with actionable messages
//! - [`logger`] - structured logging with tracing
//! - [`ui`] - terminal output for humans
//! - [`server`] - the HTTP listener
//! - [`watcher`] - development source watching
//! - [`crash`] - fail-fast panic handling
//! - `commands` - command implementations

pub mod cli;
pub mod commands;
pub mod config;
pub mod crash;
pub mod error;
pub mod logger;
pub mod server;
pub mod ui;
pub mod watcher;

pub use error::{CliError, ConfigError, Result, ResultExt};
