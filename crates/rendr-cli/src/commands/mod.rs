//! Command implementations for the rendr CLI.
//!
//! - [`serve`] - run one backend's render server
//! - [`check`] - configuration validation
//!
//! Each command provides an `execute` function that takes the parsed
//! arguments and returns a Result.

pub mod check;
pub mod serve;

pub use check::execute as check_execute;
pub use serve::execute as serve_execute;
