#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Core of kiwara, a linter for npm dependency trees.

pub mod cancel;
pub mod config;
pub mod error;
pub mod lint;
pub mod linter;
pub mod logger;
pub mod pkg;
pub mod resolver;
pub mod rules;
pub mod version;

#[cfg(test)]
mod testing;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use config::{LintConfig, DEFAULT_CONCURRENCY};
pub use error::Error;
pub use linter::{LintRun, Linter};
pub use logger::{LevelFilter, LogLevel, Logger, MemoryLogger, NullLogger, SharedLogger};
pub use resolver::{GraphResolver, Resolution};
pub use version::{version_string, VERSION};
