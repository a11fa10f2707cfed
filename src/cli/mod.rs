//! CLI module for chatwire.
//!
//! This module provides the command-line surface:
//! - Argument parsing
//! - Version display
//! - One-shot chat runs and session listing
//!
//! # Usage
//!
//! ```ignore
//! use chatwire::cli::{parse_args, CliCommand};
//!
//! match parse_args(std::env::args())? {
//!     CliCommand::Run(args) => { /* run_chat(...) */ }
//!     other => { /* ... */ }
//! }
//! ```

pub mod args;
pub mod run;
pub mod version;

pub use args::{parse_args, CliCommand, CliError, RunArgs, USAGE};
pub use run::{format_conversation, list_sessions, run_chat, EventPrinter, EXIT_STOPPED};
pub use version::{version_line, VERSION};
