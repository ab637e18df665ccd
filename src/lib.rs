//! Parsing and pipeline execution for the `shellax` interactive shell.
//!
//! [`parser::parse`] turns one input line into a chain of [`types::Command`]
//! stages; [`eval::execute`] runs that chain as one process per stage,
//! connected by pipes, against an explicit [`global::Session`].

pub mod builtin;
pub mod error;
pub mod eval;
pub mod global;
pub mod job;
pub mod parser;
pub mod search;
pub mod types;
pub mod uniq;

pub use error::{ExecError, Result};
pub use eval::{execute, ExecResult, ReturnCode};
pub use global::Session;
pub use parser::parse;
pub use types::Command;
