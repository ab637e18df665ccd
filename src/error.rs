use std::{ffi, io};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Error, Debug)]
pub enum ExecError {
	#[error("{0}: command not found")]
	NotFound(String),
	#[error("syntax error near unexpected token `|'")]
	EmptyStage,
	#[error("pipe: {0}")]
	Pipe(#[source] nix::Error),
	#[error("fork: {0}")]
	Fork(#[source] nix::Error),
	#[error("wait: {0}")]
	Wait(#[source] nix::Error),
	#[error("nul char in argument: {0}")]
	Nul(#[from] ffi::NulError),
	#[error("{0}")]
	Io(#[from] io::Error),
}

impl ExecError {
	/// Pipe and fork failures leave half-built process state behind; the
	/// session cannot continue after one.
	pub fn is_fatal(&self) -> bool {
		matches!(*self, ExecError::Pipe(_) | ExecError::Fork(_))
	}
}

/// The bare system error text (`No such file or directory`), without the
/// `(os error N)` suffix `io::Error` appends.
pub fn describe(e: &io::Error) -> String {
	match e.raw_os_error() {
		Some(code) => nix::errno::Errno::from_raw(code).desc().to_owned(),
		None => e.to_string(),
	}
}
