use std::io::{self, Write};
use std::{fs, path::PathBuf};
use nix::errno::Errno;
use nix::unistd::{access, AccessFlags};

use crate::error::describe;
use crate::eval::ExecResult;
use crate::global::Session;

pub type Builtin = fn(&mut Session, &[String]) -> ExecResult;

pub fn builtin_nop(_: &mut Session, _: &[String]) -> ExecResult {
	ExecResult::success()
}

pub fn builtin_exit(_: &mut Session, _: &[String]) -> ExecResult {
	ExecResult::exit()
}

fn enter_dir(target: PathBuf) -> Result<PathBuf, String> {
	let target = fs::canonicalize(target).map_err(|e| describe(&e))?;
	if !target.is_dir() {
		return Err(Errno::ENOTDIR.desc().to_owned());
	}
	access(target.as_path(), AccessFlags::X_OK).map_err(|e| e.desc().to_owned())?;
	Ok(target)
}

/// Changes the session directory. Without an argument it goes to `HOME`, or
/// does nothing when `HOME` is unset.
pub fn builtin_cd(session: &mut Session, args: &[String]) -> ExecResult {
	let target = match (args.first(), &session.home) {
		(Some(dir), _) => session.cwd.join(dir),
		(None, Some(home)) => home.clone(),
		(None, None) => return ExecResult::success(),
	};
	match enter_dir(target) {
		Ok(dir) => {
			session.cwd = dir;
			ExecResult::success()
		},
		Err(msg) => {
			let _ = writeln!(io::stderr(), "-{}: cd: {}", session.name, msg);
			ExecResult { status: 1, ..ExecResult::success() }
		},
	}
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"" => Some(builtin_nop),
		"exit" => Some(builtin_exit),
		"cd" => Some(builtin_cd),
		_ => None,
	}
}
