use std::path::PathBuf;
use std::env;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::debug;

use crate::error::Result;
use crate::search::SearchPath;

pub const SHELL_NAME: &str = "shellax";

/// Everything the executor would otherwise read from process-wide state.
///
/// Children are started in `cwd`; the interpreter's own working directory is
/// never changed.
#[derive(Debug)]
pub struct Session {
	pub name: String,
	pub cwd: PathBuf,
	pub home: Option<PathBuf>,
	pub search_path: SearchPath,
	pub background: Vec<Pid>,
}

impl Session {
	pub fn new(cwd: PathBuf, search_path: SearchPath) -> Session {
		Session {
			name: SHELL_NAME.to_owned(),
			cwd,
			home: None,
			search_path,
			background: vec![],
		}
	}

	pub fn from_env() -> Result<Session> {
		let mut session = Session::new(env::current_dir()?, SearchPath::from_env());
		session.home = env::var_os("HOME").map(PathBuf::from);
		Ok(session)
	}

	/// Collects background children that have exited, without blocking.
	pub fn reap_background(&mut self) -> Vec<(Pid, WaitStatus)> {
		let mut done = vec![];
		self.background.retain(|&pid| {
			match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
				Ok(WaitStatus::StillAlive) => true,
				Ok(status) => {
					debug!(%pid, ?status, "reaped background child");
					done.push((pid, status));
					false
				},
				Err(_) => false,
			}
		});
		done
	}
}
