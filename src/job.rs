use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use tracing::trace;

use crate::error::{ExecError, Result};

/// Retries a system call interrupted by a signal.
pub fn syscall<F, T>(f: F) -> nix::Result<T> where F: Fn() -> nix::Result<T> {
	loop {
		match f() {
			Err(nix::Error::EINTR) => (),
			result => return result,
		}
	}
}

pub trait WaitStatusExt {
	/// Shell-style exit code: the exit status, or 128 plus the signal number.
	fn code(self) -> i32;
}

impl WaitStatusExt for WaitStatus {
	fn code(self) -> i32 {
		match self {
			WaitStatus::Exited(_, code) => code,
			WaitStatus::Signaled(_, sig, _) => 128 + sig as i32,
			_ => 0,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Process {
	pub pid: Pid,
	pub status: WaitStatus,
}

/// The processes of one pipeline, in stage order.
#[derive(Debug)]
pub struct Job {
	pub processes: Vec<Process>,
}

impl Job {
	pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
		self.processes.iter().map(|pr| pr.pid)
	}

	/// Blocks until every process of the job has terminated.
	pub fn wait(&mut self) -> Result<()> {
		for pr in &mut self.processes {
			pr.status = syscall(|| waitpid(pr.pid, None)).map_err(ExecError::Wait)?;
			trace!(pid = %pr.pid, status = ?pr.status, "child finished");
		}
		Ok(())
	}

	/// The status of the final stage, which is the status of the pipeline.
	pub fn code(&self) -> i32 {
		self.processes.last().map_or(0, |pr| pr.status.code())
	}
}

#[derive(Debug)]
pub struct JobBuilder {
	imp: Job,
}

impl JobBuilder {
	pub fn new(size_hint: usize) -> JobBuilder {
		JobBuilder {
			imp: Job { processes: Vec::with_capacity(size_hint) }
		}
	}

	pub fn push_fork(&mut self) -> Result<ForkResult> {
		let r = unsafe { unistd::fork() }.map_err(ExecError::Fork)?;
		if let ForkResult::Parent { child } = r {
			self.imp.processes.push(Process { pid: child, status: WaitStatus::StillAlive });
		}
		Ok(r)
	}

	pub fn build(self) -> Job {
		self.imp
	}
}
