use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use nix::fcntl::{self, OFlag};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult};
use tracing::{debug, info};

use crate::builtin;
use crate::error::{ExecError, Result};
use crate::global::Session;
use crate::job::{self, syscall};
use crate::search;
use crate::types::{Command, RedirectType};
use crate::uniq::{self, Uniq};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ReturnCode { Success, Exit, Unknown }

pub const STATUS_NOT_FOUND: i32 = 127;
pub const STATUS_NOT_EXECUTABLE: i32 = 126;
pub const STATUS_SYNTAX: i32 = 2;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ExecResult {
	pub status: i32,
	pub code: ReturnCode,
}

impl ExecResult {
	pub fn success() -> ExecResult {
		ExecResult { status: 0, code: ReturnCode::Success }
	}

	pub fn exit() -> ExecResult {
		ExecResult { status: 0, code: ReturnCode::Exit }
	}

	pub fn not_found() -> ExecResult {
		ExecResult { status: STATUS_NOT_FOUND, code: ReturnCode::Unknown }
	}

	pub fn syntax_error() -> ExecResult {
		ExecResult { status: STATUS_SYNTAX, code: ReturnCode::Unknown }
	}

	pub fn should_exit(&self) -> bool {
		self.code == ReturnCode::Exit
	}
}

enum Program {
	External { path: CString, argv: Vec<CString> },
	Uniq(Uniq),
}

/// A stage with every string the child needs converted before the fork.
struct Stage<'a> {
	command: &'a Command,
	program: Program,
	redirects: Vec<(RedirectType, CString)>,
}

fn prepare<'a>(session: &Session, command: &'a Command) -> Result<Stage<'a>> {
	if command.name.is_empty() {
		return Err(ExecError::EmptyStage);
	}
	let program = if command.name == uniq::NAME {
		Program::Uniq(Uniq::from_args(&command.arguments))
	} else {
		let path = session.search_path.resolve(&command.name, &session.cwd)?;
		let argv: std::result::Result<Vec<CString>, _> = command.argv().map(CString::new).collect();
		Program::External { path: CString::new(path.into_os_string().as_bytes())?, argv: argv? }
	};
	let redirects: std::result::Result<Vec<_>, _> = command.redirects()
		.map(|(typ, target)| CString::new(target).map(|t| (typ, t)))
		.collect();
	Ok(Stage { command, program, redirects: redirects? })
}

struct Launch<'a> {
	shell: &'a str,
	cwd: CString,
}

fn open_redirect(typ: RedirectType, target: &CStr) -> nix::Result<(i32, i32)> {
	let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
	let (flags, to) = match typ {
		RedirectType::Input => (OFlag::O_RDONLY, libc::STDIN_FILENO),
		RedirectType::Output => (OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC, libc::STDOUT_FILENO),
		RedirectType::Append => (OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_APPEND, libc::STDOUT_FILENO),
	};
	let fd = syscall(|| fcntl::open(target, flags, mode))?;
	Ok((fd, to))
}

/// Wires the standard streams of a freshly forked child. Pipe ends arrive
/// owned and are closed once duplicated.
fn setup_stage(launch: &Launch, stage: &Stage, stdin: Option<OwnedFd>, stdout: Option<OwnedFd>) -> std::result::Result<(), String> {
	let fail = |what: &str, e: nix::Error| format!("-{}: {}: {}", launch.shell, what, e.desc());

	unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) }.map_err(|e| fail("signal", e))?;
	syscall(|| unistd::chdir(launch.cwd.as_c_str())).map_err(|e| fail(&*launch.cwd.to_string_lossy(), e))?;
	if let Some(fd) = stdin {
		syscall(|| unistd::dup2(fd.as_raw_fd(), libc::STDIN_FILENO)).map_err(|e| fail("dup2", e))?;
	}
	if let Some(fd) = stdout {
		syscall(|| unistd::dup2(fd.as_raw_fd(), libc::STDOUT_FILENO)).map_err(|e| fail("dup2", e))?;
	}
	for (typ, target) in &stage.redirects {
		let (fd, to) = open_redirect(*typ, target).map_err(|e| fail(&*target.to_string_lossy(), e))?;
		let dup = syscall(|| unistd::dup2(fd, to));
		let _ = unistd::close(fd);
		dup.map_err(|e| fail("dup2", e))?;
	}
	Ok(())
}

/// Closes every descriptor above stderr. A filter never execs, so `O_CLOEXEC`
/// does not clean up after it.
fn close_inherited() {
	let max = unsafe { libc::sysconf(libc::_SC_OPEN_MAX) };
	let max = if max > 0 { max.min(65536) as i32 } else { 1024 };
	for fd in 3 .. max {
		let _ = unistd::close(fd);
	}
}

fn run_uniq(uniq: Uniq) -> io::Result<()> {
	close_inherited();
	let input = unsafe { File::from_raw_fd(libc::STDIN_FILENO) };
	let output = unsafe { File::from_raw_fd(libc::STDOUT_FILENO) };
	uniq.run(BufReader::new(input), BufWriter::new(output))
}

fn exec_stage(launch: &Launch, stage: &Stage) -> i32 {
	match stage.program {
		Program::Uniq(uniq) => match run_uniq(uniq) {
			Ok(()) => 0,
			Err(e) => {
				let _ = writeln!(io::stderr(), "-{}: {}: {}", launch.shell, uniq::NAME, e);
				1
			},
		},
		Program::External { ref path, ref argv } => {
			let e = match unistd::execv(path, argv.as_slice()) {
				Err(e) => e,
				Ok(never) => match never {},
			};
			let _ = writeln!(io::stderr(), "-{}: {}: {}", launch.shell, stage.command.name, e.desc());
			STATUS_NOT_EXECUTABLE
		},
	}
}

fn run_stage(launch: &Launch, stage: &Stage, stdin: Option<OwnedFd>, stdout: Option<OwnedFd>) -> ! {
	let code = match setup_stage(launch, stage, stdin, stdout) {
		Ok(()) => exec_stage(launch, stage),
		Err(msg) => {
			let _ = writeln!(io::stderr(), "{}", msg);
			1
		},
	};
	unsafe { libc::_exit(code) }
}

/// Forks every stage before waiting on any, so the stages run concurrently.
/// The only descriptors a child inherits are the read end carried from the
/// previous stage and both ends of its own output pipe; it closes all three
/// after wiring them.
fn spawn_stages(launch: &Launch, stages: &[Stage], job_builder: &mut job::JobBuilder) -> Result<()> {
	let mut carried: Option<OwnedFd> = None;
	let last = stages.len().saturating_sub(1);
	for (i, stage) in stages.iter().enumerate() {
		let pipe = if i < last {
			Some(unistd::pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?)
		} else {
			None
		};
		match job_builder.push_fork()? {
			ForkResult::Parent { child } => {
				debug!(stage = i, pid = %child, name = %stage.command.name, "forked");
				drop(carried.take());
				carried = pipe.map(|(read, _write)| read);
			},
			ForkResult::Child => {
				let stdin = carried.take();
				let stdout = pipe.map(|(_read, write)| write);
				run_stage(launch, stage, stdin, stdout);
			},
		}
	}
	Ok(())
}

fn complete(session: &Session, chain: &Command) -> ExecResult {
	let stage = chain.stages().last().unwrap_or(chain);
	let candidates = match stage.arguments.last() {
		Some(prefix) => search::complete_file(&session.cwd, prefix),
		None => session.search_path.complete(&stage.name),
	};
	let _ = writeln!(io::stdout(), "{}", candidates.join(" "));
	ExecResult::success()
}

/// Runs one parsed line.
///
/// Errors come only from the process machinery (pipe, fork, wait); anything a
/// user can cause is reported on stderr and folded into the `ExecResult`.
pub fn execute(session: &mut Session, chain: &Command) -> Result<ExecResult> {
	if chain.auto_complete {
		return Ok(complete(session, chain));
	}
	// A lone empty name is the blank line; inside a pipeline it is a stray `|`.
	let stray_pipe = chain.name.is_empty() && chain.next.is_some();
	if let Some(builtin) = builtin::match_builtin(&chain.name).filter(|_| !stray_pipe) {
		return Ok(builtin(session, &chain.arguments));
	}

	let stages: Result<Vec<Stage>> = chain.stages().map(|c| prepare(session, c)).collect();
	let stages = match stages {
		Ok(stages) => stages,
		Err(ExecError::NotFound(name)) => {
			let _ = writeln!(io::stderr(), "-{}: {}: command not found", session.name, name);
			return Ok(ExecResult::not_found());
		},
		Err(e @ ExecError::EmptyStage) => {
			let _ = writeln!(io::stderr(), "-{}: {}", session.name, e);
			return Ok(ExecResult::syntax_error());
		},
		Err(e) => return Err(e),
	};

	let launch = Launch {
		shell: &session.name,
		cwd: CString::new(session.cwd.as_os_str().as_bytes())?,
	};
	let mut job_builder = job::JobBuilder::new(stages.len());
	spawn_stages(&launch, &stages, &mut job_builder)?;
	let mut job = job_builder.build();

	if chain.background {
		let pids: Vec<_> = job.pids().collect();
		info!(?pids, "started in background");
		session.background.extend(pids);
		return Ok(ExecResult::success());
	}
	job.wait()?;
	Ok(ExecResult { status: job.code(), code: ReturnCode::Success })
}
