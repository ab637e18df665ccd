use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::waitpid;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use shellax::search::SearchPath;
use shellax::{execute, parse, ExecResult, ReturnCode, Session};

fn scratch() -> (TempDir, Session) {
	let dir = tempfile::tempdir().unwrap();
	let cwd = fs::canonicalize(dir.path()).unwrap();
	let session = Session::new(cwd, SearchPath::new("/bin:/usr/bin"));
	(dir, session)
}

fn run(session: &mut Session, line: &str) -> ExecResult {
	execute(session, &parse(line)).unwrap()
}

fn read(dir: &Path, name: &str) -> String {
	fs::read_to_string(dir.join(name)).unwrap()
}

#[test]
fn redirect_out_truncates() {
	let (dir, mut session) = scratch();
	fs::write(dir.path().join("out"), "old contents that are long\n").unwrap();
	assert_eq!(run(&mut session, "echo hi > out"), ExecResult::success());
	assert_eq!(read(dir.path(), "out"), "hi\n");
}

#[test]
fn redirect_append_accumulates() {
	let (dir, mut session) = scratch();
	run(&mut session, "echo a >>log");
	run(&mut session, "echo b >> log");
	assert_eq!(read(dir.path(), "log"), "a\nb\n");
}

#[test]
fn created_files_are_0644() {
	use std::os::unix::fs::PermissionsExt;
	let (dir, mut session) = scratch();
	run(&mut session, "echo x >made");
	let mode = fs::metadata(dir.path().join("made")).unwrap().permissions().mode();
	// umask can only remove bits
	assert_eq!(mode & 0o133, 0);
	assert_eq!(mode & 0o600, 0o600);
}

#[test]
fn redirect_in_feeds_stdin() {
	let (dir, mut session) = scratch();
	fs::write(dir.path().join("in"), "from file\n").unwrap();
	run(&mut session, "cat <in >out");
	assert_eq!(read(dir.path(), "out"), "from file\n");
}

#[test]
fn bad_redirect_aborts_stage_only() {
	let (dir, mut session) = scratch();
	let r = run(&mut session, "cat < missing > out");
	assert_eq!(r.code, ReturnCode::Success);
	assert_eq!(r.status, 1);
	assert!(!dir.path().join("out").exists());

	let r = run(&mut session, "cat <");
	assert_eq!(r.status, 1);

	assert_eq!(run(&mut session, "echo still here > ok").status, 0);
	assert_eq!(read(dir.path(), "ok"), "still here\n");
}

#[test]
fn quoted_argument_reaches_program_whole() {
	let (dir, mut session) = scratch();
	run(&mut session, r#"printf %s| "hello world" > out"#);
	assert_eq!(read(dir.path(), "out"), "hello world|");
}

#[test]
fn pipe_into_myuniq() {
	let (dir, mut session) = scratch();
	for _ in 0..2 {
		run(&mut session, r"printf 'b\na\nb\nc\na\n' | myuniq > out");
		assert_eq!(read(dir.path(), "out"), "b\na\nc\n");
	}
	run(&mut session, r"printf 'b\na\nb\nb\n' | myuniq -c > out");
	assert_eq!(read(dir.path(), "out"), "3 b\n1 a\n");
}

#[test]
fn myuniq_unknown_flag_drains_silently() {
	let (dir, mut session) = scratch();
	let r = run(&mut session, "seq 1 50000 | myuniq -x > out");
	assert_eq!(r, ExecResult::success());
	assert_eq!(read(dir.path(), "out"), "");
}

#[test]
fn echo_hi_through_myuniq() {
	let (dir, mut session) = scratch();
	run(&mut session, "echo hi | myuniq >> out");
	run(&mut session, "echo hi | myuniq >> out");
	assert_eq!(read(dir.path(), "out"), "hi\nhi\n");
}

#[test]
fn three_stage_pipeline() {
	let (dir, mut session) = scratch();
	let r = run(&mut session, r"printf 'x\ny\nx\n' | sort | myuniq -c > out");
	assert_eq!(r.status, 0);
	assert_eq!(read(dir.path(), "out"), "2 x\n1 y\n");
}

#[test]
fn stages_stream_concurrently() {
	// `yes` never ends on its own; it only stops when `head` closes the pipe.
	let (dir, mut session) = scratch();
	let r = run(&mut session, "yes | head -n 2 > out");
	assert_eq!(r.status, 0);
	assert_eq!(read(dir.path(), "out"), "y\ny\n");
}

#[test]
fn large_output_is_drained() {
	let (dir, mut session) = scratch();
	run(&mut session, "seq 1 100000 | myuniq | wc -l > out");
	assert_eq!(read(dir.path(), "out").trim(), "100000");
}

#[test]
fn background_returns_immediately() {
	let (_dir, mut session) = scratch();
	let started = Instant::now();
	let r = run(&mut session, "sleep 30 &");
	assert_eq!(r, ExecResult::success());
	assert!(started.elapsed() < Duration::from_secs(10));
	assert_eq!(session.background.len(), 1);

	let pid = session.background[0];
	assert!(session.reap_background().is_empty());
	kill(pid, Signal::SIGKILL).unwrap();
	waitpid(pid, None).unwrap();
}

#[test]
fn missing_command_keeps_session_alive() {
	let (dir, mut session) = scratch();
	let r = run(&mut session, "shellax-definitely-missing --flag");
	assert_eq!(r.code, ReturnCode::Unknown);
	assert_eq!(r.status, 127);
	assert_eq!(run(&mut session, "echo next > out").code, ReturnCode::Success);
	assert_eq!(read(dir.path(), "out"), "next\n");
}

#[test]
fn trailing_pipe_runs_nothing() {
	let (dir, mut session) = scratch();
	let r = run(&mut session, "echo hi > out |");
	assert_eq!(r, ExecResult::syntax_error());
	assert!(!dir.path().join("out").exists());
	assert_eq!(run(&mut session, "true").code, ReturnCode::Success);
}

#[test]
fn cd_changes_where_children_run() {
	let (dir, mut session) = scratch();
	fs::create_dir(dir.path().join("inner")).unwrap();
	run(&mut session, "cd inner");
	run(&mut session, "pwd > here");
	let here = read(&dir.path().join("inner"), "here");
	assert_eq!(PathBuf::from(here.trim()), session.cwd);

	let r = run(&mut session, "cd nowhere");
	assert_eq!(r.status, 1);
	assert!(session.cwd.ends_with("inner"));
}

#[test]
fn signal_death_maps_to_128_plus() {
	let (_dir, mut session) = scratch();
	let r = run(&mut session, "sh -c 'kill -9 $$'");
	assert_eq!(r.status, 137);
}

#[test]
fn exit_builtin() {
	let (_dir, mut session) = scratch();
	assert!(run(&mut session, "  exit  ").should_exit());
}
