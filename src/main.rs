use std::io::{self, BufRead, Write};
use std::process;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use shellax::job::WaitStatusExt;
use shellax::{eval, global, parser, ExecResult, Session};

const LOG_ENV: &str = "SHELLAX_LOG";

#[derive(Parser, Debug)]
#[command(name = "shellax", version, about = "A small interactive shell with pipes and redirection")]
struct Args {
	/// Run one line, then exit with its status
	#[arg(short = 'c', long = "command")]
	command: Option<String>,

	/// Print each parsed command chain before running it
	#[arg(long)]
	dump: bool,

	/// Name shown in the prompt and in diagnostics
	#[arg(long, default_value = global::SHELL_NAME)]
	name: String,
}

fn init_logging() {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(io::stderr)
		.init();
}

fn run_line(session: &mut Session, line: &str, dump: bool) -> ExecResult {
	let command = parser::parse(line);
	if dump {
		print!("{}", command);
		let _ = io::stdout().flush();
	}
	match eval::execute(session, &command) {
		Ok(r) => r,
		Err(e) if e.is_fatal() => {
			let _ = writeln!(io::stderr(), "-{}: {}", session.name, e);
			process::exit(1)
		},
		Err(e) => {
			let _ = writeln!(io::stderr(), "-{}: {}", session.name, e);
			ExecResult { status: 1, ..ExecResult::success() }
		},
	}
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	init_logging();

	let mut session = Session::from_env()?;
	session.name = args.name;

	if let Some(line) = args.command {
		let r = run_line(&mut session, &line, args.dump);
		process::exit(r.status);
	}

	let mut stdout = io::stdout();
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	loop {
		for (pid, status) in session.reap_background() {
			writeln!(stdout, "[{}] Done ({})", pid, status.code())?;
		}
		write!(stdout, "{}$ ", session.name)?;
		stdout.flush()?;
		let line = match read_line(&mut stdin_locked) {
			Ok(Some(line)) => line,
			Ok(None) => break,
			Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
			Err(e) => {
				writeln!(io::stderr(), "-{}: {}", session.name, e)?;
				break;
			},
		};
		if run_line(&mut session, &line, args.dump).should_exit() {
			break;
		}
	}
	writeln!(stdout)?;
	Ok(())
}

/// Reads one line, `None` at end of input. Bytes that are not UTF-8 are
/// replaced rather than rejected.
fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
	let mut buf = vec![];
	if input.read_until(b'\n', &mut buf)? == 0 {
		return Ok(None);
	}
	Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
