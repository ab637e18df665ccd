use std::collections::HashMap;
use std::io::{self, BufRead, Write};

pub const NAME: &str = "myuniq";

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum Report {
	/// Each distinct line once.
	#[default]
	Lines,
	/// `<count> <line>` per distinct line (`-c` / `-C`).
	Counts,
	/// Any other flag: input is drained and nothing is printed.
	Nothing,
}

/// In-process duplicate-line filter, run inside a forked stage.
///
/// Unlike `uniq(1)` duplicates need not be adjacent: every distinct line is
/// printed once, in order of first occurrence.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Uniq {
	pub report: Report,
}

impl Uniq {
	pub fn from_args(args: &[String]) -> Uniq {
		let report = match args.first().map(String::as_str) {
			None => Report::Lines,
			Some("-c") | Some("-C") => Report::Counts,
			Some(_) => Report::Nothing,
		};
		Uniq { report }
	}

	pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> io::Result<()> {
		let mut order: Vec<(Vec<u8>, usize)> = vec![];
		let mut index: HashMap<Vec<u8>, usize> = HashMap::new();
		let mut line: Vec<u8> = vec![];
		loop {
			line.clear();
			if input.read_until(b'\n', &mut line)? == 0 {
				break;
			}
			match index.get(&line) {
				Some(&i) => order[i].1 += 1,
				None => {
					index.insert(line.clone(), order.len());
					order.push((line.clone(), 1));
				},
			}
		}
		for (line, n) in &order {
			match self.report {
				Report::Nothing => break,
				Report::Counts => write!(output, "{} ", n)?,
				Report::Lines => {},
			}
			output.write_all(line)?;
		}
		output.flush()
	}
}
