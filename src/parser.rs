use tracing::trace;

use crate::types::*;

struct Parser<'a> {
	line: &'a str,
	i: usize,
}

impl<'a> Parser<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.as_bytes().get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		matches!(c, b' ' | b'\t' | b'\n' | b'\r')
	}

	fn is_quote(c: u8) -> bool {
		c == b'"' || c == b'\''
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Parser::is_whitespace);
	}

	/// Reads one whitespace-delimited token. Whitespace inside a quoted span
	/// belongs to the token; an unterminated quote runs to the end of the line.
	fn read_token(&mut self) -> Option<&'a str> {
		self.skip_whitespaces();
		let orig = self.i;
		let mut quote: Option<u8> = None;
		while let Some(&c) = self.line.as_bytes().get(self.i) {
			match quote {
				Some(q) => if c == q { quote = None },
				None if Parser::is_quote(c) => quote = Some(c),
				None if Parser::is_whitespace(c) => break,
				None => {},
			}
			self.i += 1;
		}
		if orig == self.i { None } else { Some(&self.line[orig .. self.i]) }
	}

	/// Splits the token stream into per-stage groups at every bare `|`.
	fn read_stages(&mut self) -> Vec<Vec<&'a str>> {
		let mut stages: Vec<Vec<&'a str>> = vec![vec![]];
		while let Some(token) = self.read_token() {
			if token == "|" {
				stages.push(vec![]);
			} else if let Some(stage) = stages.last_mut() {
				stage.push(token);
			}
		}
		stages
	}
}

fn strip_quotes(token: &str) -> &str {
	let b = token.as_bytes();
	let len = b.len();
	if len > 2 && Parser::is_quote(b[0]) && b[0] == b[len - 1] {
		&token[1 .. len - 1]
	} else {
		token
	}
}

fn redirect_of(token: &str) -> Option<(RedirectType, &str)> {
	if let Some(rest) = token.strip_prefix('<') {
		Some((RedirectType::Input, rest))
	} else if let Some(rest) = token.strip_prefix(">>") {
		Some((RedirectType::Append, rest))
	} else {
		token.strip_prefix('>').map(|rest| (RedirectType::Output, rest))
	}
}

fn parse_stage(tokens: Vec<&str>) -> Command {
	let mut tokens = tokens.into_iter();
	let mut command = Command::new(tokens.next().unwrap_or(""));

	while let Some(token) = tokens.next() {
		if token == "&" {
			continue;
		}
		if let Some((typ, target)) = redirect_of(token) {
			let target = if target.is_empty() { tokens.next().unwrap_or("") } else { target };
			command.set_redirect(typ, strip_quotes(target).to_owned());
			continue;
		}
		command.arguments.push(strip_quotes(token).to_owned());
	}
	command
}

/// Parses one input line into a chain of commands linked through `next`.
///
/// Parsing never fails: anything unrecognized ends up as a name or an
/// argument, and a blank line yields a command with an empty name.
pub fn parse(line: &str) -> Command {
	let mut line = line.trim_matches(|c: char| c == ' ' || c == '\t' || c == '\n' || c == '\r');
	let mut auto_complete = false;
	let mut background = false;
	if let Some(rest) = line.strip_suffix('?') {
		auto_complete = true;
		line = rest;
	} else if let Some(rest) = line.strip_suffix('&') {
		background = true;
		line = rest;
	}

	let mut parser = Parser { line, i: 0 };
	let stages = parser.read_stages();

	let mut chain: Option<Command> = None;
	for tokens in stages.into_iter().rev() {
		let mut command = parse_stage(tokens);
		command.background = background;
		command.auto_complete = auto_complete;
		command.next = chain.map(Box::new);
		chain = Some(command);
	}
	let chain = chain.unwrap_or_default();
	trace!(stages = chain.len(), background, auto_complete, "parsed line");
	chain
}
