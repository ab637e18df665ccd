use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output, Append }

/// One stage of a pipeline, linked to the stage it pipes into.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Command {
	pub name: String,
	pub arguments: Vec<String>,
	pub background: bool,
	pub auto_complete: bool,
	pub redirect_in: Option<String>,
	pub redirect_out: Option<String>,
	pub redirect_append: Option<String>,
	pub next: Option<Box<Command>>,
}

impl Command {
	pub fn new(name: &str) -> Command {
		Command { name: name.to_owned(), ..Command::default() }
	}

	/// Records a redirection. Output and append share stdout, so setting one
	/// clears the other.
	pub fn set_redirect(&mut self, typ: RedirectType, target: String) {
		match typ {
			RedirectType::Input => self.redirect_in = Some(target),
			RedirectType::Output => {
				self.redirect_append = None;
				self.redirect_out = Some(target);
			},
			RedirectType::Append => {
				self.redirect_out = None;
				self.redirect_append = Some(target);
			},
		}
	}

	pub fn redirects(&self) -> impl Iterator<Item = (RedirectType, &str)> {
		let slots = [
			(RedirectType::Input, &self.redirect_in),
			(RedirectType::Output, &self.redirect_out),
			(RedirectType::Append, &self.redirect_append),
		];
		slots.into_iter().filter_map(|(typ, target)| target.as_deref().map(|t| (typ, t)))
	}

	/// `name` followed by the arguments, the layout `execv` expects minus the
	/// terminating null.
	pub fn argv(&self) -> impl Iterator<Item = &str> {
		std::iter::once(self.name.as_str()).chain(self.arguments.iter().map(String::as_str))
	}

	pub fn stages(&self) -> Stages<'_> {
		Stages { cur: Some(self) }
	}

	pub fn len(&self) -> usize {
		self.stages().count()
	}

	pub fn is_last(&self) -> bool {
		self.next.is_none()
	}

	fn fmt_indented(&self, f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
		let pad = "\t".repeat(depth);
		let yes_no = |b: bool| if b { "yes" } else { "no" };
		writeln!(f, "{}Command: <{}>", pad, self.name)?;
		writeln!(f, "{}\tIs Background: {}", pad, yes_no(self.background))?;
		writeln!(f, "{}\tNeeds Auto-complete: {}", pad, yes_no(self.auto_complete))?;
		writeln!(f, "{}\tRedirects:", pad)?;
		let slots = [&self.redirect_in, &self.redirect_out, &self.redirect_append];
		for (i, slot) in slots.iter().enumerate() {
			writeln!(f, "{}\t\t{}: {}", pad, i, slot.as_deref().unwrap_or("N/A"))?;
		}
		writeln!(f, "{}\tArguments ({}):", pad, self.arguments.len())?;
		for (i, arg) in self.arguments.iter().enumerate() {
			writeln!(f, "{}\t\tArg {}: {}", pad, i, arg)?;
		}
		if let Some(ref next) = self.next {
			writeln!(f, "{}\tPiped to:", pad)?;
			next.fmt_indented(f, depth + 1)?;
		}
		Ok(())
	}
}

impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		self.fmt_indented(f, 0)
	}
}

pub struct Stages<'a> {
	cur: Option<&'a Command>,
}

impl<'a> Iterator for Stages<'a> {
	type Item = &'a Command;

	fn next(&mut self) -> Option<&'a Command> {
		let cur = self.cur?;
		self.cur = cur.next.as_deref();
		Some(cur)
	}
}
