use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::{env, fs};
use tracing::debug;

use crate::error::{ExecError, Result};

pub const PATH_KEY: &str = "PATH";

/// The colon-separated directory list executables are looked up in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
	dirs: Vec<PathBuf>,
}

fn is_executable(path: &Path) -> bool {
	use std::os::unix::fs::PermissionsExt;
	match fs::metadata(path) {
		Ok(m) => m.is_file() && m.permissions().mode() & 0o111 != 0,
		Err(_) => false,
	}
}

impl SearchPath {
	pub fn new<S: AsRef<OsStr> + ?Sized>(value: &S) -> SearchPath {
		let dirs = env::split_paths(value).filter(|p| !p.as_os_str().is_empty()).collect();
		SearchPath { dirs }
	}

	pub fn from_env() -> SearchPath {
		SearchPath::new(&env::var_os(PATH_KEY).unwrap_or_default())
	}

	pub fn dirs(&self) -> &[PathBuf] {
		&self.dirs
	}

	/// Resolves a command name to the file to exec. Names with a slash are
	/// taken as paths relative to `cwd`; bare names are searched on the path.
	pub fn resolve(&self, name: &str, cwd: &Path) -> Result<PathBuf> {
		if name.contains('/') {
			let path = cwd.join(name);
			return if is_executable(&path) {
				Ok(path)
			} else {
				Err(ExecError::NotFound(name.to_owned()))
			};
		}
		for dir in &self.dirs {
			let candidate = cwd.join(dir).join(name);
			if is_executable(&candidate) {
				debug!(name, path = %candidate.display(), "resolved");
				return Ok(candidate);
			}
		}
		Err(ExecError::NotFound(name.to_owned()))
	}

	/// Executable names on the path that start with `prefix`, sorted.
	pub fn complete(&self, prefix: &str) -> Vec<String> {
		let mut names = BTreeSet::new();
		for dir in &self.dirs {
			let entries = match fs::read_dir(dir) {
				Ok(entries) => entries,
				Err(_) => continue,
			};
			for entry in entries.flatten() {
				let name = entry.file_name().to_string_lossy().into_owned();
				if name.starts_with(prefix) && is_executable(&entry.path()) {
					names.insert(name);
				}
			}
		}
		names.into_iter().collect()
	}
}

/// Entries of `dir` whose names start with `prefix`, sorted. Directories get a
/// trailing slash.
pub fn complete_file(dir: &Path, prefix: &str) -> Vec<String> {
	let (sub, stem) = match prefix.rfind('/') {
		Some(i) => (&prefix[.. i + 1], &prefix[i + 1 ..]),
		None => ("", prefix),
	};
	let entries = match fs::read_dir(dir.join(sub)) {
		Ok(entries) => entries,
		Err(_) => return vec![],
	};
	let mut names: Vec<String> = entries.flatten().filter_map(|entry| {
		let name = entry.file_name().to_string_lossy().into_owned();
		if !name.starts_with(stem) || (stem.is_empty() && name.starts_with('.')) {
			return None;
		}
		let slash = if entry.path().is_dir() { "/" } else { "" };
		Some(format!("{}{}{}", sub, name, slash))
	}).collect();
	names.sort();
	names
}
