use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogStrategy {
	StdErr,
	File(PathBuf),
	Discard,
}

#[derive(Clone, Debug)]
pub struct Logger(LogStrategy);
impl Logger {
	pub fn new(strat: LogStrategy) -> Self { Self(strat) }
	pub fn log(&self, msg: impl Display) {
		match &self.0 {
			LogStrategy::StdErr => eprintln!("{msg}"),
			LogStrategy::File(f) => {
				let written = OpenOptions::new()
					.create(true)
					.append(true)
					.open(f)
					.and_then(|mut file| writeln!(file, "{msg}"));
				if let Err(e) = written {
					eprintln!("failed to log to {}: {e}\n{msg}", f.display())
				}
			},
			LogStrategy::Discard => (),
		}
	}
	pub fn strat(&self) -> LogStrategy { self.0.clone() }
}
