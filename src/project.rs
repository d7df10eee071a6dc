//! Reading and writing dat and mak files on disk, and loading a whole
//! project: a mak file together with every dat file it names.
//!
//! Files are treated as 8-bit text: each byte is one character on read, and
//! characters that do not fit in a byte are written as `?`.

use std::{
	fs::{self, File},
	io::{self, BufRead, BufReader, BufWriter, Write},
	path::{Path, PathBuf},
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
};

use tracing::info;

use crate::{
	error::{Error, ParseError},
	formatter::format_trip,
	mak::{format_directive, parse_mak_file, MakFile},
	parser::{parse_dat_file, DatParser},
	DatFile,
};

/// How far a project load has got, in bytes of dat files read.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Progress {
	/// Set when a new file is started.
	pub message: Option<String>,
	pub completed: u64,
	pub total: u64,
}

/// Receives progress reports and decides whether a load should stop early.
pub trait Task {
	fn on_progress(&mut self, progress: Progress);

	fn is_canceled(&self) -> bool;
}

/// Ignores progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTask;

impl Task for NoopTask {
	fn on_progress(&mut self, _progress: Progress) {}

	fn is_canceled(&self) -> bool {
		false
	}
}

/// A flag another thread can set to cancel the load.
impl Task for Arc<AtomicBool> {
	fn on_progress(&mut self, _progress: Progress) {}

	fn is_canceled(&self) -> bool {
		self.load(Ordering::Relaxed)
	}
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReadOptions {
	/// Number of dat lines read between cancellation checks; 0 acts as 1.
	pub cancel_check_interval: usize,
}

impl Default for ReadOptions {
	fn default() -> Self {
		ReadOptions {
			cancel_check_interval: 1,
		}
	}
}

pub fn read_dat_file(path: impl AsRef<Path>) -> Result<DatFile, Error> {
	let path = path.as_ref();
	info!(path = %path.display(), "reading dat file");

	let text = read_text(path)?;
	parse_dat_file(&text).map_err(|source| parse_error(path, source))
}

/// Writes `file` one trip at a time.
pub fn write_dat_file(path: impl AsRef<Path>, file: &DatFile) -> Result<(), Error> {
	let path = path.as_ref();
	let mut out = create(path)?;

	for trip in &file.trips {
		let chunk = format_trip(trip)?;
		out.write_all(&encode(&chunk))
			.map_err(|source| io_error(path, source))?;
	}

	out.flush().map_err(|source| io_error(path, source))
}

pub fn read_mak_file(path: impl AsRef<Path>) -> Result<MakFile, Error> {
	let path = path.as_ref();
	info!(path = %path.display(), "reading mak file");

	let text = read_text(path)?;
	parse_mak_file(&text).map_err(|source| parse_error(path, source))
}

pub fn write_mak_file(path: impl AsRef<Path>, file: &MakFile) -> Result<(), Error> {
	let path = path.as_ref();
	let mut out = create(path)?;

	for directive in &file.directives {
		let chunk = format_directive(directive)?;
		out.write_all(&encode(&chunk))
			.map_err(|source| io_error(path, source))?;
	}

	out.flush().map_err(|source| io_error(path, source))
}

/// Reads the mak file at `path` and then each dat file it names, relative to
/// the mak file's directory, storing the parsed trips in the directive's
/// `data`.
///
/// Progress is reported after every dat line. The task is asked whether to
/// cancel before each dat file and every `cancel_check_interval` lines.
pub fn read_mak_and_dat_files(
	path: impl AsRef<Path>,
	options: &ReadOptions,
	task: &mut impl Task,
) -> Result<MakFile, Error> {
	let path = path.as_ref();
	task.on_progress(Progress {
		message: Some(format!("Reading {}", path.display())),
		..Progress::default()
	});

	let mut mak = read_mak_file(path)?;
	check_canceled(&*task)?;

	let directory = path.parent().unwrap_or_else(|| Path::new(""));
	let mut total = 0;
	for dat_file in mak.dat_files() {
		let dat_path = directory.join(&dat_file.file);
		let metadata = fs::metadata(&dat_path).map_err(|source| io_error(&dat_path, source))?;
		total += metadata.len();
	}

	let interval = options.cancel_check_interval.max(1);
	let mut progress = Progress {
		message: None,
		completed: 0,
		total,
	};

	for dat_file in mak.dat_files_mut() {
		check_canceled(&*task)?;

		let dat_path = directory.join(&dat_file.file);
		info!(path = %dat_path.display(), "reading dat file");
		task.on_progress(Progress {
			message: Some(format!("Reading {}", dat_path.display())),
			..progress.clone()
		});

		dat_file.data = Some(stream_dat_file(&dat_path, interval, &mut progress, task)?);
	}

	Ok(mak)
}

fn stream_dat_file(
	path: &Path,
	interval: usize,
	progress: &mut Progress,
	task: &mut impl Task,
) -> Result<DatFile, Error> {
	let file = File::open(path).map_err(|source| io_error(path, source))?;
	let mut reader = BufReader::new(file);
	let mut parser = DatParser::new();
	let mut trips = Vec::new();
	let mut buffer = Vec::new();
	let mut lines = 0usize;

	loop {
		buffer.clear();
		let read = reader
			.read_until(b'\n', &mut buffer)
			.map_err(|source| io_error(path, source))?;
		if read == 0 {
			break;
		}

		let line = decode(strip_line_break(&buffer));
		if let Some(trip) = parser
			.parse_line(&line)
			.map_err(|source| parse_error(path, source))?
		{
			trips.push(trip);
		}

		progress.completed += read as u64;
		task.on_progress(progress.clone());

		lines += 1;
		if lines % interval == 0 {
			check_canceled(&*task)?;
		}
	}

	if let Some(trip) = parser.finish().map_err(|source| parse_error(path, source))? {
		trips.push(trip);
	}

	Ok(DatFile { trips })
}

fn check_canceled(task: &impl Task) -> Result<(), Error> {
	if task.is_canceled() {
		return Err(Error::Canceled);
	}

	Ok(())
}

fn strip_line_break(line: &[u8]) -> &[u8] {
	let line = line.strip_suffix(b"\n").unwrap_or(line);
	line.strip_suffix(b"\r").unwrap_or(line)
}

fn decode(bytes: &[u8]) -> String {
	bytes.iter().map(|&byte| char::from(byte)).collect()
}

fn encode(text: &str) -> Vec<u8> {
	text.chars()
		.map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
		.collect()
}

fn read_text(path: &Path) -> Result<String, Error> {
	let bytes = fs::read(path).map_err(|source| io_error(path, source))?;

	Ok(decode(&bytes))
}

fn create(path: &Path) -> Result<BufWriter<File>, Error> {
	let file = File::create(path).map_err(|source| io_error(path, source))?;

	Ok(BufWriter::new(file))
}

fn io_error(path: &Path, source: io::Error) -> Error {
	Error::Io {
		path: PathBuf::from(path),
		source,
	}
}

fn parse_error(path: &Path, source: ParseError) -> Error {
	Error::Parse {
		path: PathBuf::from(path),
		source,
	}
}
