use std::{io, path::PathBuf};

use thiserror::Error;

/// What went wrong while parsing, independent of where it happened.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ErrorKind {
	#[error("missing {0}")]
	Missing(&'static str),

	#[error("invalid {0}")]
	Invalid(&'static str),

	#[error("duplicate {0}")]
	Duplicate(&'static str),

	#[error("expected {0}")]
	Expected(&'static str),

	#[error("distance is required")]
	DistanceRequired,

	#[error("missing # after flags")]
	UnterminatedFlags,

	#[error("unexpected form feed before end of trip header")]
	UnexpectedFormFeed,

	#[error("unexpected end of input in trip header")]
	UnexpectedEndOfHeader,

	#[error("missing ; at end of directive")]
	MissingSemicolon,

	#[error("excess field after convergence angle")]
	ExcessField,

	#[error("missing closing ]")]
	MissingClosingBracket,

	#[error("invalid directive character")]
	InvalidDirective,

	#[error("unexpected input ({0:?})")]
	Syntax(nom::error::ErrorKind),
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error("{kind} at line {line}, column {column}")]
pub struct ParseError {
	pub kind: ErrorKind,
	/// The offending text; empty when something was missing.
	pub text: String,
	/// 1-based.
	pub line: usize,
	/// 1-based, in characters.
	pub column: usize,
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum FormatError {
	#[error("invalid station name: {0}")]
	InvalidStationName(String),

	#[error("distance is required")]
	InvalidDistance,

	#[error("invalid UTM zone: {0}")]
	InvalidUtmZone(u8),

	/// Text that would end its directive early or could not be read back.
	#[error("invalid {field}: {text:?}")]
	InvalidText { field: &'static str, text: String },
}

/// Errors from reading or writing whole files.
#[derive(Debug, Error)]
pub enum Error {
	#[error("I/O error on {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("{path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: ParseError,
	},

	#[error(transparent)]
	Format(#[from] FormatError),

	#[error("canceled")]
	Canceled,
}
