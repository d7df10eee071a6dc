//! nom plumbing shared by the dat and mak grammars.
//!
//! Every grammar reports problems through [`SyntaxError`], which carries the
//! offending slice of the input. Because that slice borrows from the text
//! being parsed, its position can be recovered afterwards without threading
//! line and column counters through every parser.

use nom::{
	bytes::complete::{tag_no_case, take_till1},
	character::complete::{multispace0, space0},
	IResult,
};

use crate::error::{ErrorKind, ParseError};

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct SyntaxError<'a> {
	pub span: &'a str,
	pub kind: ErrorKind,
}

impl<'a> nom::error::ParseError<&'a str> for SyntaxError<'a> {
	fn from_error_kind(input: &'a str, kind: nom::error::ErrorKind) -> Self {
		SyntaxError {
			span: at(input),
			kind: ErrorKind::Syntax(kind),
		}
	}

	fn append(_input: &'a str, _kind: nom::error::ErrorKind, other: Self) -> Self {
		other
	}
}

pub(crate) type PResult<'a, T> = IResult<&'a str, T, SyntaxError<'a>>;

/// A hard error; nom combinators such as `alt` will not try other branches.
pub(crate) fn failure(span: &str, kind: ErrorKind) -> nom::Err<SyntaxError<'_>> {
	nom::Err::Failure(SyntaxError { span, kind })
}

/// The empty span at the start of `input`, used to point at something missing.
pub(crate) fn at(input: &str) -> &str {
	&input[..0]
}

/// The next whitespace-delimited word of `input`, or an empty span.
pub(crate) fn peek_token(input: &str) -> &str {
	input
		.trim_start()
		.split(char::is_whitespace)
		.next()
		.unwrap_or_else(|| at(input))
}

pub(crate) fn ws(input: &str) -> PResult<&str> {
	space0(input)
}

pub(crate) fn multi_ws(input: &str) -> PResult<&str> {
	multispace0(input)
}

/// Skips spaces then takes a run of non-whitespace characters.
pub(crate) fn token<'a>(input: &'a str, field: &'static str) -> PResult<'a, &'a str> {
	let (input, _) = ws(input)?;
	let result: PResult<&str> = take_till1(char::is_whitespace)(input);

	result.map_err(|_| failure(at(input), ErrorKind::Missing(field)))
}

/// Matches a case-insensitive label such as `SURVEY NAME:`.
pub(crate) fn label<'a>(input: &'a str, label: &'static str) -> PResult<'a, &'a str> {
	let result: PResult<&str> = tag_no_case(label)(input);

	result.map_err(|_| failure(peek_token(input), ErrorKind::Expected(label)))
}

pub(crate) fn number(text: &str) -> Option<f64> {
	text.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

impl<'a> SyntaxError<'a> {
	/// Resolves the span against `source`, whose first line is numbered `first_line`.
	pub fn locate(&self, source: &str, first_line: usize) -> ParseError {
		let offset = offset_in(source, self.span);
		let before = &source[..offset];
		let line_start = before.rfind('\n').map_or(0, |index| index + 1);

		ParseError {
			kind: self.kind.clone(),
			text: self.span.to_string(),
			line: first_line + before.matches('\n').count(),
			column: before[line_start..].chars().count() + 1,
		}
	}
}

pub(crate) fn locate<T>(
	result: PResult<'_, T>,
	source: &str,
	first_line: usize,
) -> Result<T, ParseError> {
	match result {
		Ok((_, value)) => Ok(value),
		Err(nom::Err::Error(error)) | Err(nom::Err::Failure(error)) => {
			Err(error.locate(source, first_line))
		}
		Err(nom::Err::Incomplete(_)) => Err(SyntaxError {
			span: &source[source.len()..],
			kind: ErrorKind::Syntax(nom::error::ErrorKind::Eof),
		}
		.locate(source, first_line)),
	}
}

// Spans that do not point into `source` are reported at its end
fn offset_in(source: &str, span: &str) -> usize {
	let start = source.as_ptr() as usize;

	match (span.as_ptr() as usize).checked_sub(start) {
		Some(offset) if offset <= source.len() && source.is_char_boundary(offset) => offset,
		_ => source.len(),
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_token() {
		let (rest, word) = token("  foo bar", "thing").unwrap();
		assert_eq!(word, "foo");
		assert_eq!(rest, " bar");

		let error = token("   ", "thing").expect_err("expected `SyntaxError`");
		assert_eq!(
			error,
			nom::Err::Failure(SyntaxError {
				span: "",
				kind: ErrorKind::Missing("thing")
			})
		);
	}

	#[test]
	fn test_label_is_case_insensitive() {
		assert_eq!(label("survey name: A", "SURVEY NAME:").unwrap().0, " A");
		assert!(label("SURVEY DATE: 1 2 2000", "SURVEY NAME:").is_err());
	}

	#[test]
	fn test_number() {
		assert_eq!(number("2.5"), Some(2.5));
		assert_eq!(number(" -999.00"), Some(-999.0));
		assert_eq!(number("2.35q"), None);
		assert_eq!(number("inf"), None);
		assert_eq!(number("NaN"), None);
	}

	#[test]
	fn test_locate() {
		let source = "first line\nsecond bad line";
		let span = &source[18..21];
		let error = SyntaxError {
			span,
			kind: ErrorKind::Invalid("word"),
		}
		.locate(source, 1);

		assert_eq!(error.text, "bad");
		assert_eq!(error.line, 2);
		assert_eq!(error.column, 8);
		assert_eq!(error.to_string(), "invalid word at line 2, column 8");
	}

	#[test]
	fn test_locate_foreign_span() {
		let error = SyntaxError {
			span: "elsewhere",
			kind: ErrorKind::Missing("word"),
		}
		.locate("abc", 5);

		assert_eq!(error.line, 5);
		assert_eq!(error.column, 4);
	}
}
