use std::mem;

use chrono::NaiveDate;
use nom::{bytes::complete::tag_no_case, character::complete::char, combinator::opt};
use tracing::{debug, warn};

use crate::{
	error::{ErrorKind, ParseError},
	format_string::parse_trip_format,
	station::is_valid_station_name,
	syntax::{at, failure, label, locate, number, peek_token, token, ws, PResult, SyntaxError},
	Angle, BacksightItem, Corrections, DatFile, FrontsightItem, Inclination, Length, LrudItem,
	Shot, ShotFlags, Trip, TripFormat, TripHeader,
};

const CAVE_OFFSET: usize = 0;
const SURVEY_NAME_OFFSET: usize = 1;
const SURVEY_DATE_OFFSET: usize = 2;
const SURVEY_TEAM_LABEL_OFFSET: usize = 3;
const SURVEY_TEAM_OFFSET: usize = 4;
const FORMAT_OFFSET: usize = 5;
const COLUMN_HEADERS_OFFSET: usize = 7;
const DATA_OFFSET: usize = 9;

const SURVEY_NAME: &str = "SURVEY NAME:";
const SURVEY_DATE: &str = "SURVEY DATE:";
const SURVEY_TEAM: &str = "SURVEY TEAM:";
const COMMENT: &str = "COMMENT:";
const DECLINATION: &str = "DECLINATION:";
const FORMAT: &str = "FORMAT:";
const CORRECTIONS: &str = "CORRECTIONS:";
const CORRECTIONS2: &str = "CORRECTIONS2:";

const FORM_FEED: char = '\x0c';
const SUBSTITUTE: char = '\x1a';

/// Lengths below this are readings that were not taken.
const LENGTH_SENTINEL: f64 = 0.0;
/// Angles below this are readings that were not taken.
const ANGLE_SENTINEL: f64 = -900.0;

/// Parses a complete dat file held in memory.
pub fn parse_dat_file(input: &str) -> Result<DatFile, ParseError> {
	let trips = trips(input.lines()).collect::<Result<Vec<_>, _>>()?;

	Ok(DatFile { trips })
}

/// Lazily parses trips from a sequence of lines without line terminators.
///
/// Iteration stops after the first error.
pub fn trips<I>(lines: I) -> Trips<I::IntoIter>
where
	I: IntoIterator,
	I::Item: AsRef<str>,
{
	Trips {
		lines: lines.into_iter(),
		parser: Some(DatParser::new()),
	}
}

pub struct Trips<I> {
	lines: I,
	parser: Option<DatParser>,
}

impl<I> Iterator for Trips<I>
where
	I: Iterator,
	I::Item: AsRef<str>,
{
	type Item = Result<Trip, ParseError>;

	fn next(&mut self) -> Option<Self::Item> {
		let parser = self.parser.as_mut()?;

		for line in self.lines.by_ref() {
			match parser.parse_line(line.as_ref()) {
				Ok(Some(trip)) => return Some(Ok(trip)),
				Ok(None) => {}
				Err(error) => {
					self.parser = None;
					return Some(Err(error));
				}
			}
		}

		self.parser.take()?.finish().transpose()
	}
}

/// Push parser for dat files: feed it one line at a time and it hands back
/// each trip once the form feed ending it has been seen.
#[derive(Debug, Default)]
pub struct DatParser {
	/// Lines seen so far.
	line_number: usize,
	/// Position of the next line within the current trip.
	offset: usize,
	/// Blank lines skipped while waiting for a cave name.
	skipped_lines: usize,
	header: PartialHeader,
	trip: Option<Trip>,
}

#[derive(Debug, Default)]
struct PartialHeader {
	cave: Option<String>,
	name: Option<String>,
	date: Option<(NaiveDate, Option<String>)>,
	team: Option<String>,
	format: Option<(Angle, TripFormat, Corrections)>,
}

impl PartialHeader {
	fn has_content(&self) -> bool {
		self.cave.is_some()
	}

	fn complete(self) -> Option<TripHeader> {
		let (date, comment) = self.date?;
		let (declination, format, corrections) = self.format?;

		Some(TripHeader {
			cave: self.cave?,
			name: self.name?,
			date,
			comment,
			team: self.team,
			declination,
			format,
			corrections,
		})
	}
}

impl DatParser {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn parse_line(&mut self, line: &str) -> Result<Option<Trip>, ParseError> {
		self.line_number += 1;

		if line.starts_with(FORM_FEED) {
			if self.offset < DATA_OFFSET {
				let error = SyntaxError {
					span: &line[..FORM_FEED.len_utf8()],
					kind: ErrorKind::UnexpectedFormFeed,
				};
				return Err(error.locate(line, self.line_number));
			}

			self.offset = CAVE_OFFSET;
			self.header = PartialHeader::default();
			return Ok(self.complete_trip());
		}

		if self.offset < DATA_OFFSET {
			let result = self.parse_header_line(line);
			locate(result, line, self.line_number)?;
			return Ok(None);
		}

		if is_blank(line) {
			return Ok(None);
		}

		let trip = match self.trip.as_mut() {
			Some(trip) => trip,
			None => {
				let error = SyntaxError {
					span: at(line),
					kind: ErrorKind::UnexpectedEndOfHeader,
				};
				return Err(error.locate(line, self.line_number));
			}
		};

		let shot = locate(parse_shot(line, &trip.header.format), line, self.line_number)?;
		trip.shots.push(shot);

		Ok(None)
	}

	/// Signals the end of input, returning the last trip if it was not
	/// followed by a form feed.
	pub fn finish(mut self) -> Result<Option<Trip>, ParseError> {
		if self.trip.is_some() {
			return Ok(self.complete_trip());
		}

		if self.header.has_content() {
			return Err(ParseError {
				kind: ErrorKind::UnexpectedEndOfHeader,
				text: String::new(),
				line: self.line_number,
				column: 1,
			});
		}

		if self.skipped_lines > 0 {
			warn!(lines = self.skipped_lines, "discarding trailing blank lines");
		}

		Ok(None)
	}

	fn complete_trip(&mut self) -> Option<Trip> {
		let trip = self.trip.take()?;
		debug!(survey = %trip.header.name, shots = trip.shots.len(), "parsed trip");

		Some(trip)
	}

	fn parse_header_line<'a>(&mut self, line: &'a str) -> PResult<'a, ()> {
		match self.offset {
			CAVE_OFFSET => {
				if is_blank(line) {
					self.skipped_lines += 1;
					return Ok((line, ()));
				}

				let skipped = mem::take(&mut self.skipped_lines);
				let result: PResult<&str> = tag_no_case(SURVEY_NAME)(line);
				if skipped > 0 && result.is_ok() {
					// the cave line was left empty
					self.header.cave = Some(String::new());
					self.offset = SURVEY_NAME_OFFSET;
					return self.parse_header_line(line);
				}

				self.header.cave = Some(line.trim().to_string());
			}
			SURVEY_NAME_OFFSET => {
				let (rest, _) = label(line, SURVEY_NAME)?;
				self.header.name = Some(rest.trim().to_string());
			}
			SURVEY_DATE_OFFSET => {
				let (_, date) = parse_survey_date(line)?;
				self.header.date = Some(date);
			}
			SURVEY_TEAM_LABEL_OFFSET => {
				label(line, SURVEY_TEAM)?;
			}
			SURVEY_TEAM_OFFSET => {
				self.header.team = non_empty(line.trim());
			}
			FORMAT_OFFSET => {
				let (_, format) = parse_format_line(line)?;
				self.header.format = Some(format);
			}
			COLUMN_HEADERS_OFFSET => {
				if is_blank(line) {
					return Err(failure(at(line), ErrorKind::Expected("column headers")));
				}

				let header = mem::take(&mut self.header)
					.complete()
					.ok_or_else(|| failure(at(line), ErrorKind::UnexpectedEndOfHeader))?;
				self.trip = Some(Trip {
					header,
					shots: Vec::new(),
				});
			}
			_ => {
				if !is_blank(line) {
					return Err(failure(line.trim(), ErrorKind::Expected("blank line")));
				}
			}
		}

		self.offset += 1;
		Ok((line, ()))
	}
}

fn is_blank(line: &str) -> bool {
	line.trim_matches(|c: char| c.is_whitespace() || c == SUBSTITUTE)
		.is_empty()
}

fn non_empty(text: &str) -> Option<String> {
	(!text.is_empty()).then(|| text.to_string())
}

// SurveyDate = {
//   "SURVEY DATE:"
//   Date date
//   optional "COMMENT:" String comment  // rest of line
// }
fn parse_survey_date(input: &str) -> PResult<(NaiveDate, Option<String>)> {
	let (input, _) = label(input, SURVEY_DATE)?;

	let (date, comment) = match input.to_ascii_uppercase().find(COMMENT) {
		Some(index) => (&input[..index], non_empty(input[index + COMMENT.len()..].trim())),
		None => (input, None),
	};
	let (_, date) = parse_date(date)?;

	Ok((&input[input.len()..], (date, comment)))
}

// Date = {
//   Number month  // 1..12
//   Number day    // 1..days in month
//   Number year
// }
fn parse_date(input: &str) -> PResult<NaiveDate> {
	let (input, month_text) = token(input, "month")?;
	let (input, day_text) = token(input, "day")?;
	let (input, year_text) = token(input, "year")?;

	let (input, _) = ws(input)?;
	if !input.is_empty() {
		return Err(failure(
			peek_token(input),
			ErrorKind::Expected("COMMENT: after date"),
		));
	}

	let month = digits(month_text)
		.filter(|month| (1..=12).contains(month))
		.ok_or_else(|| failure(month_text, ErrorKind::Invalid("month")))?;
	let year = digits(year_text)
		.and_then(|year| i32::try_from(year).ok())
		.ok_or_else(|| failure(year_text, ErrorKind::Invalid("year")))?;
	let day = digits(day_text)
		.filter(|day| (1..=days_in_month(month, year)).contains(day))
		.ok_or_else(|| failure(day_text, ErrorKind::Invalid("day")))?;

	let date = NaiveDate::from_ymd_opt(year, month, day)
		.ok_or_else(|| failure(year_text, ErrorKind::Invalid("year")))?;

	Ok((input, date))
}

fn digits(text: &str) -> Option<u32> {
	if !text.bytes().all(|byte| byte.is_ascii_digit()) {
		return None;
	}

	text.parse().ok()
}

fn days_in_month(month: u32, year: i32) -> u32 {
	match month {
		2 if year % 400 == 0 || (year % 100 != 0 && year % 4 == 0) => 29,
		2 => 28,
		4 | 6 | 9 | 11 => 30,
		_ => 31,
	}
}

// FormatLine = {
//   "DECLINATION:" Number declination  // degrees
//   "FORMAT:" Format format
//   optional "CORRECTIONS:" {
//     Number azimuth      // degrees
//     Number inclination  // degrees, feet for depth gauge
//     Number distance     // feet
//     optional "CORRECTIONS2:" {
//       Number backsightAzimuth
//       Number backsightInclination
//     }
//   }
// }
fn parse_format_line(input: &str) -> PResult<(Angle, TripFormat, Corrections)> {
	let (input, _) = label(input, DECLINATION)?;
	let (input, declination) = parse_declination(input)?;
	let (input, _) = ws(input)?;
	let (input, _) = label(input, FORMAT)?;
	let (input, format_text) = token(input, "format")?;
	let (_, format) = parse_trip_format(format_text)?;
	let (input, _) = ws(input)?;

	let mut corrections = Corrections::default();

	let result: PResult<Option<&str>> = opt(tag_no_case(CORRECTIONS))(input);
	let (input, found) = result?;
	if found.is_none() {
		return Ok((input, (declination, format, corrections)));
	}

	let (input, azimuth) = parse_correction(input, "azimuth correction")?;
	let (input, inclination) = parse_correction(input, "inclination correction")?;
	let (input, distance) = parse_correction(input, "distance correction")?;
	corrections.frontsight_azimuth = azimuth.map(Angle::degrees);
	corrections.frontsight_inclination = inclination.map(|value| inclination_value(&format, value));
	corrections.distance = distance.map(Length::feet);

	let (input, _) = ws(input)?;
	let result: PResult<Option<&str>> = opt(tag_no_case(CORRECTIONS2))(input);
	let (input, found) = result?;
	if found.is_none() {
		return Ok((input, (declination, format, corrections)));
	}

	let (input, azimuth) = parse_correction(input, "backsight azimuth correction")?;
	let (input, inclination) = parse_correction(input, "backsight inclination correction")?;
	corrections.backsight_azimuth = azimuth.map(Angle::degrees);
	corrections.backsight_inclination = inclination.map(|value| inclination_value(&format, value));

	Ok((input, (declination, format, corrections)))
}

fn parse_declination(input: &str) -> PResult<Angle> {
	let (input, text) = token(input, "declination")?;
	let value = number(text)
		.filter(|value| *value >= ANGLE_SENTINEL)
		.ok_or_else(|| failure(text, ErrorKind::Invalid("declination")))?;

	Ok((input, Angle::degrees(value)))
}

// zero and absent are written the same way
fn parse_correction<'a>(input: &'a str, field: &'static str) -> PResult<'a, Option<f64>> {
	let (input, text) = token(input, field)?;
	let value = number(text).ok_or_else(|| failure(text, ErrorKind::Invalid(field)))?;

	Ok((input, (value != 0.0).then(|| value)))
}

fn inclination_value(format: &TripFormat, value: f64) -> Inclination {
	if format.is_depth_gauge() {
		Inclination::Depth(Length::feet(value))
	} else {
		Inclination::Angle(Angle::degrees(value))
	}
}

// Shot = {
//   String from
//   String to
//   Number[3] frontsight  // FORMAT order
//   Number[4] lrud        // FORMAT order, feet
//   if (FORMAT has backsights)
//     Number[2] backsight // FORMAT order
//   optional Flags flags
//   optional String comment  // rest of line
// }
fn parse_shot<'a>(input: &'a str, format: &TripFormat) -> PResult<'a, Shot> {
	let (input, from) = parse_station(input, "from station")?;
	let (mut input, to) = parse_station(input, "to station")?;

	let mut distance = None;
	let mut frontsight_azimuth = None;
	let mut frontsight_inclination = None;
	for item in format.frontsight_order {
		input = match item {
			FrontsightItem::Distance => {
				let (rest, value) = parse_distance(input)?;
				distance = Some(value);
				rest
			}
			FrontsightItem::Azimuth => {
				let (rest, value) = parse_azimuth(input, "frontsight azimuth")?;
				frontsight_azimuth = value;
				rest
			}
			FrontsightItem::Inclination => {
				let (rest, value) = parse_inclination(input, "frontsight inclination", format)?;
				frontsight_inclination = value;
				rest
			}
		};
	}
	let distance = distance.ok_or_else(|| failure(at(input), ErrorKind::Missing("distance")))?;

	let mut lrud = [None; 4];
	for (index, item) in format.lrud_order.iter().enumerate() {
		let field = match item {
			LrudItem::Left => "left",
			LrudItem::Right => "right",
			LrudItem::Up => "up",
			LrudItem::Down => "down",
		};
		let (rest, value) = parse_length(input, field)?;
		lrud[index] = value;
		input = rest;
	}
	let lrud_value = |wanted: LrudItem| {
		format
			.lrud_order
			.iter()
			.position(|item| *item == wanted)
			.and_then(|index| lrud[index])
	};

	let mut backsight_azimuth = None;
	let mut backsight_inclination = None;
	for item in format.backsight_order.iter().flatten() {
		input = match item {
			BacksightItem::Azimuth => {
				let (rest, value) = parse_azimuth(input, "backsight azimuth")?;
				backsight_azimuth = value;
				rest
			}
			BacksightItem::Inclination => {
				let (rest, value) = parse_inclination(input, "backsight inclination", format)?;
				backsight_inclination = value;
				rest
			}
		};
	}

	let (input, _) = ws(input)?;
	let (input, flags) = if input.starts_with('#') {
		parse_flags(input)?
	} else {
		(input, ShotFlags::empty())
	};

	let shot = Shot {
		from,
		to,
		distance,
		frontsight_azimuth,
		frontsight_inclination,
		backsight_azimuth,
		backsight_inclination,
		left: lrud_value(LrudItem::Left),
		right: lrud_value(LrudItem::Right),
		up: lrud_value(LrudItem::Up),
		down: lrud_value(LrudItem::Down),
		flags,
		comment: non_empty(input.trim()),
	};

	Ok((&input[input.len()..], shot))
}

fn parse_station<'a>(input: &'a str, field: &'static str) -> PResult<'a, String> {
	let (input, name) = token(input, field)?;
	if !is_valid_station_name(name) {
		return Err(failure(name, ErrorKind::Invalid(field)));
	}

	Ok((input, name.to_string()))
}

fn parse_number<'a>(input: &'a str, field: &'static str) -> PResult<'a, (&'a str, f64)> {
	let (input, text) = token(input, field)?;
	let value = number(text).ok_or_else(|| failure(text, ErrorKind::Invalid(field)))?;

	Ok((input, (text, value)))
}

fn parse_length<'a>(input: &'a str, field: &'static str) -> PResult<'a, Option<Length>> {
	let (input, (_, value)) = parse_number(input, field)?;

	Ok((input, (value >= LENGTH_SENTINEL).then(|| Length::feet(value))))
}

fn parse_distance(input: &str) -> PResult<Length> {
	let (input, (text, value)) = parse_number(input, "distance")?;
	if value < LENGTH_SENTINEL {
		return Err(failure(text, ErrorKind::DistanceRequired));
	}

	Ok((input, Length::feet(value)))
}

fn parse_angle<'a>(
	input: &'a str,
	field: &'static str,
	min: f64,
	max: f64,
) -> PResult<'a, Option<f64>> {
	let (input, (text, value)) = parse_number(input, field)?;
	if value < ANGLE_SENTINEL {
		return Ok((input, None));
	}
	if value < min || value > max {
		return Err(failure(text, ErrorKind::Invalid(field)));
	}

	Ok((input, Some(value)))
}

fn parse_azimuth<'a>(input: &'a str, field: &'static str) -> PResult<'a, Option<Angle>> {
	let (input, value) = parse_angle(input, field, 0.0, 360.0)?;

	Ok((input, value.map(Angle::degrees)))
}

fn parse_inclination<'a>(
	input: &'a str,
	field: &'static str,
	format: &TripFormat,
) -> PResult<'a, Option<Inclination>> {
	if format.is_depth_gauge() {
		let (input, (_, value)) = parse_number(input, field)?;
		let depth = (value >= ANGLE_SENTINEL).then(|| Inclination::Depth(Length::feet(value)));
		return Ok((input, depth));
	}

	let (input, value) = parse_angle(input, field, -90.0, 90.0)?;

	Ok((input, value.map(|value| Inclination::Angle(Angle::degrees(value)))))
}

// Flags = {
//   "#|"
//   Char[] flags  // any of L P X C, repeats allowed
//   "#"
// }
fn parse_flags(input: &str) -> PResult<ShotFlags> {
	let result: PResult<char> = char('#')(input);
	let (input, _) = result?;
	let (input, _) = label(input, "|")?;

	let mut flags = ShotFlags::empty();
	for (index, c) in input.char_indices() {
		if c == '#' {
			return Ok((&input[index + 1..], flags));
		}

		match ShotFlags::from_char(c) {
			Some(flag) => flags |= flag,
			None => {
				let span = &input[index..index + c.len_utf8()];
				return Err(failure(span, ErrorKind::Invalid("flag")));
			}
		}
	}

	Err(failure(&input[input.len()..], ErrorKind::UnterminatedFlags))
}
