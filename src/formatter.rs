use chrono::Datelike;

use crate::{
	error::FormatError, station::validate_station_name, AngleUnit, BacksightItem, Corrections,
	DatFile, FrontsightItem, LengthUnit, LrudItem, Shot, ShotFlags, Trip, TripFormat, TripHeader,
};

const MAX_CAVE_LENGTH: usize = 80;
const MAX_SURVEY_NAME_LENGTH: usize = 12;
const MAX_TEAM_LENGTH: usize = 100;
const MAX_SHOT_COMMENT_LENGTH: usize = 80;

const STATION_WIDTH: usize = 13;
const NUMBER_WIDTH: usize = 8;

/// Written in place of a reading that was not taken.
const MISSING_VALUE: &str = "-999.00";

const TRIP_END: &str = "\x0c\r\n";

/// Formats every trip of `file`, each followed by a form feed line.
pub fn format_dat_file(file: &DatFile) -> Result<String, FormatError> {
	let mut out = String::new();
	for trip in &file.trips {
		out.push_str(&format_trip(trip)?);
	}

	Ok(out)
}

/// A trip header, its shots and the form feed ending it.
pub fn format_trip(trip: &Trip) -> Result<String, FormatError> {
	let mut out = format_trip_header(&trip.header);
	for shot in &trip.shots {
		out.push_str(&format_shot(&trip.header.format, shot)?);
	}
	out.push_str(TRIP_END);

	Ok(out)
}

/// The nine header lines of a trip, through the blank line after the
/// column headers.
pub fn format_trip_header(header: &TripHeader) -> String {
	let date = format!(
		"{} {} {}",
		header.date.month(),
		header.date.day(),
		header.date.year()
	);
	let comment = match header.comment.as_deref().map(single_line) {
		Some(comment) if !comment.is_empty() => format!("  COMMENT: {}", comment),
		_ => String::new(),
	};

	let mut out = String::new();
	out.push_str(&format!("{}\r\n", truncate(&single_line(&header.cave), MAX_CAVE_LENGTH)));
	out.push_str(&format!(
		"SURVEY NAME: {}\r\n",
		truncate(&header.name, MAX_SURVEY_NAME_LENGTH)
	));
	out.push_str(&format!("SURVEY DATE: {}{}\r\n", date, comment));
	out.push_str("SURVEY TEAM:\r\n");
	out.push_str(&format!(
		"{}\r\n",
		truncate(&single_line(header.team.as_deref().unwrap_or("")), MAX_TEAM_LENGTH)
	));
	out.push_str(&format!(
		"DECLINATION: {}  FORMAT: {}{}\r\n",
		fixed(header.declination.get(AngleUnit::Degrees)),
		header.format,
		format_corrections(&header.corrections)
	));
	out.push_str("\r\n");
	out.push_str(&column_headers(&header.format));
	out.push_str("\r\n\r\n");

	out
}

fn format_corrections(corrections: &Corrections) -> String {
	if corrections.is_empty() {
		return String::new();
	}

	let value = |value: Option<f64>| fixed(value.unwrap_or(0.0));

	let mut out = format!(
		"  CORRECTIONS: {} {} {}",
		value(corrections.frontsight_azimuth.map(|a| a.get(AngleUnit::Degrees))),
		value(corrections.frontsight_inclination.map(|i| i.file_value())),
		value(corrections.distance.map(|d| d.get(LengthUnit::Feet)))
	);

	if corrections.has_backsight() {
		out.push_str(&format!(
			" CORRECTIONS2: {} {}",
			value(corrections.backsight_azimuth.map(|a| a.get(AngleUnit::Degrees))),
			value(corrections.backsight_inclination.map(|i| i.file_value()))
		));
	}

	out
}

fn column_headers(format: &TripFormat) -> String {
	let mut out = String::from("FROM         TO           ");

	for item in format.frontsight_order {
		out.push_str(match item {
			FrontsightItem::Distance => "LEN     ",
			FrontsightItem::Azimuth => "BEAR    ",
			FrontsightItem::Inclination => "INC     ",
		});
	}
	for item in format.lrud_order {
		out.push_str(match item {
			LrudItem::Left => "LEFT    ",
			LrudItem::Right => "RIGHT   ",
			LrudItem::Up => "UP      ",
			LrudItem::Down => "DOWN    ",
		});
	}
	for item in format.backsight_order.iter().flatten() {
		out.push_str(match item {
			BacksightItem::Azimuth => "AZM2    ",
			BacksightItem::Inclination => "INC2    ",
		});
	}
	out.push_str("FLAGS COMMENTS");

	out
}

/// One shot line, columns in the order `format` declares.
pub fn format_shot(format: &TripFormat, shot: &Shot) -> Result<String, FormatError> {
	validate_station_name(&shot.from)?;
	validate_station_name(&shot.to)?;
	if !shot.distance.is_finite() {
		return Err(FormatError::InvalidDistance);
	}

	let mut out = String::new();
	out.push_str(&cell(&shot.from, STATION_WIDTH));
	out.push_str(&cell(&shot.to, STATION_WIDTH));

	for item in format.frontsight_order {
		out.push_str(&number_cell(match item {
			FrontsightItem::Distance => Some(shot.distance.get(LengthUnit::Feet)),
			FrontsightItem::Azimuth => shot.frontsight_azimuth.map(|a| a.get(AngleUnit::Degrees)),
			FrontsightItem::Inclination => shot.frontsight_inclination.map(|i| i.file_value()),
		}));
	}
	for item in format.lrud_order {
		let value = match item {
			LrudItem::Left => shot.left,
			LrudItem::Right => shot.right,
			LrudItem::Up => shot.up,
			LrudItem::Down => shot.down,
		};
		out.push_str(&number_cell(value.map(|v| v.get(LengthUnit::Feet))));
	}
	for item in format.backsight_order.iter().flatten() {
		out.push_str(&number_cell(match item {
			BacksightItem::Azimuth => shot.backsight_azimuth.map(|a| a.get(AngleUnit::Degrees)),
			BacksightItem::Inclination => shot.backsight_inclination.map(|i| i.file_value()),
		}));
	}

	if !shot.flags.is_empty() {
		out.push_str(" #|");
		for (flag, c) in ShotFlags::CHARS {
			if shot.flags.contains(flag) {
				out.push(c);
			}
		}
		out.push('#');
	}

	if let Some(comment) = &shot.comment {
		let comment = single_line(comment);
		let comment = truncate(comment.trim(), MAX_SHOT_COMMENT_LENGTH);
		if !comment.is_empty() {
			out.push(' ');
			out.push_str(comment);
		}
	}

	out.push_str("\r\n");

	Ok(out)
}

// Text too wide for the cell keeps its first `width - 1` characters
fn cell(text: &str, width: usize) -> String {
	let text = if text.chars().count() >= width {
		truncate(text, width - 1)
	} else {
		text
	};

	format!("{:>width$}", text, width = width)
}

fn number_cell(value: Option<f64>) -> String {
	match value.filter(|value| value.is_finite()) {
		Some(value) => cell(&fixed(value), NUMBER_WIDTH),
		None => cell(MISSING_VALUE, NUMBER_WIDTH),
	}
}

fn fixed(value: f64) -> String {
	// adding zero turns -0.0 into 0.0
	format!("{:.2}", value + 0.0)
}

fn truncate(text: &str, max: usize) -> &str {
	match text.char_indices().nth(max) {
		Some((index, _)) => &text[..index],
		None => text,
	}
}

fn single_line(text: &str) -> String {
	text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod test {
	use chrono::NaiveDate;

	use super::*;
	use crate::{
		Angle, AzimuthUnit, DistanceUnit, Inclination, InclinationUnit, Length, LrudAssociation,
	};

	fn header(name: &str, date: NaiveDate, format: TripFormat) -> TripHeader {
		TripHeader {
			cave: "SECRET CAVE".to_string(),
			name: name.to_string(),
			date,
			comment: None,
			team: None,
			declination: Angle::degrees(1.0),
			format,
			corrections: Corrections::default(),
		}
	}

	fn date(year: i32, month: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(year, month, day).unwrap()
	}

	fn lud_format() -> TripFormat {
		TripFormat {
			lrud_order: [LrudItem::Left, LrudItem::Up, LrudItem::Down, LrudItem::Right],
			frontsight_order: [
				FrontsightItem::Azimuth,
				FrontsightItem::Inclination,
				FrontsightItem::Distance,
			],
			..TripFormat::default()
		}
	}

	#[test]
	fn test_format_shot() {
		let mut shot = Shot::new("foo", "bar", Length::meters(1.0));
		shot.frontsight_azimuth = Some(Angle::gradians(50.0));
		shot.frontsight_inclination = Some(Inclination::Angle(Angle::degrees(-10.0)));
		shot.left = Some(Length::feet(1.0));
		shot.up = Some(Length::feet(2.0));

		assert_eq!(
			format_shot(&lud_format(), &shot).unwrap(),
			"          foo          bar   45.00  -10.00    3.28    1.00    2.00 -999.00 -999.00\r\n"
		);
	}

	#[test]
	fn test_format_shot_flags_and_comment() {
		let mut shot = Shot::new("A1", "A2", Length::feet(5.0));
		shot.flags = ShotFlags::DO_NOT_ADJUST | ShotFlags::EXCLUDE_DISTANCE;
		shot.comment = Some("  first line\r\nsecond  ".to_string());

		assert_eq!(
			format_shot(&TripFormat::default(), &shot).unwrap(),
			"           A1           A2    5.00 -999.00 -999.00 -999.00 -999.00 -999.00 -999.00 #|LC# first line second\r\n"
		);
	}

	#[test]
	fn test_format_shot_long_comment() {
		let mut shot = Shot::new("A1", "A2", Length::feet(5.0));
		shot.comment = Some("x".repeat(100));

		let line = format_shot(&TripFormat::default(), &shot).unwrap();
		assert!(line.ends_with(&format!(" {}\r\n", "x".repeat(80))));
	}

	#[test]
	fn test_format_shot_wide_number() {
		let shot = Shot::new("A1", "A2", Length::feet(123456.0));

		let line = format_shot(&TripFormat::default(), &shot).unwrap();
		assert!(line.starts_with("           A1           A2 123456. -999.00"));
	}

	#[test]
	fn test_format_shot_errors() {
		let format = TripFormat::default();

		let shot = Shot::new("A 1", "A2", Length::feet(5.0));
		let error = format_shot(&format, &shot).expect_err("expected `FormatError`");
		assert_eq!(error, FormatError::InvalidStationName("A 1".to_string()));

		let shot = Shot::new("A1", "A2", Length::feet(f64::NAN));
		let error = format_shot(&format, &shot).expect_err("expected `FormatError`");
		assert_eq!(error, FormatError::InvalidDistance);
		assert_eq!(error.to_string(), "distance is required");
	}

	#[test]
	fn test_format_minimum_header() {
		let header = header("A", date(1979, 7, 10), lud_format());

		assert_eq!(
			format_trip_header(&header),
			"SECRET CAVE\r
SURVEY NAME: A\r
SURVEY DATE: 7 10 1979\r
SURVEY TEAM:\r
\r
DECLINATION: 1.00  FORMAT: DDDDLUDRADL\r
\r
FROM         TO           BEAR    INC     LEN     LEFT    UP      DOWN    RIGHT   FLAGS COMMENTS\r
\r
"
		);
	}

	#[test]
	fn test_format_maximum_header() {
		let format = TripFormat {
			azimuth_unit: AzimuthUnit::Quads,
			distance_unit: DistanceUnit::FeetAndInches,
			lrud_unit: DistanceUnit::Meters,
			inclination_unit: InclinationUnit::PercentGrade,
			backsight_order: Some([BacksightItem::Azimuth, BacksightItem::Inclination]),
			has_redundant_backsights: Some(true),
			lrud_association: Some(LrudAssociation::ToStation),
			..lud_format()
		};
		let mut header = header("A", date(1979, 7, 10), format);
		header.comment = Some("TEST".to_string());
		header.team = Some("Dude".to_string());
		header.corrections = Corrections {
			distance: Some(Length::feet(2.0)),
			frontsight_azimuth: Some(Angle::degrees(3.0)),
			frontsight_inclination: Some(Inclination::Angle(Angle::degrees(4.0))),
			backsight_azimuth: Some(Angle::degrees(5.0)),
			backsight_inclination: Some(Inclination::Angle(Angle::degrees(6.0))),
		};

		assert_eq!(
			format_trip_header(&header),
			"SECRET CAVE\r
SURVEY NAME: A\r
SURVEY DATE: 7 10 1979  COMMENT: TEST\r
SURVEY TEAM:\r
Dude\r
DECLINATION: 1.00  FORMAT: QIMGLUDRADLadBT  CORRECTIONS: 3.00 4.00 2.00 CORRECTIONS2: 5.00 6.00\r
\r
FROM         TO           BEAR    INC     LEN     LEFT    UP      DOWN    RIGHT   AZM2    INC2    FLAGS COMMENTS\r
\r
"
		);
	}

	#[test]
	fn test_format_header_truncation() {
		let mut header = header("ABCDEFGHIJKLMNOP", date(2000, 1, 2), TripFormat::default());
		header.cave = "C".repeat(90);
		header.team = Some("T".repeat(120));
		header.corrections.distance = Some(Length::feet(-1.5));

		let text = format_trip_header(&header);
		let lines: Vec<&str> = text.split("\r\n").collect();
		assert_eq!(lines[0], "C".repeat(80));
		assert_eq!(lines[1], "SURVEY NAME: ABCDEFGHIJKL");
		assert_eq!(lines[2], "SURVEY DATE: 1 2 2000");
		assert_eq!(lines[4], "T".repeat(100));
		assert_eq!(
			lines[5],
			"DECLINATION: 1.00  FORMAT: DDDDLRUDLAD  CORRECTIONS: 0.00 0.00 -1.50"
		);
	}

	#[test]
	fn test_format_dat_file() {
		let format = TripFormat {
			backsight_order: Some([BacksightItem::Azimuth, BacksightItem::Inclination]),
			has_redundant_backsights: Some(true),
			..lud_format()
		};

		let mut a1 = Shot::new("A1", "A2", Length::meters(1.0));
		a1.frontsight_azimuth = Some(Angle::gradians(50.0));
		a1.frontsight_inclination = Some(Angle::degrees(-10.0).into());
		a1.backsight_azimuth = Some(Angle::degrees(30.0));
		a1.backsight_inclination = Some(Angle::degrees(-8.0).into());
		a1.left = Some(Length::feet(1.0));
		a1.up = Some(Length::feet(2.0));

		let mut a2 = Shot::new("A2", "A3", Length::feet(5.0));
		a2.frontsight_azimuth = Some(Angle::degrees(20.0));
		a2.frontsight_inclination = Some(Angle::degrees(-10.0).into());
		a2.backsight_azimuth = Some(Angle::degrees(22.0));
		a2.backsight_inclination = Some(Angle::degrees(-8.0).into());
		a2.right = Some(Length::feet(1.0));
		a2.up = Some(Length::feet(2.0));

		let mut a3 = Shot::new("A3", "A4", Length::meters(1.0));
		a3.frontsight_azimuth = Some(Angle::gradians(50.0));
		a3.frontsight_inclination = Some(Angle::degrees(-10.0).into());
		a3.backsight_azimuth = Some(Angle::degrees(30.0));
		a3.backsight_inclination = Some(Angle::degrees(-8.0).into());
		a3.down = Some(Length::feet(1.0));
		a3.right = Some(Length::feet(2.0));

		let mut a4 = Shot::new("A4", "A5", Length::feet(5.0));
		a4.frontsight_azimuth = Some(Angle::degrees(20.0));
		a4.frontsight_inclination = Some(Angle::degrees(-10.0).into());
		a4.backsight_azimuth = Some(Angle::degrees(22.0));
		a4.backsight_inclination = Some(Angle::degrees(-8.0).into());
		a4.down = Some(Length::feet(1.0));
		a4.up = Some(Length::feet(2.0));
		a4.flags = ShotFlags::EXCLUDE_DISTANCE;
		a4.comment = Some("test".to_string());

		let mut second = header("A3-5", date(1989, 8, 3), format.clone());
		second.team = Some("Dudes".to_string());

		let file = DatFile {
			trips: vec![
				Trip {
					header: header("A1-3", date(1979, 7, 10), format),
					shots: vec![a1, a2],
				},
				Trip {
					header: second,
					shots: vec![a3, a4],
				},
			],
		};

		let expected = "SECRET CAVE
SURVEY NAME: A1-3
SURVEY DATE: 7 10 1979
SURVEY TEAM:

DECLINATION: 1.00  FORMAT: DDDDLUDRADLadBF

FROM         TO           BEAR    INC     LEN     LEFT    UP      DOWN    RIGHT   AZM2    INC2    FLAGS COMMENTS

           A1           A2   45.00  -10.00    3.28    1.00    2.00 -999.00 -999.00   30.00   -8.00
           A2           A3   20.00  -10.00    5.00 -999.00    2.00 -999.00    1.00   22.00   -8.00
\x0c
SECRET CAVE
SURVEY NAME: A3-5
SURVEY DATE: 8 3 1989
SURVEY TEAM:
Dudes
DECLINATION: 1.00  FORMAT: DDDDLUDRADLadBF

FROM         TO           BEAR    INC     LEN     LEFT    UP      DOWN    RIGHT   AZM2    INC2    FLAGS COMMENTS

           A3           A4   45.00  -10.00    3.28 -999.00 -999.00    1.00    2.00   30.00   -8.00
           A4           A5   20.00  -10.00    5.00 -999.00    2.00    1.00 -999.00   22.00   -8.00 #|L# test
\x0c
"
		.replace('\n', "\r\n");

		assert_eq!(format_dat_file(&file).unwrap(), expected);
	}
}
