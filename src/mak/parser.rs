use nom::{bytes::complete::take_till, character::complete::anychar};
use tracing::debug;

use super::{BaseLocation, DatFileDirective, Directive, FileParameters, LinkStation, Location, MakFile};
use crate::{
	error::{ErrorKind, ParseError},
	station::is_valid_station_name,
	syntax::{at, failure, locate, multi_ws, number, peek_token, PResult},
	Angle, Length, LengthUnit, LrudAssociation,
};

const SUBSTITUTE: char = '\x1a';

const MIN_UTM_ZONE: u8 = 1;
const MAX_UTM_ZONE: u8 = 60;
const MAX_CONVERGENCE_ANGLE: f64 = 45.0;

pub fn parse_mak_file(input: &str) -> Result<MakFile, ParseError> {
	let directives = locate(parse_directives(input), input, 1)?;
	debug!(directives = directives.len(), "parsed mak file");

	Ok(MakFile { directives })
}

// MakFile = {
//   Directive[] directives  // whitespace between, ends at end of input or SUB
// }
fn parse_directives(mut input: &str) -> PResult<Vec<Directive>> {
	let mut directives = Vec::new();

	loop {
		let (rest, _) = multi_ws(input)?;
		input = rest;

		if input.is_empty() || input.starts_with(SUBSTITUTE) {
			break;
		}
		if let Some(rest) = input.strip_prefix(';') {
			input = rest;
			continue;
		}

		let (rest, directive) = parse_directive(input)?;
		directives.push(directive);
		input = rest;
	}

	Ok((input, directives))
}

fn parse_directive(input: &str) -> PResult<Directive> {
	let result: PResult<char> = anychar(input);
	let (rest, tag) = result?;

	match tag {
		Directive::BASE_LOCATION => {
			let (rest, location) = parse_base_location(rest)?;
			Ok((rest, Directive::BaseLocation(location)))
		}
		Directive::DAT_FILE => {
			let (rest, dat_file) = parse_dat_file(rest)?;
			Ok((rest, Directive::DatFile(dat_file)))
		}
		Directive::DATUM => parse_datum(rest),
		Directive::UTM_CONVERGENCE_ANGLE => {
			let (rest, payload) = parse_payload(rest)?;
			let (_, angle) = parse_convergence_angle(payload.trim(), payload)?;
			Ok((rest, Directive::UtmConvergenceAngle(angle)))
		}
		Directive::UTM_ZONE => {
			let (rest, payload) = parse_payload(rest)?;
			let (_, zone) = parse_utm_zone(payload.trim(), payload)?;
			Ok((rest, Directive::UtmZone(zone)))
		}
		Directive::FILE_PARAMETERS => {
			let (rest, parameters) = parse_file_parameters(rest)?;
			Ok((rest, Directive::FileParameters(parameters)))
		}
		Directive::COMMENT => {
			let result: PResult<&str> = take_till(|c: char| c == '\r' || c == '\n')(rest);
			let (rest, comment) = result?;
			Ok((rest, Directive::Comment(comment.to_string())))
		}
		_ => Err(failure(&input[..tag.len_utf8()], ErrorKind::InvalidDirective)),
	}
}

// Everything up to the `;` ending a directive, which is consumed
fn parse_payload(input: &str) -> PResult<&str> {
	match input.find(';') {
		Some(index) => Ok((&input[index + 1..], &input[..index])),
		None => Err(failure(&input[input.len()..], ErrorKind::MissingSemicolon)),
	}
}

// BaseLocation = {
//   Number easting      // meters
//   ',' Number northing // meters
//   ',' Number elevation  // meters
//   ',' Number zone     // 1..60
//   ',' Number convergence  // degrees, -45..45
//   ';'
// }
fn parse_base_location(input: &str) -> PResult<BaseLocation> {
	let (input, payload) = parse_payload(input)?;
	let fields: Vec<&str> = payload.split(',').map(str::trim).collect();

	if let Some(excess) = fields.get(5) {
		return Err(failure(excess, ErrorKind::ExcessField));
	}

	let field = |index: usize, name: &'static str| match fields.get(index) {
		Some(field) if !field.is_empty() => Ok(*field),
		_ => Err(failure(&payload[payload.len()..], ErrorKind::Missing(name))),
	};
	let meters = |index: usize, name: &'static str| {
		let text = field(index, name)?;
		number(text)
			.map(Length::meters)
			.ok_or_else(|| failure(text, ErrorKind::Invalid(name)))
	};

	let easting = meters(0, "easting")?;
	let northing = meters(1, "northing")?;
	let elevation = meters(2, "elevation")?;
	let (_, utm_zone) = parse_utm_zone(field(3, "UTM zone")?, payload)?;
	let (_, convergence_angle) =
		parse_convergence_angle(field(4, "convergence angle")?, payload)?;

	let location = BaseLocation {
		easting,
		northing,
		elevation,
		utm_zone,
		convergence_angle,
	};

	Ok((input, location))
}

// `text` is trimmed; `payload` is what it was trimmed from
fn parse_utm_zone<'a>(text: &'a str, payload: &'a str) -> PResult<'a, u8> {
	if text.is_empty() {
		return Err(failure(&payload[payload.len()..], ErrorKind::Missing("UTM zone")));
	}

	// integral values such as `13.0` are accepted
	let zone = number(text)
		.filter(|zone| zone.fract() == 0.0)
		.filter(|zone| (f64::from(MIN_UTM_ZONE)..=f64::from(MAX_UTM_ZONE)).contains(zone))
		.ok_or_else(|| failure(text, ErrorKind::Invalid("UTM zone")))?;

	Ok((text, zone as u8))
}

fn parse_convergence_angle<'a>(text: &'a str, payload: &'a str) -> PResult<'a, Angle> {
	if text.is_empty() {
		return Err(failure(
			&payload[payload.len()..],
			ErrorKind::Missing("convergence angle"),
		));
	}

	let degrees = number(text)
		.filter(|degrees| degrees.abs() <= MAX_CONVERGENCE_ANGLE)
		.ok_or_else(|| failure(text, ErrorKind::Invalid("convergence angle")))?;

	Ok((text, Angle::degrees(degrees)))
}

// Datum = { String datum ';' }
fn parse_datum(input: &str) -> PResult<Directive> {
	let (input, payload) = parse_payload(input)?;
	let datum = payload.trim();
	if datum.is_empty() {
		return Err(failure(&payload[payload.len()..], ErrorKind::Missing("datum")));
	}

	Ok((input, Directive::Datum(datum.to_string())))
}

// FileParameters = {
//   Char[] flags  // O/o overrides LRUD associations or not, T/t to or from station
//   ';'
// }
fn parse_file_parameters(input: &str) -> PResult<FileParameters> {
	let (input, payload) = parse_payload(input)?;
	let mut parameters = FileParameters::default();

	for (index, c) in payload.char_indices() {
		match c {
			'O' => parameters.override_lrud_associations = true,
			'o' => parameters.override_lrud_associations = false,
			'T' => parameters.lrud_association = LrudAssociation::ToStation,
			't' => parameters.lrud_association = LrudAssociation::FromStation,
			c if c.is_whitespace() => {}
			_ => {
				let span = &payload[index..index + c.len_utf8()];
				return Err(failure(span, ErrorKind::Invalid("character")));
			}
		}
	}

	Ok((input, parameters))
}

// DatFile = {
//   String file
//   LinkStation[] stations  // each preceded by ','
//   ';'
// }
fn parse_dat_file(input: &str) -> PResult<DatFileDirective> {
	let (input, payload) = parse_payload(input)?;

	let (file, mut stations) = match payload.find(',') {
		Some(index) => (&payload[..index], &payload[index..]),
		None => (payload, &payload[payload.len()..]),
	};
	let file = file.trim();
	if file.is_empty() {
		return Err(failure(file, ErrorKind::Missing("file name")));
	}

	let mut link_stations = Vec::new();
	while let Some(rest) = stations.strip_prefix(',') {
		let (rest, station) = parse_link_station(rest)?;
		link_stations.push(station);
		stations = rest;
	}

	let directive = DatFileDirective {
		file: file.to_string(),
		link_stations,
		data: None,
	};

	Ok((input, directive))
}

// LinkStation = {
//   String station
//   optional '[' {
//     Char unit  // F or M
//     ',' Number easting
//     ',' Number northing
//     ',' Number elevation
//   } ']'
// }
fn parse_link_station(input: &str) -> PResult<LinkStation> {
	let (input, _) = multi_ws(input)?;
	let result: PResult<&str> =
		take_till(|c: char| c == ',' || c == '[' || c.is_whitespace())(input);
	let (input, station) = result?;

	if station.is_empty() {
		return Err(failure(at(input), ErrorKind::Missing("station")));
	}
	if !is_valid_station_name(station) {
		return Err(failure(station, ErrorKind::Invalid("station")));
	}

	let (input, _) = multi_ws(input)?;
	let (input, location) = match input.strip_prefix('[') {
		Some(rest) => {
			let (rest, location) = parse_location(rest)?;
			(rest, Some(location))
		}
		None => (input, None),
	};

	let (input, _) = multi_ws(input)?;
	if !input.is_empty() && !input.starts_with(',') {
		return Err(failure(peek_token(input), ErrorKind::Expected(",")));
	}

	let station = LinkStation {
		station: station.to_string(),
		location,
	};

	Ok((input, station))
}

fn parse_location(input: &str) -> PResult<Location> {
	let (body, input) = match input.find(']') {
		Some(index) => (&input[..index], &input[index + 1..]),
		None => return Err(failure(&input[input.len()..], ErrorKind::MissingClosingBracket)),
	};
	let fields: Vec<&str> = body.split(',').map(str::trim).collect();

	let field = |index: usize, name: &'static str| match fields.get(index) {
		Some(field) if !field.is_empty() => Ok(*field),
		_ => Err(failure(&body[body.len()..], ErrorKind::Missing(name))),
	};

	let unit_text = field(0, "length unit")?;
	let unit = match unit_text {
		"F" | "f" => LengthUnit::Feet,
		"M" | "m" => LengthUnit::Meters,
		_ => return Err(failure(unit_text, ErrorKind::Invalid("length unit"))),
	};

	let length = |index: usize, name: &'static str| {
		let text = field(index, name)?;
		number(text)
			.map(|value| Length::new(value, unit))
			.ok_or_else(|| failure(text, ErrorKind::Invalid(name)))
	};

	let location = Location {
		easting: length(1, "easting")?,
		northing: length(2, "northing")?,
		elevation: length(3, "elevation")?,
	};

	if let Some(excess) = fields.get(4) {
		return Err(failure(excess, ErrorKind::Expected("]")));
	}

	Ok((input, location))
}

#[cfg(test)]
mod test {
	use super::*;

	fn parse_error(input: &str) -> ParseError {
		parse_mak_file(input).expect_err("expected `ParseError`")
	}

	fn parse_one(input: &str) -> Directive {
		let mut file = parse_mak_file(input).unwrap();
		assert_eq!(file.directives.len(), 1);
		file.directives.remove(0)
	}

	#[test]
	fn test_parse_base_location() {
		assert_eq!(
			parse_one("@2.34,-5.36, 8.5 ,16, 2.30;"),
			Directive::base_location(
				Length::meters(2.34),
				Length::meters(-5.36),
				Length::meters(8.5),
				16,
				Angle::degrees(2.3)
			)
		);
	}

	#[test]
	fn test_parse_base_location_errors() {
		assert_eq!(parse_error("@2.34").kind, ErrorKind::MissingSemicolon);
		assert_eq!(parse_error("@;").kind, ErrorKind::Missing("easting"));
		assert_eq!(parse_error("@2.a34,-5.36,8.5,16,2.34;").kind, ErrorKind::Invalid("easting"));
		assert_eq!(parse_error("@2.34;").kind, ErrorKind::Missing("northing"));
		assert_eq!(parse_error("@2.34,-5a.36,8.5,16,2.34;").kind, ErrorKind::Invalid("northing"));
		assert_eq!(parse_error("@2.34,3.45;").kind, ErrorKind::Missing("elevation"));
		assert_eq!(parse_error("@2.34,-5.36,q,16,2.34;").kind, ErrorKind::Invalid("elevation"));
		assert_eq!(parse_error("@2.34,-5.36,3.4;").kind, ErrorKind::Missing("UTM zone"));
		assert_eq!(parse_error("@2.34,-5.36, 8.5 ,16;").kind, ErrorKind::Missing("convergence angle"));
		assert_eq!(
			parse_error("@2.34,-5.36, 8.5 ,16, 90;").kind,
			ErrorKind::Invalid("convergence angle")
		);

		for zone in ["0", "61", "32.5", "60N"] {
			let input = format!("@2.34,-5.36,3.4,{},2.34;", zone);
			let error = parse_error(&input);
			assert_eq!(error.kind, ErrorKind::Invalid("UTM zone"));
			assert_eq!(error.text, zone);
		}

		let error = parse_error("@2.34,-5.36, 8.5 ,16,2.34,;");
		assert_eq!(error.kind, ErrorKind::ExcessField);
		assert_eq!(error.to_string(), "excess field after convergence angle at line 1, column 27");
	}

	#[test]
	fn test_parse_dat_file() {
		assert_eq!(
			parse_one("#foo.dat,A1,A2[M,2,3,4],A3[F,5,6,7];"),
			Directive::dat_file(
				"foo.dat",
				vec![
					LinkStation::new("A1"),
					LinkStation::fixed(
						"A2",
						Location {
							easting: Length::meters(2.0),
							northing: Length::meters(3.0),
							elevation: Length::meters(4.0),
						}
					),
					LinkStation::fixed(
						"A3",
						Location {
							easting: Length::feet(5.0),
							northing: Length::feet(6.0),
							elevation: Length::feet(7.0),
						}
					),
				]
			)
		);

		assert_eq!(parse_one("#Foo.dat;"), Directive::dat_file("Foo.dat", vec![]));
	}

	#[test]
	fn test_parse_dat_file_errors() {
		for input in ["#foo.dat,;", "#foo.dat,A1,;", "#foo.dat,A1,A2,;", "#foo.dat,A1[F,1,2,3],;"] {
			assert_eq!(parse_error(input).kind, ErrorKind::Missing("station"));
		}

		assert_eq!(parse_error("#foo.dat,A1[F,1,2,3;").kind, ErrorKind::MissingClosingBracket);
		assert_eq!(parse_error("#foo.dat").kind, ErrorKind::MissingSemicolon);
		assert_eq!(parse_error("#foo.dat,A1[Q,1,2,3];").kind, ErrorKind::Invalid("length unit"));
		assert_eq!(parse_error("#foo.dat,A1[F,1,2];").kind, ErrorKind::Missing("elevation"));
		assert_eq!(parse_error("#foo.dat,A1[F,1,2,3] A2;").kind, ErrorKind::Expected(","));
	}

	#[test]
	fn test_parse_small_directives() {
		assert_eq!(parse_one("& WGS 1984 ;"), Directive::datum("WGS 1984"));
		assert_eq!(parse_one("$13;"), Directive::utm_zone(13));
		assert_eq!(parse_one("$13.0;"), Directive::utm_zone(13));
		assert_eq!(parse_one("$ 60 ;"), Directive::utm_zone(60));
		assert_eq!(
			parse_one("@1,2,3,16.0,0;"),
			Directive::base_location(
				Length::meters(1.0),
				Length::meters(2.0),
				Length::meters(3.0),
				16,
				Angle::degrees(0.0)
			)
		);
		assert_eq!(parse_one("%-2.5;"), Directive::utm_convergence_angle(Angle::degrees(-2.5)));
		assert_eq!(parse_one("/ blah blah blah"), Directive::comment(" blah blah blah"));

		assert_eq!(
			parse_one("!ot;"),
			Directive::file_parameters(false, LrudAssociation::FromStation)
		);
		assert_eq!(parse_one("!Ot;"), Directive::file_parameters(true, LrudAssociation::FromStation));
		assert_eq!(parse_one("!OT;"), Directive::file_parameters(true, LrudAssociation::ToStation));
		assert_eq!(parse_one("!OtoT;"), Directive::file_parameters(false, LrudAssociation::ToStation));
	}

	#[test]
	fn test_parse_small_directive_errors() {
		assert_eq!(parse_error("&WGS 1984").kind, ErrorKind::MissingSemicolon);
		assert_eq!(parse_error("& ;").kind, ErrorKind::Missing("datum"));
		assert_eq!(parse_error("!f;").kind, ErrorKind::Invalid("character"));
		assert_eq!(parse_error("!OT").kind, ErrorKind::MissingSemicolon);
		assert_eq!(parse_error("$3").kind, ErrorKind::MissingSemicolon);
		for zone in ["0", "61", "15.2", "a", "32a"] {
			assert_eq!(
				parse_error(&format!("${};", zone)).kind,
				ErrorKind::Invalid("UTM zone")
			);
		}
		assert_eq!(parse_error("%46;").kind, ErrorKind::Invalid("convergence angle"));
	}

	#[test]
	fn test_parse_mak_file() {
		let input = "
    @500000.000,4000000.000,200.000,16,0.000;
    &WGS 1984;

    / blah blah blah

    !OT;
    #Fisher Ridge Cave System.dat,
      AE20[M,0.000,0.000,0.000],
      Qe2[M,-3000,2600,-57];
    ;
    \x1a";

		let file = parse_mak_file(input).unwrap();
		assert_eq!(
			file.directives,
			vec![
				Directive::base_location(
					Length::meters(500000.0),
					Length::meters(4000000.0),
					Length::meters(200.0),
					16,
					Angle::degrees(0.0)
				),
				Directive::datum("WGS 1984"),
				Directive::comment(" blah blah blah"),
				Directive::file_parameters(true, LrudAssociation::ToStation),
				Directive::dat_file(
					"Fisher Ridge Cave System.dat",
					vec![
						LinkStation::fixed(
							"AE20",
							Location {
								easting: Length::meters(0.0),
								northing: Length::meters(0.0),
								elevation: Length::meters(0.0),
							}
						),
						LinkStation::fixed(
							"Qe2",
							Location {
								easting: Length::meters(-3000.0),
								northing: Length::meters(2600.0),
								elevation: Length::meters(-57.0),
							}
						),
					]
				),
			]
		);
	}

	#[test]
	fn test_invalid_directive() {
		let input = "
    @500000.000,4000000.000,200.000,16,0.000;
    &WGS 1984;

    ^ blah blah blah
    ";

		let error = parse_error(input);
		assert_eq!(error.kind, ErrorKind::InvalidDirective);
		assert_eq!(error.text, "^");
		assert_eq!(error.line, 5);
		assert_eq!(error.column, 5);
		assert_eq!(error.to_string(), "invalid directive character at line 5, column 5");
	}
}
