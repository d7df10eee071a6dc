use super::{BaseLocation, DatFileDirective, Directive, FileParameters, LinkStation, MakFile};
use crate::{error::FormatError, station::validate_station_name, AngleUnit, LengthUnit, LrudAssociation};

const MIN_UTM_ZONE: u8 = 1;
const MAX_UTM_ZONE: u8 = 60;

/// Formats every directive of `file` in order.
pub fn format_mak_file(file: &MakFile) -> Result<String, FormatError> {
	let mut out = String::new();
	for directive in &file.directives {
		out.push_str(&format_directive(directive)?);
	}

	Ok(out)
}

/// A single directive, including its terminating line break.
pub fn format_directive(directive: &Directive) -> Result<String, FormatError> {
	let tag = directive.tag();
	let body = match directive {
		Directive::BaseLocation(location) => format!("{};", format_base_location(location)?),
		Directive::DatFile(dat_file) => format!("{};", format_dat_file(dat_file)?),
		Directive::Datum(datum) => format!("{};", format_datum(datum)?),
		Directive::UtmConvergenceAngle(angle) => {
			format!("{};", fixed(angle.get(AngleUnit::Degrees)))
		}
		Directive::UtmZone(zone) => format!("{};", utm_zone(*zone)?),
		Directive::FileParameters(parameters) => format!("{};", format_file_parameters(parameters)),
		Directive::Comment(comment) => single_line(comment),
	};

	Ok(format!("{}{}\r\n", tag, body))
}

fn format_base_location(location: &BaseLocation) -> Result<String, FormatError> {
	Ok(format!(
		"{},{},{},{},{}",
		fixed(location.easting.get(LengthUnit::Meters)),
		fixed(location.northing.get(LengthUnit::Meters)),
		fixed(location.elevation.get(LengthUnit::Meters)),
		utm_zone(location.utm_zone)?,
		fixed(location.convergence_angle.get(AngleUnit::Degrees)),
	))
}

// One link station stays on the directive's line, more go one per line
fn format_dat_file(dat_file: &DatFileDirective) -> Result<String, FormatError> {
	let stations = dat_file
		.link_stations
		.iter()
		.map(format_link_station)
		.collect::<Result<Vec<_>, _>>()?;

	let file = &dat_file.file;
	if file.trim().is_empty() || file.contains([',', ';', '\r', '\n']) {
		return Err(invalid_text("file name", file));
	}

	Ok(match stations.as_slice() {
		[] => file.clone(),
		[station] => format!("{},{}", file, station),
		_ => format!("{},\r\n  {}", file, stations.join(",\r\n  ")),
	})
}

fn format_datum(datum: &str) -> Result<String, FormatError> {
	let text = single_line(datum);
	if text.trim().is_empty() || text.contains(';') {
		return Err(invalid_text("datum", datum));
	}

	Ok(text)
}

/// A link station name, with its fixed location in brackets if it has one.
/// The location is written in the unit of its easting.
pub fn format_link_station(station: &LinkStation) -> Result<String, FormatError> {
	validate_station_name(&station.station)?;

	let location = match &station.location {
		Some(location) => location,
		None => return Ok(station.station.clone()),
	};
	let unit = location.easting.unit();
	let unit_char = match unit {
		LengthUnit::Feet => 'F',
		LengthUnit::Meters => 'M',
	};

	Ok(format!(
		"{}[{},{},{},{}]",
		station.station,
		unit_char,
		fixed(location.easting.get(unit)),
		fixed(location.northing.get(unit)),
		fixed(location.elevation.get(unit)),
	))
}

fn format_file_parameters(parameters: &FileParameters) -> String {
	let overrides = if parameters.override_lrud_associations { 'O' } else { 'o' };
	let association = match parameters.lrud_association {
		LrudAssociation::FromStation => 't',
		LrudAssociation::ToStation => 'T',
	};

	format!("{}{}", overrides, association)
}

fn utm_zone(zone: u8) -> Result<u8, FormatError> {
	if (MIN_UTM_ZONE..=MAX_UTM_ZONE).contains(&zone) {
		Ok(zone)
	} else {
		Err(FormatError::InvalidUtmZone(zone))
	}
}

fn invalid_text(field: &'static str, text: &str) -> FormatError {
	FormatError::InvalidText {
		field,
		text: text.to_string(),
	}
}

fn single_line(text: &str) -> String {
	text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

fn fixed(value: f64) -> String {
	format!("{:.3}", value + 0.0)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		mak::{parse_mak_file, Location},
		Angle, Length,
	};

	#[test]
	fn test_format_mak_file() {
		let file = MakFile {
			directives: vec![
				Directive::base_location(
					Length::feet(100.0),
					Length::meters(200.0),
					Length::meters(300.0),
					13,
					Angle::gradians(50.0),
				),
				Directive::datum("WGS 1984"),
				Directive::utm_convergence_angle(Angle::degrees(2.0)),
				Directive::utm_zone(14),
				Directive::file_parameters(true, LrudAssociation::FromStation),
				Directive::file_parameters(false, LrudAssociation::ToStation),
				Directive::dat_file("Foo.dat", vec![]),
				Directive::dat_file("Bar.dat", vec![LinkStation::new("A1")]),
				Directive::dat_file(
					"Baz.dat",
					vec![
						LinkStation::new("A1"),
						LinkStation::fixed(
							"A2",
							Location {
								easting: Length::feet(23.0),
								northing: Length::feet(83.0),
								elevation: Length::feet(2.0),
							},
						),
						LinkStation::fixed(
							"A3",
							Location {
								easting: Length::meters(23.0),
								northing: Length::feet(83.0),
								elevation: Length::feet(2.0),
							},
						),
					],
				),
				Directive::comment(" blah blah"),
			],
		};

		let expected = [
			"@30.480,200.000,300.000,13,45.000;",
			"&WGS 1984;",
			"%2.000;",
			"$14;",
			"!Ot;",
			"!oT;",
			"#Foo.dat;",
			"#Bar.dat,A1;",
			"#Baz.dat,",
			"  A1,",
			"  A2[F,23.000,83.000,2.000],",
			"  A3[M,23.000,25.298,0.610];",
			"/ blah blah",
			"",
		]
		.join("\r\n");

		assert_eq!(format_mak_file(&file).unwrap(), expected);
	}

	#[test]
	fn test_format_errors() {
		let error = format_directive(&Directive::dat_file("foo.dat", vec![LinkStation::new("A 1")]))
			.expect_err("expected `FormatError`");
		assert_eq!(error, FormatError::InvalidStationName("A 1".to_string()));

		let error = format_directive(&Directive::utm_zone(61)).expect_err("expected `FormatError`");
		assert_eq!(error.to_string(), "invalid UTM zone: 61");
	}

	#[test]
	fn test_format_text_that_would_not_read_back() {
		let error = format_directive(&Directive::datum("WGS; 1984")).expect_err("expected `FormatError`");
		assert_eq!(
			error,
			FormatError::InvalidText {
				field: "datum",
				text: "WGS; 1984".to_string()
			}
		);
		assert_eq!(error.to_string(), "invalid datum: \"WGS; 1984\"");

		let error = format_directive(&Directive::datum(" ")).expect_err("expected `FormatError`");
		assert!(matches!(error, FormatError::InvalidText { field: "datum", .. }));

		for file in ["", "a,b.dat", "a;b.dat", "a\r\nb.dat"] {
			let error = format_directive(&Directive::dat_file(file, vec![]))
				.expect_err("expected `FormatError`");
			assert!(matches!(error, FormatError::InvalidText { field: "file name", .. }));
		}

		let comment = Directive::comment(" first\r\nsecond\nthird");
		let formatted = format_directive(&comment).unwrap();
		assert_eq!(formatted, "/ first second third\r\n");

		let datum = Directive::datum("WGS\r\n1984");
		let formatted = format_directive(&datum).unwrap();
		assert_eq!(formatted, "&WGS 1984;\r\n");
		assert_eq!(
			parse_mak_file(&format!("{}{}", formatted, format_directive(&comment).unwrap()))
				.unwrap()
				.directives,
			vec![Directive::datum("WGS 1984"), Directive::comment(" first second third")]
		);
	}

	#[test]
	fn test_format_negative_zero() {
		let directive = Directive::utm_convergence_angle(Angle::degrees(-0.0));
		assert_eq!(format_directive(&directive).unwrap(), "%0.000;\r\n");
	}
}
