//! Compass project files (`.mak`): an ordered list of single-character
//! directives naming the dat files of a project and how to georeference them.

mod formatter;
mod parser;

pub use formatter::{format_directive, format_link_station, format_mak_file};
pub use parser::parse_mak_file;

use crate::{Angle, DatFile, Length, LrudAssociation};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MakFile {
	pub directives: Vec<Directive>,
}

impl MakFile {
	/// The `#` directives, in file order.
	pub fn dat_files(&self) -> impl Iterator<Item = &DatFileDirective> {
		self.directives.iter().filter_map(|directive| match directive {
			Directive::DatFile(dat_file) => Some(dat_file),
			_ => None,
		})
	}

	pub fn dat_files_mut(&mut self) -> impl Iterator<Item = &mut DatFileDirective> {
		self.directives.iter_mut().filter_map(|directive| match directive {
			Directive::DatFile(dat_file) => Some(dat_file),
			_ => None,
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
	BaseLocation(BaseLocation),
	DatFile(DatFileDirective),
	Datum(String),
	UtmConvergenceAngle(Angle),
	UtmZone(u8),
	FileParameters(FileParameters),
	Comment(String),
}

impl Directive {
	pub const BASE_LOCATION: char = '@';
	pub const DAT_FILE: char = '#';
	pub const DATUM: char = '&';
	pub const UTM_CONVERGENCE_ANGLE: char = '%';
	pub const UTM_ZONE: char = '$';
	pub const FILE_PARAMETERS: char = '!';
	pub const COMMENT: char = '/';

	/// The character a directive starts with.
	pub fn tag(&self) -> char {
		match self {
			Directive::BaseLocation(_) => Self::BASE_LOCATION,
			Directive::DatFile(_) => Self::DAT_FILE,
			Directive::Datum(_) => Self::DATUM,
			Directive::UtmConvergenceAngle(_) => Self::UTM_CONVERGENCE_ANGLE,
			Directive::UtmZone(_) => Self::UTM_ZONE,
			Directive::FileParameters(_) => Self::FILE_PARAMETERS,
			Directive::Comment(_) => Self::COMMENT,
		}
	}

	pub fn base_location(
		easting: Length,
		northing: Length,
		elevation: Length,
		utm_zone: u8,
		convergence_angle: Angle,
	) -> Self {
		Directive::BaseLocation(BaseLocation {
			easting,
			northing,
			elevation,
			utm_zone,
			convergence_angle,
		})
	}

	pub fn dat_file(file: impl Into<String>, link_stations: Vec<LinkStation>) -> Self {
		Directive::DatFile(DatFileDirective {
			file: file.into(),
			link_stations,
			data: None,
		})
	}

	pub fn datum(datum: impl Into<String>) -> Self {
		Directive::Datum(datum.into())
	}

	pub fn utm_convergence_angle(angle: Angle) -> Self {
		Directive::UtmConvergenceAngle(angle)
	}

	pub fn utm_zone(zone: u8) -> Self {
		Directive::UtmZone(zone)
	}

	pub fn file_parameters(
		override_lrud_associations: bool,
		lrud_association: LrudAssociation,
	) -> Self {
		Directive::FileParameters(FileParameters {
			override_lrud_associations,
			lrud_association,
		})
	}

	pub fn comment(comment: impl Into<String>) -> Self {
		Directive::Comment(comment.into())
	}
}

/// Fixes the project in UTM coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseLocation {
	pub easting: Length,
	pub northing: Length,
	pub elevation: Length,
	/// 1 to 60.
	pub utm_zone: u8,
	pub convergence_angle: Angle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatFileDirective {
	/// Path of the dat file, relative to the mak file.
	pub file: String,
	pub link_stations: Vec<LinkStation>,
	/// Filled in when the dat file itself is read alongside the project.
	pub data: Option<DatFile>,
}

/// A station shared with other dat files, optionally with fixed coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkStation {
	pub station: String,
	pub location: Option<Location>,
}

impl LinkStation {
	pub fn new(station: impl Into<String>) -> Self {
		LinkStation {
			station: station.into(),
			location: None,
		}
	}

	pub fn fixed(station: impl Into<String>, location: Location) -> Self {
		LinkStation {
			station: station.into(),
			location: Some(location),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
	pub easting: Length,
	pub northing: Length,
	pub elevation: Length,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FileParameters {
	pub override_lrud_associations: bool,
	pub lrud_association: LrudAssociation,
}

impl Default for FileParameters {
	fn default() -> Self {
		FileParameters {
			override_lrud_associations: false,
			lrud_association: LrudAssociation::FromStation,
		}
	}
}
