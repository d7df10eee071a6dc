pub mod error;
pub mod format_string;
pub mod formatter;
pub mod mak;
pub mod parser;
pub mod project;
pub mod station;
pub mod units;

mod syntax;

use bitflags::bitflags;
use chrono::NaiveDate;

pub use error::{Error, ErrorKind, FormatError, ParseError};
pub use formatter::{format_dat_file, format_shot, format_trip, format_trip_header};
pub use parser::{parse_dat_file, trips, DatParser};
pub use station::{is_valid_station_name, validate_station_name};
pub use units::{Angle, AngleUnit, Length, LengthUnit};

macro_rules! char_enum {
	($(#[$meta:meta])* $name:ident { $($variant:ident = $c:literal),+ $(,)? }) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
		pub enum $name {
			$($variant),+
		}

		impl $name {
			pub const ALL: &'static [$name] = &[$($name::$variant),+];

			pub fn from_char(c: char) -> Option<Self> {
				match c {
					$($c => Some($name::$variant),)+
					_ => None,
				}
			}

			pub fn as_char(self) -> char {
				match self {
					$($name::$variant => $c),+
				}
			}
		}
	};
}

char_enum! {
	/// The unit azimuths are displayed in. Files always store degrees.
	AzimuthUnit {
		Degrees = 'D',
		Quads = 'Q',
		Gradians = 'R',
	}
}

char_enum! {
	/// The unit distances and LRUDs are displayed in. Files always store feet.
	DistanceUnit {
		DecimalFeet = 'D',
		FeetAndInches = 'I',
		Meters = 'M',
	}
}

char_enum! {
	InclinationUnit {
		Degrees = 'D',
		PercentGrade = 'G',
		DegreesAndMinutes = 'M',
		Gradians = 'R',
		DepthGauge = 'W',
	}
}

char_enum! {
	LrudItem {
		Left = 'L',
		Right = 'R',
		Up = 'U',
		Down = 'D',
	}
}

char_enum! {
	FrontsightItem {
		Distance = 'L',
		Azimuth = 'A',
		Inclination = 'D',
	}
}

char_enum! {
	BacksightItem {
		Azimuth = 'a',
		Inclination = 'd',
	}
}

char_enum! {
	/// Which station of a shot its LRUDs were measured at.
	LrudAssociation {
		FromStation = 'F',
		ToStation = 'T',
	}
}

/// An inclination reading. Trips recorded with a depth gauge store the depth
/// change as a length instead of an angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Inclination {
	Angle(Angle),
	Depth(Length),
}

impl Inclination {
	pub fn is_finite(&self) -> bool {
		match self {
			Inclination::Angle(angle) => angle.is_finite(),
			Inclination::Depth(depth) => depth.is_finite(),
		}
	}

	/// Degrees for angles, feet for depths.
	pub fn file_value(&self) -> f64 {
		match self {
			Inclination::Angle(angle) => angle.get(AngleUnit::Degrees),
			Inclination::Depth(depth) => depth.get(LengthUnit::Feet),
		}
	}
}

impl From<Angle> for Inclination {
	fn from(angle: Angle) -> Self {
		Inclination::Angle(angle)
	}
}

impl From<Length> for Inclination {
	fn from(depth: Length) -> Self {
		Inclination::Depth(depth)
	}
}

/// Everything encoded in the `FORMAT:` token of a trip header.
#[derive(Debug, Clone, PartialEq)]
pub struct TripFormat {
	pub azimuth_unit: AzimuthUnit,
	pub distance_unit: DistanceUnit,
	pub lrud_unit: DistanceUnit,
	pub inclination_unit: InclinationUnit,
	pub lrud_order: [LrudItem; 4],
	pub frontsight_order: [FrontsightItem; 3],
	pub backsight_order: Option<[BacksightItem; 2]>,
	pub has_redundant_backsights: Option<bool>,
	pub lrud_association: Option<LrudAssociation>,
}

impl TripFormat {
	pub fn is_depth_gauge(&self) -> bool {
		self.inclination_unit == InclinationUnit::DepthGauge
	}
}

impl Default for TripFormat {
	fn default() -> Self {
		TripFormat {
			azimuth_unit: AzimuthUnit::Degrees,
			distance_unit: DistanceUnit::DecimalFeet,
			lrud_unit: DistanceUnit::DecimalFeet,
			inclination_unit: InclinationUnit::Degrees,
			lrud_order: [LrudItem::Left, LrudItem::Right, LrudItem::Up, LrudItem::Down],
			frontsight_order: [
				FrontsightItem::Distance,
				FrontsightItem::Azimuth,
				FrontsightItem::Inclination,
			],
			backsight_order: None,
			has_redundant_backsights: None,
			lrud_association: None,
		}
	}
}

/// Instrument corrections applied to every shot of a trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corrections {
	pub distance: Option<Length>,
	pub frontsight_azimuth: Option<Angle>,
	pub frontsight_inclination: Option<Inclination>,
	pub backsight_azimuth: Option<Angle>,
	pub backsight_inclination: Option<Inclination>,
}

impl Corrections {
	pub fn is_empty(&self) -> bool {
		self.distance.is_none()
			&& self.frontsight_azimuth.is_none()
			&& self.frontsight_inclination.is_none()
			&& !self.has_backsight()
	}

	pub fn has_backsight(&self) -> bool {
		self.backsight_azimuth.is_some() || self.backsight_inclination.is_some()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripHeader {
	pub cave: String,
	pub name: String,
	pub date: NaiveDate,
	pub comment: Option<String>,
	pub team: Option<String>,
	pub declination: Angle,
	pub format: TripFormat,
	pub corrections: Corrections,
}

bitflags! {
	pub struct ShotFlags: u8 {
		const EXCLUDE_DISTANCE = (1 << 0);
		const EXCLUDE_FROM_PLOTTING = (1 << 1);
		const EXCLUDE_FROM_ALL_PROCESSING = (1 << 2);
		const DO_NOT_ADJUST = (1 << 3);
	}
}

impl ShotFlags {
	/// Flag characters in the order they are written.
	pub const CHARS: [(ShotFlags, char); 4] = [
		(ShotFlags::EXCLUDE_DISTANCE, 'L'),
		(ShotFlags::EXCLUDE_FROM_PLOTTING, 'P'),
		(ShotFlags::EXCLUDE_FROM_ALL_PROCESSING, 'X'),
		(ShotFlags::DO_NOT_ADJUST, 'C'),
	];

	pub fn from_char(c: char) -> Option<ShotFlags> {
		Self::CHARS
			.iter()
			.find(|(_, flag_char)| *flag_char == c)
			.map(|(flag, _)| *flag)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
	pub from: String,
	pub to: String,
	pub distance: Length,
	pub frontsight_azimuth: Option<Angle>,
	pub frontsight_inclination: Option<Inclination>,
	pub backsight_azimuth: Option<Angle>,
	pub backsight_inclination: Option<Inclination>,
	pub left: Option<Length>,
	pub right: Option<Length>,
	pub up: Option<Length>,
	pub down: Option<Length>,
	pub flags: ShotFlags,
	pub comment: Option<String>,
}

impl Shot {
	pub fn new(from: impl Into<String>, to: impl Into<String>, distance: Length) -> Self {
		Shot {
			from: from.into(),
			to: to.into(),
			distance,
			frontsight_azimuth: None,
			frontsight_inclination: None,
			backsight_azimuth: None,
			backsight_inclination: None,
			left: None,
			right: None,
			up: None,
			down: None,
			flags: ShotFlags::empty(),
			comment: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
	pub header: TripHeader,
	pub shots: Vec<Shot>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatFile {
	pub trips: Vec<Trip>,
}
