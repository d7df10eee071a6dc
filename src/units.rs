//! Numbers tagged with the unit they were measured in.
//!
//! Compass stores every length in feet and every angle in degrees, but callers
//! building trips by hand may use whatever unit they measured in. Values keep
//! their original unit and are only converted when read with [`Unitized::get`].

use std::fmt;

pub const FEET_PER_METER: f64 = 3.280839895;
pub const DEGREES_PER_GRADIAN: f64 = 0.9;

pub trait Unit: Copy + PartialEq + fmt::Debug {
	/// Converts a value in this unit to the base unit of its kind.
	fn to_base(self, value: f64) -> f64;

	/// Converts a value in the base unit of this kind to this unit.
	fn from_base(self, value: f64) -> f64;
}

/// Base unit: meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthUnit {
	Feet,
	Meters,
}

impl Unit for LengthUnit {
	fn to_base(self, value: f64) -> f64 {
		match self {
			LengthUnit::Feet => value / FEET_PER_METER,
			LengthUnit::Meters => value,
		}
	}

	fn from_base(self, value: f64) -> f64 {
		match self {
			LengthUnit::Feet => value * FEET_PER_METER,
			LengthUnit::Meters => value,
		}
	}
}

/// Base unit: degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AngleUnit {
	Degrees,
	Gradians,
	Radians,
}

impl Unit for AngleUnit {
	fn to_base(self, value: f64) -> f64 {
		match self {
			AngleUnit::Degrees => value,
			AngleUnit::Gradians => value * DEGREES_PER_GRADIAN,
			AngleUnit::Radians => value.to_degrees(),
		}
	}

	fn from_base(self, value: f64) -> f64 {
		match self {
			AngleUnit::Degrees => value,
			AngleUnit::Gradians => value / DEGREES_PER_GRADIAN,
			AngleUnit::Radians => value.to_radians(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unitized<U: Unit> {
	value: f64,
	unit: U,
}

pub type Length = Unitized<LengthUnit>;
pub type Angle = Unitized<AngleUnit>;

impl<U: Unit> Unitized<U> {
	pub fn new(value: f64, unit: U) -> Self {
		Self { value, unit }
	}

	/// The raw magnitude, in [`Unitized::unit`].
	pub fn value(&self) -> f64 {
		self.value
	}

	pub fn unit(&self) -> U {
		self.unit
	}

	/// The magnitude expressed in `unit`.
	pub fn get(&self, unit: U) -> f64 {
		if unit == self.unit {
			return self.value;
		}

		unit.from_base(self.unit.to_base(self.value))
	}

	pub fn in_unit(&self, unit: U) -> Self {
		Self::new(self.get(unit), unit)
	}

	pub fn is_finite(&self) -> bool {
		self.value.is_finite()
	}
}

impl Length {
	pub fn feet(value: f64) -> Self {
		Self::new(value, LengthUnit::Feet)
	}

	pub fn meters(value: f64) -> Self {
		Self::new(value, LengthUnit::Meters)
	}
}

impl Angle {
	pub fn degrees(value: f64) -> Self {
		Self::new(value, AngleUnit::Degrees)
	}

	pub fn gradians(value: f64) -> Self {
		Self::new(value, AngleUnit::Gradians)
	}

	pub fn radians(value: f64) -> Self {
		Self::new(value, AngleUnit::Radians)
	}
}
