use std::{fmt, str::FromStr};

use nom::character::complete::anychar;

use crate::{
	error::{ErrorKind, ParseError},
	syntax::{at, failure, locate, PResult},
	AzimuthUnit, BacksightItem, DistanceUnit, FrontsightItem, InclinationUnit, LrudAssociation,
	LrudItem, TripFormat,
};

const MIN_BACKSIGHT_LENGTH: usize = 15;
const MIN_REDUNDANT_BACKSIGHT_LENGTH: usize = 12;
const MIN_LRUD_ASSOCIATION_LENGTH: usize = 13;

// Format = {  // a single token with no whitespace
//   Char azimuthUnit         // D Q R
//   Char distanceUnit        // D I M
//   Char lrudUnit            // D I M
//   Char inclinationUnit     // D G M R W
//   Char[4] lrudOrder        // each of L R U D once
//   Char[3] frontsightOrder  // each of L A D once
//   if (length >= 15 || next is a or d)
//     Char[2] backsightOrder // each of a d once
//   if (length >= 12 && not at end)
//     Char redundantBacksights // B or N, any case
//   if (length >= 13 && not at end)
//     Char lrudAssociation   // F or T
// }
pub(crate) fn parse_trip_format(input: &str) -> PResult<TripFormat> {
	let length = input.chars().count();

	let (input, azimuth_unit) = item(input, "azimuth unit", AzimuthUnit::from_char)?;
	let (input, distance_unit) = item(input, "distance unit", DistanceUnit::from_char)?;
	let (input, lrud_unit) = item(input, "lrud unit", DistanceUnit::from_char)?;
	let (input, inclination_unit) = item(input, "inclination unit", InclinationUnit::from_char)?;
	let (input, lrud_order) = items(input, "lrud item", LrudItem::from_char)?;
	let (input, frontsight_order) = items(input, "frontsight item", FrontsightItem::from_char)?;

	let backsights_follow = input.starts_with(|c: char| BacksightItem::from_char(c).is_some());
	let (input, backsight_order) = if length >= MIN_BACKSIGHT_LENGTH || backsights_follow {
		let (input, order) = items(input, "backsight item", BacksightItem::from_char)?;
		(input, Some(order))
	} else {
		(input, None)
	};

	let redundant_follows = length >= MIN_REDUNDANT_BACKSIGHT_LENGTH && !input.is_empty();
	let (input, has_redundant_backsights) = if redundant_follows {
		let (input, redundant) = item(input, "redundant backsight item", redundant_backsights)?;
		(input, Some(redundant))
	} else {
		(input, None)
	};

	let association_follows = length >= MIN_LRUD_ASSOCIATION_LENGTH && !input.is_empty();
	let (input, lrud_association) = if association_follows {
		let (input, association) = item(input, "lrud association", LrudAssociation::from_char)?;
		(input, Some(association))
	} else {
		(input, None)
	};

	let format = TripFormat {
		azimuth_unit,
		distance_unit,
		lrud_unit,
		inclination_unit,
		lrud_order,
		frontsight_order,
		backsight_order,
		has_redundant_backsights,
		lrud_association,
	};

	Ok((input, format))
}

fn redundant_backsights(c: char) -> Option<bool> {
	match c.to_ascii_uppercase() {
		'B' => Some(true),
		'N' => Some(false),
		_ => None,
	}
}

fn item<'a, T>(input: &'a str, field: &'static str, decode: fn(char) -> Option<T>) -> PResult<'a, T> {
	let result: PResult<char> = anychar(input);
	let (rest, c) = result.map_err(|_| failure(at(input), ErrorKind::Missing(field)))?;

	match decode(c) {
		Some(value) => Ok((rest, value)),
		None => Err(failure(&input[..c.len_utf8()], ErrorKind::Invalid(field))),
	}
}

// N items of one kind, each appearing at most once
fn items<'a, T: PartialEq, const N: usize>(
	mut input: &'a str,
	field: &'static str,
	decode: fn(char) -> Option<T>,
) -> PResult<'a, [T; N]> {
	let mut values = Vec::with_capacity(N);

	for _ in 0..N {
		let (rest, value) = item(input, field, decode)?;
		if values.contains(&value) {
			let span = &input[..input.len() - rest.len()];
			return Err(failure(span, ErrorKind::Duplicate(field)));
		}

		values.push(value);
		input = rest;
	}

	let values: [T; N] = values
		.try_into()
		.map_err(|_| failure(at(input), ErrorKind::Missing(field)))?;

	Ok((input, values))
}

impl FromStr for TripFormat {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		locate(parse_trip_format(s), s, 1)
	}
}

impl fmt::Display for TripFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}{}{}{}",
			self.azimuth_unit.as_char(),
			self.distance_unit.as_char(),
			self.lrud_unit.as_char(),
			self.inclination_unit.as_char()
		)?;

		for item in self.lrud_order {
			write!(f, "{}", item.as_char())?;
		}
		for item in self.frontsight_order {
			write!(f, "{}", item.as_char())?;
		}
		for item in self.backsight_order.iter().flatten() {
			write!(f, "{}", item.as_char())?;
		}

		// the two trailing characters are always written as a pair
		if self.has_redundant_backsights.is_some() || self.lrud_association.is_some() {
			let redundant = if self.has_redundant_backsights == Some(true) { 'B' } else { 'N' };
			let association = self.lrud_association.unwrap_or(LrudAssociation::FromStation);
			write!(f, "{}{}", redundant, association.as_char())?;
		}

		Ok(())
	}
}
