use crate::error::FormatError;

pub const MAX_STATION_NAME_LENGTH: usize = 12;

/// A station name is 1 to 12 printable ASCII characters (`0x21..=0x7F`),
/// so it can never contain a space.
pub fn is_valid_station_name(name: &str) -> bool {
	let length = name.chars().count();

	(1..=MAX_STATION_NAME_LENGTH).contains(&length)
		&& name.chars().all(|c| ('\x21'..='\x7f').contains(&c))
}

pub fn validate_station_name(name: &str) -> Result<(), FormatError> {
	if is_valid_station_name(name) {
		return Ok(());
	}

	Err(FormatError::InvalidStationName(escape(name)))
}

// Control and non-ASCII characters are shown as \xNN so the message stays printable
fn escape(name: &str) -> String {
	name.chars()
		.map(|c| {
			if c < '\x20' || c > '\x7f' {
				format!("\\x{:x}", c as u32)
			} else {
				c.to_string()
			}
		})
		.collect()
}
