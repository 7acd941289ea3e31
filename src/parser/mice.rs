use crate::domain::GeoCoordinate;
use crate::error::Error;

/// Result of decoding a Mic-E destination address plus its paired info field.
pub struct DecodedMicE {
    pub position: GeoCoordinate,
    pub speed_knots: Option<u16>,
    pub course_degrees: Option<u16>,
    pub symbol_table: char,
    pub symbol_code: char,
    pub comment: String,
    pub message_code: u8,
}

#[derive(Clone, Copy)]
enum DigitClass {
    Digit,
    Custom,
    Standard,
}

fn classify(byte: u8) -> Result<(u8, DigitClass), Error> {
    match byte {
        b'0'..=b'9' => Ok((byte - b'0', DigitClass::Digit)),
        b'A'..=b'J' => Ok((byte - b'A', DigitClass::Custom)),
        b'K' => Ok((0, DigitClass::Custom)),
        b'L' => Ok((0, DigitClass::Digit)),
        b'P'..=b'Y' => Ok((byte - b'P', DigitClass::Standard)),
        b'Z' => Ok((0, DigitClass::Standard)),
        other => Err(Error::FormatError(format!(
            "byte '{}' is not a valid mic-e destination character",
            other as char
        ))),
    }
}

/// Decode the 6-character AX.25 destination callsign field (SSID stripped)
/// of a Mic-E frame into latitude digits, hemisphere, longitude offset and
/// the 3-bit status message code.
fn decode_destination(dest: &str) -> Result<(f64, bool, bool, bool, u8), Error> {
    let bytes = dest.as_bytes();
    if bytes.len() != 6 {
        return Err(Error::FormatError(
            "mic-e destination field must be 6 characters".into(),
        ));
    }

    let mut digits = [0u8; 6];
    let mut classes = [DigitClass::Digit; 6];
    for (i, b) in bytes.iter().enumerate() {
        let (digit, class) = classify(*b)?;
        digits[i] = digit;
        classes[i] = class;
    }

    let lat_deg = (digits[0] * 10 + digits[1]) as f64;
    let lat_min = (digits[2] * 10 + digits[3]) as f64 + (digits[4] * 10 + digits[5]) as f64 / 100.0;
    let latitude = lat_deg + lat_min / 60.0;

    let north = !matches!(classes[3], DigitClass::Digit);
    let longitude_offset = matches!(classes[4], DigitClass::Standard);
    let west = matches!(classes[5], DigitClass::Standard);

    let bit = |c: DigitClass| !matches!(c, DigitClass::Digit);
    let message_code = ((bit(classes[0]) as u8) << 2) | ((bit(classes[1]) as u8) << 1) | bit(classes[2]) as u8;

    Ok((latitude * if north { 1.0 } else { -1.0 }, north, longitude_offset, west, message_code))
}

fn decode_info(info: &str, longitude_offset: bool, west: bool) -> Result<DecodedMicE, Error> {
    let bytes = info.as_bytes();
    if bytes.len() < 8 {
        return Err(Error::FormatError(
            "mic-e info field is too short".into(),
        ));
    }

    let mut lon_deg = (bytes[0] as i32 - 28) as i32;
    if longitude_offset {
        lon_deg += 100;
    }
    if (180..190).contains(&lon_deg) {
        lon_deg -= 80;
    } else if (190..200).contains(&lon_deg) {
        lon_deg -= 190;
    }

    let mut lon_min = (bytes[1] as i32 - 28) as i32;
    if lon_min >= 60 {
        lon_min -= 60;
    }
    let lon_hundredths = (bytes[2] as i32 - 28).clamp(0, 99);

    let longitude = lon_deg as f64 + (lon_min as f64 + lon_hundredths as f64 / 100.0) / 60.0;
    let longitude = if west { -longitude } else { longitude };

    let sp = (bytes[3] as i32 - 28).max(0);
    let shared = (bytes[4] as i32 - 28).max(0);
    let course_low = (bytes[5] as i32 - 28).max(0);

    let speed = sp * 10 + shared / 10;
    let course = (shared % 10) * 100 + course_low;

    let symbol_code = bytes[6] as char;
    let symbol_table = bytes[7] as char;
    let comment = String::from_utf8_lossy(&bytes[8..]).to_string();

    let position = GeoCoordinate::new(0.0, longitude.clamp(-180.0, 180.0))?;

    Ok(DecodedMicE {
        position,
        speed_knots: Some(speed as u16),
        course_degrees: Some(course as u16),
        symbol_table,
        symbol_code,
        comment,
        message_code: 0,
        // `position` latitude is filled in by `decode`, which has the
        // destination-field half of the picture; `longitude` above is
        // authoritative here.
    })
}

/// Decode a Mic-E packet from its destination address field and its
/// (already stripped-of-data-type-byte) info field.
pub fn decode(destination: &str, info: &str) -> Result<DecodedMicE, Error> {
    let (latitude, _north, longitude_offset, west, message_code) = decode_destination(destination)?;
    let mut decoded = decode_info(info, longitude_offset, west)?;
    decoded.position = GeoCoordinate::new(latitude, decoded.position.longitude())?;
    decoded.message_code = message_code;
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_destination_digits_as_plain_numeric() {
        let (latitude, north, lon_offset, west, code) = decode_destination("499658").unwrap();
        // all-digit destination: south hemisphere, no longitude offset, not west
        assert!(!north);
        assert!(latitude < 0.0);
        assert!(!lon_offset);
        assert!(!west);
        assert_eq!(code, 0);
    }

    #[test]
    fn rejects_wrong_length_destination() {
        assert!(decode_destination("12345").is_err());
    }

    #[test]
    fn rejects_short_info_field() {
        assert!(decode_info("short", false, false).is_err());
    }

    #[test]
    fn decodes_full_frame_within_valid_bounds() {
        let decoded = decode("499658", "\x4c\x3c\x3c\x3c\x3c\x3c>/").unwrap();
        assert!(decoded.position.latitude() >= -90.0 && decoded.position.latitude() <= 90.0);
        assert!(decoded.position.longitude() >= -180.0 && decoded.position.longitude() <= 180.0);
    }
}
