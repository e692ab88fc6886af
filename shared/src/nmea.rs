//! Streaming NMEA 0183 decoder
//!
//! Receivers emit ASCII sentences terminated by CR LF:
//! ```text
//! $GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n
//! ```
//!
//! Only the two sentences the tracker needs are decoded: GGA (position,
//! fix quality, altitude) and RMC (status, position, ground speed). Any
//! other well-formed sentence comes back as [`Sentence::Other`].

use bytes::BytesMut;
use thiserror::Error;

/// Longest partial line kept while waiting for a terminator
pub const MAX_LINE_LEN: usize = 4096;

/// Knots to kilometres per hour
pub const KNOTS_TO_KMH: f64 = 1.852;

/// Errors that can occur while decoding a sentence
#[derive(Error, Debug, PartialEq)]
pub enum NmeaError {
    #[error("Line too long: {0} bytes without terminator (max: {MAX_LINE_LEN})")]
    LineTooLong(usize),

    #[error("Line is not ASCII")]
    NotAscii,

    #[error("No sentence start in line")]
    MissingStart,

    #[error("Missing checksum")]
    MissingChecksum,

    #[error("Checksum mismatch: sentence says {expected:02X}, computed {computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },

    #[error("Invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// Signed decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Global positioning system fix data
#[derive(Debug, Clone, PartialEq)]
pub struct GgaSentence {
    pub coordinates: Option<Coordinates>,
    /// 0 = no fix
    pub fix_quality: u8,
    pub altitude_m: Option<f64>,
}

impl GgaSentence {
    pub fn has_fix(&self) -> bool {
        self.fix_quality > 0 && self.coordinates.is_some()
    }
}

/// Recommended minimum specific GNSS data
#[derive(Debug, Clone, PartialEq)]
pub struct RmcSentence {
    /// Status `A`; `V` is a void fix
    pub active: bool,
    pub coordinates: Option<Coordinates>,
    pub speed_knots: Option<f64>,
}

impl RmcSentence {
    pub fn has_fix(&self) -> bool {
        self.active && self.coordinates.is_some()
    }

    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed_knots.map(|knots| knots * KNOTS_TO_KMH)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Gga(GgaSentence),
    Rmc(RmcSentence),
    /// Checksum-valid sentence of a type we do not decode
    Other(String),
}

/// Parse one sentence, with or without its line terminator
pub fn parse_sentence(line: &str) -> Result<Sentence, NmeaError> {
    // Field slicing below assumes one byte per character
    if !line.is_ascii() {
        return Err(NmeaError::NotAscii);
    }
    let line = line.trim_end_matches(['\r', '\n']);
    let start = line.find('$').ok_or(NmeaError::MissingStart)?;
    let line = &line[start + 1..];

    let (body, checksum) = line.split_once('*').ok_or(NmeaError::MissingChecksum)?;
    let expected = u8::from_str_radix(checksum.trim(), 16).map_err(|_| NmeaError::InvalidField {
        field: "checksum",
        value: checksum.to_string(),
    })?;
    let computed = body.bytes().fold(0u8, |acc, b| acc ^ b);
    if expected != computed {
        return Err(NmeaError::ChecksumMismatch { expected, computed });
    }

    let fields: Vec<&str> = body.split(',').collect();
    // Talker prefix (GP, GN, GL, ...) is ignored
    let kind = fields[0].get(2..).unwrap_or_default();

    match kind {
        "GGA" => parse_gga(&fields).map(Sentence::Gga),
        "RMC" => parse_rmc(&fields).map(Sentence::Rmc),
        _ => Ok(Sentence::Other(fields[0].to_string())),
    }
}

fn field<'a>(fields: &[&'a str], index: usize) -> &'a str {
    fields.get(index).copied().unwrap_or_default()
}

fn parse_gga(fields: &[&str]) -> Result<GgaSentence, NmeaError> {
    let coordinates = parse_coordinates(fields, 2)?;
    let quality = field(fields, 6);
    let fix_quality = if quality.is_empty() {
        0
    } else {
        quality.parse().map_err(|_| NmeaError::InvalidField {
            field: "fix quality",
            value: quality.to_string(),
        })?
    };
    let altitude_m = parse_optional_f64(field(fields, 9), "altitude")?;

    Ok(GgaSentence {
        coordinates,
        fix_quality,
        altitude_m,
    })
}

fn parse_rmc(fields: &[&str]) -> Result<RmcSentence, NmeaError> {
    let active = match field(fields, 2) {
        "A" => true,
        "V" | "" => false,
        other => {
            return Err(NmeaError::InvalidField {
                field: "status",
                value: other.to_string(),
            })
        }
    };
    let coordinates = parse_coordinates(fields, 3)?;
    let speed_knots = parse_optional_f64(field(fields, 7), "speed")?;

    Ok(RmcSentence {
        active,
        coordinates,
        speed_knots,
    })
}

/// Parse the four fields `lat, N|S, lon, E|W` starting at `first`
fn parse_coordinates(fields: &[&str], first: usize) -> Result<Option<Coordinates>, NmeaError> {
    let lat = field(fields, first);
    let lon = field(fields, first + 2);
    if lat.is_empty() || lon.is_empty() {
        return Ok(None);
    }

    let latitude = parse_degrees_minutes(lat, "latitude")?;
    let longitude = parse_degrees_minutes(lon, "longitude")?;

    let latitude = match field(fields, first + 1) {
        "N" => latitude,
        "S" => -latitude,
        other => {
            return Err(NmeaError::InvalidField {
                field: "latitude hemisphere",
                value: other.to_string(),
            })
        }
    };
    let longitude = match field(fields, first + 3) {
        "E" => longitude,
        "W" => -longitude,
        other => {
            return Err(NmeaError::InvalidField {
                field: "longitude hemisphere",
                value: other.to_string(),
            })
        }
    };

    Ok(Some(Coordinates {
        latitude,
        longitude,
    }))
}

/// `ddmm.mmmm` / `dddmm.mmmm` to decimal degrees
fn parse_degrees_minutes(value: &str, field: &'static str) -> Result<f64, NmeaError> {
    let invalid = || NmeaError::InvalidField {
        field,
        value: value.to_string(),
    };

    let dot = value.find('.').unwrap_or(value.len());
    if dot < 3 {
        return Err(invalid());
    }
    let (degrees, minutes) = value.split_at(dot - 2);
    let degrees: f64 = degrees.parse().map_err(|_| invalid())?;
    let minutes: f64 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60.0 {
        return Err(invalid());
    }

    Ok(degrees + minutes / 60.0)
}

fn parse_optional_f64(value: &str, field: &'static str) -> Result<Option<f64>, NmeaError> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| NmeaError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// Line-oriented decoder for a byte stream from a receiver
#[derive(Debug, Default)]
pub struct NmeaDecoder {
    /// Bytes of the line being accumulated
    buffer: BytesMut,
}

impl NmeaDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(512),
        }
    }

    /// Add received bytes to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next sentence from the buffer.
    ///
    /// A line that fails to decode is consumed before the error is
    /// returned, so callers keep calling until `Ok(None)`.
    pub fn decode_next(&mut self) -> Result<Option<Sentence>, NmeaError> {
        loop {
            let Some(end) = self.buffer.iter().position(|&b| b == b'\n') else {
                if self.buffer.len() > MAX_LINE_LEN {
                    let len = self.buffer.len();
                    self.buffer.clear();
                    return Err(NmeaError::LineTooLong(len));
                }
                return Ok(None);
            };

            let line = self.buffer.split_to(end + 1);
            if !line.is_ascii() {
                return Err(NmeaError::NotAscii);
            }
            let line = std::str::from_utf8(&line).map_err(|_| NmeaError::NotAscii)?;
            if line.trim().is_empty() {
                continue;
            }

            return parse_sentence(line).map(Some);
        }
    }

    #[cfg(test)]
    fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}
