//! Wire formats
//!
//! The credential document (persisted file and remote directory response)
//! is a JSON array:
//! ```text
//! [ { "ssid": "...", "password": "..." }, ... ]
//! ```
//!
//! Telemetry goes out as GET query parameters with fixed names and
//! fixed decimal precision.

use thiserror::Error;

use crate::{CredentialList, NetworkCredential, PositionSample};

/// Maximum credential document size (16 KiB) accepted from disk or network
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024;

/// Errors that can occur while encoding or decoding a credential document
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Document too large: {0} bytes (max: {MAX_DOCUMENT_SIZE})")]
    DocumentTooLarge(usize),

    #[error("Malformed credential document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a credential list into the document format
pub fn encode_credentials(list: &[NetworkCredential]) -> Result<Vec<u8>, CodecError> {
    let bytes = serde_json::to_vec(list)?;

    if bytes.len() > MAX_DOCUMENT_SIZE {
        return Err(CodecError::DocumentTooLarge(bytes.len()));
    }

    Ok(bytes)
}

/// Decode a credential document.
///
/// Every element must be an object carrying string `ssid` and `password`
/// fields; anything else rejects the whole document.
pub fn decode_credentials(bytes: &[u8]) -> Result<CredentialList, CodecError> {
    if bytes.len() > MAX_DOCUMENT_SIZE {
        return Err(CodecError::DocumentTooLarge(bytes.len()));
    }

    Ok(serde_json::from_slice(bytes)?)
}

/// Telemetry query parameter names
pub mod query {
    pub const KEY: &str = "key";
    pub const LAT: &str = "lat";
    pub const LNG: &str = "lng";
    pub const SPEED: &str = "speed";
    pub const ALT: &str = "alt";
}

/// Build the telemetry query for one sample
pub fn telemetry_query(api_key: &str, sample: &PositionSample) -> Vec<(&'static str, String)> {
    vec![
        (query::KEY, api_key.to_string()),
        (query::LAT, format!("{:.6}", sample.latitude)),
        (query::LNG, format!("{:.6}", sample.longitude)),
        (query::SPEED, format!("{:.2}", sample.speed_kmh)),
        (query::ALT, format!("{:.2}", sample.altitude_m)),
    ]
}

/// Build the directory request query
pub fn directory_query(api_key: &str) -> Vec<(&'static str, String)> {
    vec![(query::KEY, api_key.to_string())]
}
