//! The one-line changelog header (spec.md §6).
//!
//! `GlusterFS Changelog | version: v<MAJ>.<MIN> | encoding : <0|1>`

use crate::error::DecodeError;
use crate::record::Encoding;

pub const VERSION_MAJOR: u32 = 1;
pub const VERSION_MINOR: u32 = 2;

/// Renders the header line, without its trailing NUL terminator (spec.md
/// §3: "one-line header ... followed by records").
pub fn render(encoding: Encoding) -> String {
    format!(
        "GlusterFS Changelog | version: v{VERSION_MAJOR}.{VERSION_MINOR} | encoding : {}",
        encoding.wire_value()
    )
}

/// Parses a header line, returning the encoding it declares.
pub fn parse(line: &str) -> Result<Encoding, DecodeError> {
    let value = line
        .rsplit(':')
        .next()
        .map(str::trim)
        .ok_or_else(|| DecodeError::BadHeader {
            line: line.to_string(),
        })?;
    let raw: u8 = value.parse().map_err(|_| DecodeError::BadHeader {
        line: line.to_string(),
    })?;
    Encoding::from_wire_value(raw).ok_or(DecodeError::UnknownEncoding { value: raw })
}
