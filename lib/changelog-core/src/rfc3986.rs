//! RFC-3986 percent-encoding for basenames.
//!
//! spec.md §4.2: "encodes basenames with RFC-3986 (alnum + `~` + `-` + `.` +
//! `_` passed through, all else `%HH`)". This is the encode table
//! `ConsumerJournal` also builds at `register()` time (spec.md §4.7) to
//! reconstruct basenames when reassembling `'E'` records.

/// `true` if `byte` may pass through unescaped.
const fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'~' | b'-' | b'.' | b'_')
}

/// Percent-encodes `input`, leaving unreserved bytes untouched.
pub fn encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Decodes a percent-encoded basename back to UTF-8.
///
/// Returns `None` on a malformed escape (stray `%`, bad hex digits, or
/// invalid UTF-8 after decoding) rather than panicking — this function runs
/// on untrusted on-disk journal content.
pub fn decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hex_str = std::str::from_utf8(hex).ok()?;
            let byte = u8::from_str_radix(hex_str, 16).ok()?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
