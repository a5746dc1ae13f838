//! C2: per-fop record construction (spec.md §4.2).
//!
//! Byte-level encode/decode lives in `changelog_core::encoding`; this
//! module is the thin per-mount selector between the two encoders spec.md
//! §4.2 names. The encoder is fixed at configuration time — switching
//! requires a rollover (spec.md §4.2) — so `Recorder` has no method that
//! re-encodes a record under a different encoding than the one it was
//! built with.

use changelog_core::encoding;
use changelog_core::record::{ChangeRecord, Encoding};
use changelog_core::EncodeError;

pub struct Recorder {
    encoding: Encoding,
}

impl Recorder {
    pub fn new(encoding: Encoding) -> Self {
        Recorder { encoding }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Assembles one record into a byte buffer ready for
    /// `JournalWriter::append`.
    pub fn encode(&self, record: &ChangeRecord) -> Result<Vec<u8>, EncodeError> {
        match self.encoding {
            Encoding::Ascii => encoding::encode_ascii(record),
            Encoding::Binary => encoding::encode_binary(record),
        }
    }
}
