//! Shared error types for encoding/decoding changelog records.
//!
//! Structural journal corruption (spec.md §7: "bad type mark, missing NUL
//! separator, unknown fop, encoding not recognized") is represented here so
//! both the producer's encoder (which should never hit these, but must not
//! panic on a bad `ChangeRecord`) and the consumer's parser (which hits
//! these constantly on untrusted on-disk bytes) share one vocabulary.

use snafu::Snafu;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum EncodeError {
    #[snafu(display("record of {gfid} would exceed the maximum on-disk record size"))]
    TooLarge { gfid: String },
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum DecodeError {
    #[snafu(display("malformed gfid: {text}"))]
    BadGfid { text: String },

    #[snafu(display("unknown record type mark: {mark:?}"))]
    BadTypeMark { mark: char },

    #[snafu(display("record is missing its NUL terminator"))]
    MissingTerminator,

    #[snafu(display("unknown fop code: {code}"))]
    UnknownFop { code: String },

    #[snafu(display("malformed integer field: {text}"))]
    BadInteger { text: String },

    #[snafu(display("basename failed percent-decoding: {text}"))]
    BadBasename { text: String },

    #[snafu(display("record ended before all expected fields were read"))]
    Truncated,

    #[snafu(display("unrecognized changelog header: {line}"))]
    BadHeader { line: String },

    #[snafu(display("unrecognized encoding value: {value}"))]
    UnknownEncoding { value: u8 },

    #[snafu(display("deleted-path presence flag must be 0 or 1, got {value}"))]
    BadDeletedPathFlag { value: u8 },
}
