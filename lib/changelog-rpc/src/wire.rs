//! The reverse-RPC wire protocol (spec.md §4.8, §6 "Events on the wire").
//!
//! spec.md §1 excludes "the RPC transport itself (socket setup, XDR codec,
//! iobuf pool)" from scope; this module still needs *some* framing to move
//! [`RpcMessage`] values over a byte stream, so it uses the same
//! length-delimited idiom `lib/codecs/src/common/length_delimited.rs` wraps
//! around `tokio_util::codec::LengthDelimitedCodec`, with `serde_json` for
//! the payload rather than XDR.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use changelog_core::Gfid;

/// Maximum single-frame size (spec.md has no stated limit; this matches the
/// teacher's `LengthDelimitedCoderOptions` default).
const MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Filter bitmask bits (spec.md §4.6: "consulting the client's filter
/// bitmask; events whose type is not selected are skipped").
pub const FILTER_CREATE: u32 = 1 << 0;
pub const FILTER_OPEN: u32 = 1 << 1;
pub const FILTER_RELEASE: u32 = 1 << 2;
pub const FILTER_JOURNAL: u32 = 1 << 3;
pub const FILTER_ALL: u32 = FILTER_CREATE | FILTER_OPEN | FILTER_RELEASE | FILTER_JOURNAL;

/// One sub-event inside an `EVENT` RPC payload (spec.md §6: "Fixed-size
/// `Event { u32 type; union {...} }`. Multiple events may be packed per RPC
/// iovec"), expressed as a tagged enum instead of a C union.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Create { gfid: Gfid, flags: u32 },
    Open { gfid: Gfid, flags: u32 },
    Release { gfid: Gfid, flags: u32 },
    /// A rolled-over journal ready for the consumer to pick up — this is
    /// what C1's RotBuf actually carries per spec.md §2's data-flow note
    /// ("publishes a journal-path event through C1 → C6 → RPC → C8").
    Journal { path: String },
}

impl Event {
    pub fn filter_bit(&self) -> u32 {
        match self {
            Event::Create { .. } => FILTER_CREATE,
            Event::Open { .. } => FILTER_OPEN,
            Event::Release { .. } => FILTER_RELEASE,
            Event::Journal { .. } => FILTER_JOURNAL,
        }
    }
}

/// The envelope carried over the reverse connection: the `EVENT` procedure
/// (spec.md §4.8), the probe-time filter install (spec.md §4.7 `register`:
/// "issues a PROBE_FILTER RPC back to the producer"), and its ack.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RpcMessage {
    Event {
        seq: u64,
        tv_sec: i64,
        tv_usec: i64,
        payload: Vec<Event>,
    },
    ProbeFilter {
        mask: u32,
    },
    Ack {
        seq: u64,
    },
}

#[derive(Debug, Snafu)]
pub enum WireError {
    #[snafu(display("failed to encode RPC message: {source}"))]
    Encode { source: serde_json::Error },
    #[snafu(display("failed to decode RPC message: {source}"))]
    Decode { source: serde_json::Error },
}

impl RpcMessage {
    pub fn encode(&self) -> Result<Bytes, WireError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .context(EncodeSnafu)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(bytes).context(DecodeSnafu)
    }

    pub fn filter_mask(&self) -> Option<u32> {
        match self {
            RpcMessage::ProbeFilter { mask } => Some(*mask),
            _ => None,
        }
    }
}

/// Wraps a byte stream in the length-delimited framing both ends of the
/// reverse connection use.
pub fn framed_transport<T: AsyncRead + AsyncWrite + Unpin>(io: T) -> Framed<T, LengthDelimitedCodec> {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec();
    Framed::new(io, codec)
}
