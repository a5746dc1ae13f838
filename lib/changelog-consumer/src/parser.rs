//! Journal reconstruction: turns raw on-disk `CHANGELOG.<ts>` bytes (either
//! encoding) into the newline-separated textual form the scratch-directory
//! copy under `.current/` carries (spec.md §4.7 step 3).
//!
//! Two entry points share one record-walking routine over a byte slice
//! (SPEC_FULL.md §4's mmap note): [`parse_chunked`] is the default, reading
//! the source in bounded chunks with a carry buffer across `read()` calls —
//! grounded on `file-source::buffer::read_until_with_max_size`, generalized
//! from a configurable delimiter to a fixed NUL — so it never needs the
//! whole file resident at once; [`parse_mmap`] is the opt-in path for
//! read-mostly workloads, `mmap`-backed via `memmap2`. Both must avoid a
//! line-oriented reader because BINARY gfids can contain bytes
//! indistinguishable from `\n` (spec.md §9).

use std::path::Path;

use memmap2::Mmap;
use tokio::fs;
use tokio::io::AsyncReadExt;

use changelog_core::encoding::{binary_record_len, decode_ascii, decode_binary};
use changelog_core::record::ChangeRecord;
use changelog_core::{encoding, header, DecodeError, Encoding};

use crate::error::{ParseError, ReadSnafu, WriteSnafu};
use snafu::ResultExt;

const READ_CHUNK: usize = 64 * 1024;

/// The reconstructed body plus how many records it held; `record_count == 0`
/// means the source had only a header (spec.md §4.7 step 4's `zerob` case).
pub struct ParsedJournal {
    pub encoding: Encoding,
    pub body: Vec<u8>,
    pub record_count: usize,
}

/// Appends one record's ASCII textual form (no NUL terminator, `\n`
/// terminated) to `out` — spec.md §4.7: "Write each reconstituted record...
/// followed by `\n`."
fn append_reconstructed(out: &mut Vec<u8>, record: &ChangeRecord) {
    let mut bytes = encoding::encode_ascii(record).expect("canonical record always encodes");
    bytes.pop();
    out.extend_from_slice(&bytes);
    out.push(b'\n');
}

fn decode_record(piece: &[u8], encoding: Encoding) -> Result<ChangeRecord, ParseError> {
    Ok(match encoding {
        Encoding::Ascii => decode_ascii(piece)?,
        Encoding::Binary => decode_binary(piece)?,
    })
}

/// Walks records in an already-fully-buffered slice: the `mmap` path's
/// workhorse, and also used by tests against small fixtures. The header line
/// is always NUL-delimited text regardless of encoding, but the body walk
/// after it must branch: ASCII records never contain a raw NUL so splitting
/// on every `0` byte is safe, while BINARY records embed raw gfids that may
/// contain one, so those are walked via [`binary_record_len`] instead.
pub fn parse_slice(data: &[u8]) -> Result<ParsedJournal, ParseError> {
    let header_end = data.iter().position(|&b| b == 0).ok_or(ParseError::MissingHeader)?;
    let header_line =
        std::str::from_utf8(&data[..header_end]).map_err(|_| ParseError::MissingHeader)?;
    let encoding = header::parse(header_line).map_err(|_| ParseError::MissingHeader)?;
    let mut rest = &data[header_end + 1..];

    let mut body = Vec::new();
    let mut record_count = 0;

    match encoding {
        Encoding::Ascii => {
            for piece in rest.split(|&b| b == 0) {
                if piece.is_empty() {
                    continue;
                }
                let record = decode_record(piece, encoding)?;
                append_reconstructed(&mut body, &record);
                record_count += 1;
            }
        }
        Encoding::Binary => {
            while !rest.is_empty() {
                let len = binary_record_len(rest)?.ok_or(DecodeError::Truncated)?;
                let record = decode_record(&rest[..len - 1], encoding)?;
                append_reconstructed(&mut body, &record);
                record_count += 1;
                rest = &rest[len..];
            }
        }
    }

    Ok(ParsedJournal {
        encoding,
        body,
        record_count,
    })
}

/// Default parser: bounded chunked reads with a carry buffer, so the whole
/// file is never required to be resident in memory at once.
pub async fn parse_chunked(source: &Path) -> Result<ParsedJournal, ParseError> {
    let mut file = fs::File::open(source).await.context(ReadSnafu {
        path: source.to_path_buf(),
    })?;
    let mut carry: Vec<u8> = Vec::new();
    let mut buf = vec![0u8; READ_CHUNK];

    let mut encoding = None;
    let mut body = Vec::new();
    let mut record_count = 0;

    loop {
        let n = file.read(&mut buf).await.context(ReadSnafu {
            path: source.to_path_buf(),
        })?;
        if n == 0 {
            break;
        }
        carry.extend_from_slice(&buf[..n]);

        // The header line is always NUL-delimited text; only once it's
        // known do we learn which encoding governs the rest of the stream.
        if encoding.is_none() {
            let Some(idx) = carry.iter().position(|&b| b == 0) else {
                continue;
            };
            let header_bytes: Vec<u8> = carry.drain(..=idx).collect();
            let line = std::str::from_utf8(&header_bytes[..header_bytes.len() - 1])
                .map_err(|_| ParseError::MissingHeader)?;
            encoding = Some(header::parse(line).map_err(|_| ParseError::MissingHeader)?);
        }
        let Some(enc) = encoding else { continue };

        match enc {
            Encoding::Ascii => loop {
                let Some(idx) = carry.iter().position(|&b| b == 0) else {
                    break;
                };
                let piece: Vec<u8> = carry.drain(..=idx).collect();
                let piece = &piece[..piece.len() - 1]; // drop the NUL itself
                if piece.is_empty() {
                    continue;
                }
                let record = decode_record(piece, enc)?;
                append_reconstructed(&mut body, &record);
                record_count += 1;
            },
            Encoding::Binary => loop {
                let Some(len) = binary_record_len(&carry)? else {
                    break;
                };
                let piece: Vec<u8> = carry.drain(..len).collect();
                let record = decode_record(&piece[..piece.len() - 1], enc)?;
                append_reconstructed(&mut body, &record);
                record_count += 1;
            },
        }
    }

    let encoding = encoding.ok_or(ParseError::MissingHeader)?;
    Ok(ParsedJournal {
        encoding,
        body,
        record_count,
    })
}

/// Opt-in mmap-backed parser (SPEC_FULL.md §4: "must be a choice").
pub fn parse_mmap(source: &Path) -> Result<ParsedJournal, ParseError> {
    let file = std::fs::File::open(source).context(ReadSnafu {
        path: source.to_path_buf(),
    })?;
    // SAFETY: the mapped file is a closed, rolled-over journal this process
    // owns exclusively by the time it reaches the consumer scratch
    // pipeline; nothing else truncates or rewrites it concurrently.
    let mmap = unsafe { Mmap::map(&file) }.context(ReadSnafu {
        path: source.to_path_buf(),
    })?;
    parse_slice(&mmap)
}

/// Which parser a `ConsumerJournal` uses for incoming files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ParserKind {
    #[default]
    Chunked,
    Mmap,
}

impl ParserKind {
    pub async fn parse(self, source: &Path) -> Result<ParsedJournal, ParseError> {
        match self {
            ParserKind::Chunked => parse_chunked(source).await,
            ParserKind::Mmap => {
                let source = source.to_path_buf();
                tokio::task::spawn_blocking(move || parse_mmap(&source))
                    .await
                    .expect("mmap parse task panicked")
            }
        }
    }
}

pub(crate) async fn write_reconstructed(
    dest: &Path,
    body: &[u8],
) -> Result<(), ParseError> {
    fs::write(dest, body).await.context(WriteSnafu {
        path: dest.to_path_buf(),
    })
}
