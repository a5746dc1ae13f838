//! ASCII and BINARY record encoders/decoders (spec.md §4.2, §6).
//!
//! Grounded on `original_source/.../changelog-encoders.c`: one dispatch per
//! encoding, each assembling a record into a single buffer for one `write`
//! call (spec.md §4.2: "assembled into a stack-allocated buffer ... written
//! in one `write` call"). This crate assembles into a `Vec<u8>` instead —
//! there is no stack-allocation benefit to chase in safe Rust, and the
//! journal writer still issues one `write_all` per record.
//!
//! The two encodings use different field separators by design: ASCII
//! fields are joined with a single space (matching the grammar of spec.md
//! §6 literally, and every byte of the worked examples in spec.md §8);
//! BINARY fields are joined with NUL, because BINARY gfids are raw 16-byte
//! blobs that may contain bytes indistinguishable from a space or newline
//! (spec.md §9's note on why a line-oriented reader is unsafe for this
//! encoding). Both encodings terminate the whole record with one NUL,
//! which is the on-disk record separator (spec.md §6).

use crate::error::{DecodeError, EncodeError};
use crate::fop::FopCode;
use crate::gfid::Gfid;
use crate::record::{ChangeRecord, EntryLink, ModeOwnership};
use crate::rfc3986;

const RECORD_TERMINATOR: u8 = 0;

/// Encodes `record` in ASCII form, returning the bytes of one record
/// *including* its trailing NUL terminator.
pub fn encode_ascii(record: &ChangeRecord) -> Result<Vec<u8>, EncodeError> {
    let mut tokens: Vec<String> = Vec::new();
    match record {
        ChangeRecord::Data { gfid } => {
            tokens.push("D".to_string());
            tokens.push(gfid.to_string());
        }
        ChangeRecord::Metadata { gfid, fop } => {
            tokens.push("M".to_string());
            tokens.push(gfid.to_string());
            tokens.push(fop.name().to_string());
        }
        ChangeRecord::Entry {
            parent,
            fop,
            ownership,
            deleted_gfid,
            links,
            deleted_path,
        } => {
            tokens.push("E".to_string());
            tokens.push(parent.to_string());
            tokens.push(fop.name().to_string());
            if let Some(o) = ownership {
                tokens.push(o.mode.to_string());
                tokens.push(o.uid.to_string());
                tokens.push(o.gid.to_string());
            }
            if let Some(dg) = deleted_gfid {
                tokens.push(dg.to_string());
            }
            for link in links {
                tokens.push(format!(
                    "{}{}",
                    link.gfid,
                    rfc3986::encode(&format!("/{}", link.basename))
                ));
            }
            if let Some(path) = deleted_path {
                tokens.push(path.clone());
            }
        }
    }
    let mut out = tokens.join(" ").into_bytes();
    out.push(RECORD_TERMINATOR);
    Ok(out)
}

/// Decodes one ASCII record from `bytes`, which must contain exactly one
/// record's payload with its trailing NUL already stripped by the caller
/// (the chunked-read scanner in `changelog-consumer::parser` owns NUL
/// framing; this function only understands the space-separated payload).
pub fn decode_ascii(bytes: &[u8]) -> Result<ChangeRecord, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::Truncated)?;
    let mut tokens = text.split(' ');
    let mark = tokens.next().and_then(|s| s.chars().next()).ok_or(DecodeError::Truncated)?;
    match mark {
        'D' => {
            let gfid = Gfid::parse_ascii(next_token(&mut tokens)?)?;
            Ok(ChangeRecord::Data { gfid })
        }
        'M' => {
            let gfid = Gfid::parse_ascii(next_token(&mut tokens)?)?;
            let fop = parse_fop_name(next_token(&mut tokens)?)?;
            Ok(ChangeRecord::Metadata { gfid, fop })
        }
        'E' => decode_ascii_entry(next_token(&mut tokens)?, &mut tokens),
        other => Err(DecodeError::BadTypeMark { mark: other }),
    }
}

fn decode_ascii_entry<'a>(
    parent_text: &str,
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<ChangeRecord, DecodeError> {
    let parent = Gfid::parse_ascii(parent_text)?;
    let fop = parse_fop_name(next_token(tokens)?)?;

    let ownership = if fop.nr_extra_recs() > 0 {
        let mode = parse_u32(next_token(tokens)?)?;
        let uid = parse_u32(next_token(tokens)?)?;
        let gid = parse_u32(next_token(tokens)?)?;
        Some(ModeOwnership { mode, uid, gid })
    } else {
        None
    };

    let is_delete = matches!(fop, FopCode::Unlink | FopCode::Rmdir);
    let deleted_gfid = if is_delete {
        Some(Gfid::parse_ascii(next_token(tokens)?)?)
    } else {
        None
    };

    let nr_links = fop.nr_gfids().max(1);
    let mut links = Vec::with_capacity(nr_links);
    for _ in 0..nr_links {
        links.push(parse_link_token(next_token(tokens)?)?);
    }

    let deleted_path = if is_delete {
        tokens.next().map(str::to_string)
    } else {
        None
    };

    Ok(ChangeRecord::Entry {
        parent,
        fop,
        ownership,
        deleted_gfid,
        links,
        deleted_path,
    })
}

/// Parses one `<gfid><rfc3986-encoded "/"+basename>` token. The gfid
/// portion is always exactly 36 characters (a canonical UUID never
/// contains `%`), so it can be split off positionally.
fn parse_link_token(token: &str) -> Result<EntryLink, DecodeError> {
    if token.len() < 36 {
        return Err(DecodeError::Truncated);
    }
    let (gfid_text, rest) = token.split_at(36);
    let gfid = Gfid::parse_ascii(gfid_text)?;
    let decoded = rfc3986::decode(rest).ok_or_else(|| DecodeError::BadBasename {
        text: rest.to_string(),
    })?;
    let basename = decoded
        .strip_prefix('/')
        .ok_or_else(|| DecodeError::BadBasename {
            text: decoded.clone(),
        })?
        .to_string();
    Ok(EntryLink { gfid, basename })
}

fn next_token<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<&'a str, DecodeError> {
    tokens.next().ok_or(DecodeError::Truncated)
}

fn parse_u32(text: &str) -> Result<u32, DecodeError> {
    text.parse().map_err(|_| DecodeError::BadInteger {
        text: text.to_string(),
    })
}

fn parse_fop_name(text: &str) -> Result<FopCode, DecodeError> {
    FopCode::from_name(text).ok_or_else(|| DecodeError::UnknownFop {
        code: text.to_string(),
    })
}

/// Encodes `record` in BINARY form: raw 16-byte gfids, little-endian
/// `u32` integers, raw (non-percent-encoded) basenames, all joined by NUL
/// and terminated by one more NUL (spec.md §3: "in binary form gfids are
/// 16 raw bytes").
pub fn encode_binary(record: &ChangeRecord) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    match record {
        ChangeRecord::Data { gfid } => {
            out.push(b'D');
            out.extend_from_slice(gfid.as_bytes());
        }
        ChangeRecord::Metadata { gfid, fop } => {
            out.push(b'M');
            out.extend_from_slice(gfid.as_bytes());
            push_sep(&mut out);
            out.extend_from_slice(&fop.code().to_le_bytes());
        }
        ChangeRecord::Entry {
            parent,
            fop,
            ownership,
            deleted_gfid,
            links,
            deleted_path,
        } => {
            out.push(b'E');
            out.extend_from_slice(parent.as_bytes());
            push_sep(&mut out);
            out.extend_from_slice(&fop.code().to_le_bytes());
            if let Some(o) = ownership {
                for v in [o.mode, o.uid, o.gid] {
                    push_sep(&mut out);
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
            if let Some(dg) = deleted_gfid {
                push_sep(&mut out);
                out.extend_from_slice(dg.as_bytes());
            }
            for link in links {
                push_sep(&mut out);
                out.extend_from_slice(link.gfid.as_bytes());
                push_sep(&mut out);
                out.extend_from_slice(link.basename.as_bytes());
            }
            // Presence of `deleted_path` is config-driven (`capture_del_path`),
            // independent of the fop code, so it can't be inferred from
            // content alone the way every other field here can — an explicit
            // flag byte lets `binary_record_len` find the record boundary
            // without scanning raw path bytes that may contain anything.
            if matches!(fop, FopCode::Unlink | FopCode::Rmdir) {
                push_sep(&mut out);
                match deleted_path {
                    Some(path) => {
                        out.push(1);
                        out.extend_from_slice(path.as_bytes());
                    }
                    None => out.push(0),
                }
            }
        }
    }
    out.push(RECORD_TERMINATOR);
    Ok(out)
}

fn push_sep(out: &mut Vec<u8>) {
    out.push(RECORD_TERMINATOR);
}

/// Decodes one BINARY record, NUL-split fields, fixed-size gfid/integer
/// fields consumed positionally rather than scanned.
pub fn decode_binary(bytes: &[u8]) -> Result<ChangeRecord, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Truncated);
    }
    let mark = bytes[0] as char;
    let rest = &bytes[1..];
    match mark {
        'D' => {
            let gfid = Gfid::parse_binary(rest)?;
            Ok(ChangeRecord::Data { gfid })
        }
        'M' => {
            let (gfid_bytes, tail) = split_fixed(rest, 16)?;
            let gfid = Gfid::parse_binary(gfid_bytes)?;
            let (_, tail) = split_nul(tail)?; // consume the separator NUL
            let fop = parse_fop_code(tail)?;
            Ok(ChangeRecord::Metadata { gfid, fop })
        }
        'E' => decode_binary_entry(rest),
        other => Err(DecodeError::BadTypeMark { mark: other }),
    }
}

fn decode_binary_entry(rest: &[u8]) -> Result<ChangeRecord, DecodeError> {
    let (parent_bytes, tail) = split_fixed(rest, 16)?;
    let parent = Gfid::parse_binary(parent_bytes)?;
    let (_, tail) = split_nul(tail)?;
    let (fop_bytes, mut tail) = split_fixed(tail, 4)?;
    let fop = parse_fop_code(fop_bytes)?;

    let ownership = if fop.nr_extra_recs() > 0 {
        let mut values = [0u32; 3];
        for v in values.iter_mut() {
            let (_, t) = split_nul(tail)?;
            let (b, t) = split_fixed(t, 4)?;
            *v = u32::from_le_bytes(b.try_into().unwrap());
            tail = t;
        }
        Some(ModeOwnership {
            mode: values[0],
            uid: values[1],
            gid: values[2],
        })
    } else {
        None
    };

    let is_delete = matches!(fop, FopCode::Unlink | FopCode::Rmdir);
    let deleted_gfid = if is_delete {
        let (_, t) = split_nul(tail)?;
        let (b, t) = split_fixed(t, 16)?;
        tail = t;
        Some(Gfid::parse_binary(b)?)
    } else {
        None
    };

    let nr_links = fop.nr_gfids().max(1);
    let mut links = Vec::with_capacity(nr_links);
    for _ in 0..nr_links {
        let (_, t) = split_nul(tail)?;
        let (gfid_bytes, t) = split_fixed(t, 16)?;
        let gfid = Gfid::parse_binary(gfid_bytes)?;
        let (_, t) = split_nul(t)?;
        let (basename_bytes, t) = split_until_nul(t)?;
        let basename = String::from_utf8(basename_bytes.to_vec())
            .map_err(|_| DecodeError::BadBasename {
                text: "<invalid utf8>".to_string(),
            })?;
        links.push(EntryLink { gfid, basename });
        tail = t;
    }

    let deleted_path = if is_delete {
        let (_, t) = split_nul(tail)?; // separator before the presence flag
        let (flag, t) = split_fixed(t, 1)?;
        match flag[0] {
            0 => None,
            1 => Some(String::from_utf8_lossy(t).into_owned()),
            other => return Err(DecodeError::BadDeletedPathFlag { value: other }),
        }
    } else {
        None
    };

    Ok(ChangeRecord::Entry {
        parent,
        fop,
        ownership,
        deleted_gfid,
        links,
        deleted_path,
    })
}

/// Finds the length of one complete BINARY record (type mark through the
/// trailing terminator, inclusive) at the start of `bytes`, without ever
/// scanning a fixed-width field for NUL — raw gfids and little-endian
/// integers may legitimately contain a `0x00` byte, so unlike ASCII, BINARY
/// cannot be framed by splitting on every NUL (`gf_changelog_parse_binary`
/// walks the same field-count tables positionally for the same reason).
/// Returns `Ok(None)` when `bytes` doesn't yet hold a full record, which a
/// chunked reader takes as "read more before trying again".
pub fn binary_record_len(bytes: &[u8]) -> Result<Option<usize>, DecodeError> {
    let Some(&mark) = bytes.first() else {
        return Ok(None);
    };
    let mut pos = 1usize;

    macro_rules! take {
        ($n:expr) => {{
            let end = pos + $n;
            if bytes.len() < end {
                return Ok(None);
            }
            pos = end;
        }};
    }

    match mark {
        b'D' => take!(16),
        b'M' => {
            take!(16); // gfid
            take!(1); // separator
            take!(4); // fop code
        }
        b'E' => {
            take!(16); // parent gfid
            take!(1); // separator
            take!(4); // fop code
            let fop = parse_fop_code(&bytes[pos - 4..pos])?;

            if fop.nr_extra_recs() > 0 {
                for _ in 0..3 {
                    take!(1);
                    take!(4);
                }
            }

            let is_delete = matches!(fop, FopCode::Unlink | FopCode::Rmdir);
            if is_delete {
                take!(1); // separator
                take!(16); // deleted gfid
            }

            for _ in 0..fop.nr_gfids().max(1) {
                take!(1); // separator before link gfid
                take!(16); // link gfid
                take!(1); // separator before basename
                // basenames can't contain a raw NUL on any POSIX filesystem,
                // so this is the one field safe to scan rather than skip.
                let Some(rel) = bytes[pos..].iter().position(|&b| b == 0) else {
                    return Ok(None);
                };
                pos += rel;
            }

            if is_delete {
                take!(1); // separator before the presence flag
                take!(1); // the flag byte
                match bytes[pos - 1] {
                    0 => {}
                    1 => {
                        let Some(rel) = bytes[pos..].iter().position(|&b| b == 0) else {
                            return Ok(None);
                        };
                        pos += rel;
                    }
                    other => return Err(DecodeError::BadDeletedPathFlag { value: other }),
                }
            }
        }
        other => return Err(DecodeError::BadTypeMark { mark: other as char }),
    }

    take!(1); // the record terminator
    Ok(Some(pos))
}

fn split_fixed(bytes: &[u8], n: usize) -> Result<(&[u8], &[u8]), DecodeError> {
    if bytes.len() < n {
        return Err(DecodeError::Truncated);
    }
    Ok(bytes.split_at(n))
}

fn split_nul(bytes: &[u8]) -> Result<(&[u8], &[u8]), DecodeError> {
    split_fixed(bytes, 1)
}

fn split_until_nul(bytes: &[u8]) -> Result<(&[u8], &[u8]), DecodeError> {
    match bytes.iter().position(|&b| b == 0) {
        Some(i) => Ok((&bytes[..i], &bytes[i..])),
        None => Err(DecodeError::MissingTerminator),
    }
}

fn parse_fop_code(bytes: &[u8]) -> Result<FopCode, DecodeError> {
    let arr: [u8; 4] = bytes.try_into().map_err(|_| DecodeError::Truncated)?;
    let code = u32::from_le_bytes(arr);
    FopCode::from_code(code).ok_or(DecodeError::UnknownFop {
        code: code.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ModeOwnership;

    fn gfid(byte: u8) -> Gfid {
        Gfid::from_bytes([byte; 16])
    }

    #[test]
    fn ascii_data_record_matches_grammar() {
        let record = ChangeRecord::Data { gfid: gfid(2) };
        let bytes = encode_ascii(&record).unwrap();
        assert_eq!(bytes.last(), Some(&0u8));
        let text = std::str::from_utf8(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(text, format!("D {}", gfid(2)));
        assert_eq!(decode_ascii(&bytes[..bytes.len() - 1]).unwrap(), record);
    }

    #[test]
    fn ascii_metadata_never_has_extras() {
        let record = ChangeRecord::Metadata {
            gfid: gfid(2),
            fop: FopCode::Setxattr,
        };
        let bytes = encode_ascii(&record).unwrap();
        let text = std::str::from_utf8(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(text, format!("M {} SETXATTR", gfid(2)));
    }

    #[test]
    fn ascii_mkdir_matches_s1() {
        // spec.md S1: mkdir("/d", gfid=G1, parent=G0)
        let parent = gfid(0);
        let own_gfid = gfid(1);
        let record = ChangeRecord::Entry {
            parent,
            fop: FopCode::Mkdir,
            ownership: Some(ModeOwnership {
                mode: 0o755,
                uid: 1000,
                gid: 1000,
            }),
            deleted_gfid: None,
            links: vec![EntryLink {
                gfid: own_gfid,
                basename: "d".to_string(),
            }],
            deleted_path: None,
        };
        let bytes = encode_ascii(&record).unwrap();
        let text = std::str::from_utf8(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(
            text,
            format!("E {parent} MKDIR 493 1000 1000 {own_gfid}%2Fd")
        );
        assert_eq!(decode_ascii(&bytes[..bytes.len() - 1]).unwrap(), record);
    }

    #[test]
    fn ascii_create_matches_s1() {
        // spec.md S1: create("/d/f", gfid=G2, parent=G1, mode=0100644, uid=1000, gid=1000)
        let parent = gfid(1);
        let own_gfid = gfid(2);
        let record = ChangeRecord::Entry {
            parent,
            fop: FopCode::Create,
            ownership: Some(ModeOwnership {
                mode: 0o100644,
                uid: 1000,
                gid: 1000,
            }),
            deleted_gfid: None,
            links: vec![EntryLink {
                gfid: own_gfid,
                basename: "f".to_string(),
            }],
            deleted_path: None,
        };
        let bytes = encode_ascii(&record).unwrap();
        let text = std::str::from_utf8(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(
            text,
            format!("E {parent} CREATE 33188 1000 1000 {own_gfid}%2Ff")
        );
    }

    #[test]
    fn ascii_rename_matches_s3() {
        let parent = gfid(1);
        let record = ChangeRecord::Entry {
            parent,
            fop: FopCode::Rename,
            ownership: None,
            deleted_gfid: None,
            links: vec![
                EntryLink {
                    gfid: parent,
                    basename: "a".to_string(),
                },
                EntryLink {
                    gfid: parent,
                    basename: "b".to_string(),
                },
            ],
            deleted_path: None,
        };
        let bytes = encode_ascii(&record).unwrap();
        let text = std::str::from_utf8(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(text, format!("E {parent} RENAME {parent}%2Fa {parent}%2Fb"));
        assert_eq!(decode_ascii(&bytes[..bytes.len() - 1]).unwrap(), record);
    }

    #[test]
    fn ascii_unlink_matches_s4_with_and_without_capture() {
        let parent = gfid(1);
        let deleted = gfid(2);
        let with_capture = ChangeRecord::Entry {
            parent,
            fop: FopCode::Unlink,
            ownership: None,
            deleted_gfid: Some(deleted),
            links: vec![EntryLink {
                gfid: parent,
                basename: "f".to_string(),
            }],
            deleted_path: Some("/d/f".to_string()),
        };
        let bytes = encode_ascii(&with_capture).unwrap();
        let text = std::str::from_utf8(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(
            text,
            format!("E {parent} UNLINK {deleted} {parent}%2Ff /d/f")
        );

        let without_capture = {
            let mut record = with_capture.clone();
            if let ChangeRecord::Entry { deleted_path, .. } = &mut record {
                *deleted_path = None;
            }
            record
        };
        let bytes = encode_ascii(&without_capture).unwrap();
        let text = std::str::from_utf8(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(text, format!("E {parent} UNLINK {deleted} {parent}%2Ff"));
        assert_eq!(decode_ascii(&bytes[..bytes.len() - 1]).unwrap(), without_capture);
    }

    #[test]
    fn binary_round_trips_every_shape() {
        let parent = gfid(1);
        let cases = vec![
            ChangeRecord::Data { gfid: gfid(9) },
            ChangeRecord::Metadata {
                gfid: gfid(9),
                fop: FopCode::Setattr,
            },
            ChangeRecord::Entry {
                parent,
                fop: FopCode::Mknod,
                ownership: Some(ModeOwnership {
                    mode: 0o100644,
                    uid: 0,
                    gid: 0,
                }),
                deleted_gfid: None,
                links: vec![EntryLink {
                    gfid: gfid(3),
                    basename: "dev".to_string(),
                }],
                deleted_path: None,
            },
            ChangeRecord::Entry {
                parent,
                fop: FopCode::Rename,
                ownership: None,
                deleted_gfid: None,
                links: vec![
                    EntryLink {
                        gfid: parent,
                        basename: "a".to_string(),
                    },
                    EntryLink {
                        gfid: parent,
                        basename: "b".to_string(),
                    },
                ],
                deleted_path: None,
            },
            ChangeRecord::Entry {
                parent,
                fop: FopCode::Unlink,
                ownership: None,
                deleted_gfid: Some(gfid(5)),
                links: vec![EntryLink {
                    gfid: parent,
                    basename: "f".to_string(),
                }],
                deleted_path: Some("/d/f".to_string()),
            },
        ];
        for case in cases {
            let bytes = encode_binary(&case).unwrap();
            assert_eq!(bytes.last(), Some(&0u8));
            let decoded = decode_binary(&bytes[..bytes.len() - 1]).unwrap();
            assert_eq!(decoded, case);
        }
    }

    #[test]
    fn decode_ascii_rejects_unknown_type_mark() {
        assert!(decode_ascii(b"Q foo").is_err());
    }

    #[test]
    fn decode_binary_rejects_truncated_gfid() {
        assert!(decode_binary(b"D\x01\x02").is_err());
    }

    #[test]
    fn binary_record_len_frames_every_shape_including_raw_nul_fields() {
        let parent = gfid(1);
        // gfid(0) is sixteen raw zero bytes — exactly the kind of embedded
        // NUL a naive framer would mistake for a record boundary.
        let cases = vec![
            ChangeRecord::Data { gfid: gfid(0) },
            ChangeRecord::Metadata {
                gfid: gfid(0),
                fop: FopCode::Setattr,
            },
            ChangeRecord::Entry {
                parent: gfid(0),
                fop: FopCode::Mknod,
                ownership: Some(ModeOwnership {
                    mode: 0,
                    uid: 0,
                    gid: 0,
                }),
                deleted_gfid: None,
                links: vec![EntryLink {
                    gfid: gfid(0),
                    basename: "dev".to_string(),
                }],
                deleted_path: None,
            },
            ChangeRecord::Entry {
                parent,
                fop: FopCode::Unlink,
                ownership: None,
                deleted_gfid: Some(gfid(0)),
                links: vec![EntryLink {
                    gfid: parent,
                    basename: "f".to_string(),
                }],
                deleted_path: Some("/d/f".to_string()),
            },
            ChangeRecord::Entry {
                parent,
                fop: FopCode::Rmdir,
                ownership: None,
                deleted_gfid: Some(gfid(0)),
                links: vec![EntryLink {
                    gfid: parent,
                    basename: "d".to_string(),
                }],
                deleted_path: None,
            },
        ];
        for case in cases {
            let bytes = encode_binary(&case).unwrap();
            let len = binary_record_len(&bytes).unwrap();
            assert_eq!(len, Some(bytes.len()), "case {case:?}");
            let decoded = decode_binary(&bytes[..bytes.len() - 1]).unwrap();
            assert_eq!(decoded, case);
        }
    }

    #[test]
    fn binary_record_len_reports_none_on_partial_buffer() {
        let record = ChangeRecord::Data { gfid: gfid(9) };
        let bytes = encode_binary(&record).unwrap();
        for cut in 0..bytes.len() {
            assert_eq!(binary_record_len(&bytes[..cut]).unwrap(), None);
        }
        assert_eq!(binary_record_len(&bytes).unwrap(), Some(bytes.len()));
    }

    #[test]
    fn binary_record_len_two_records_back_to_back() {
        let a = encode_binary(&ChangeRecord::Data { gfid: gfid(0) }).unwrap();
        let b = encode_binary(&ChangeRecord::Data { gfid: gfid(9) }).unwrap();
        let mut stream = a.clone();
        stream.extend_from_slice(&b);

        let first_len = binary_record_len(&stream).unwrap().unwrap();
        assert_eq!(first_len, a.len());
        let second_len = binary_record_len(&stream[first_len..]).unwrap().unwrap();
        assert_eq!(second_len, b.len());
    }

    #[test]
    fn decode_binary_entry_rejects_bad_deleted_path_flag() {
        let parent = gfid(1);
        let record = ChangeRecord::Entry {
            parent,
            fop: FopCode::Unlink,
            ownership: None,
            deleted_gfid: Some(gfid(5)),
            links: vec![EntryLink {
                gfid: parent,
                basename: "f".to_string(),
            }],
            deleted_path: None,
        };
        let mut bytes = encode_binary(&record).unwrap();
        // flip the presence flag (the byte just before the final terminator)
        // to an invalid value.
        let flag_idx = bytes.len() - 2;
        assert_eq!(bytes[flag_idx], 0);
        bytes[flag_idx] = 7;
        let err = decode_binary(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err, DecodeError::BadDeletedPathFlag { value: 7 });
    }
}
