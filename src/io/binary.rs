//! Chunked binary container (GLB) framing.
//!
//! Layout: a 12-byte header (magic, version, total length) followed by
//! 8-byte-prefixed chunks. The JSON chunk comes first, padded to a 4-byte
//! boundary with spaces; the optional binary chunk follows, padded with
//! zeros. https://www.khronos.org/registry/glTF/specs/2.0/glTF-2.0.html

use std::io::Cursor;

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::{Error, Result};

pub const MAGIC: u32 = 0x4654_6C67;
pub const VERSION: u32 = 2;
/// "JSON", packed little-endian.
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
/// "BIN\0", packed little-endian.
pub const CHUNK_BIN: u32 = 0x004E_4942;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

/// Detection heuristic: the first two little-endian u32 values must match
/// the magic constant and supported version.
pub fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_LEN {
        return false;
    }
    let mut reader = Cursor::new(bytes);
    let magic = reader.read_u32::<LE>().unwrap_or(0);
    let version = reader.read_u32::<LE>().unwrap_or(0);
    magic == MAGIC && version == VERSION
}

/// Frames a JSON payload and an optional binary payload into one container.
pub fn encode(json: &[u8], bin: Option<&[u8]>) -> Result<Vec<u8>> {
    let mut length = HEADER_LEN + CHUNK_HEADER_LEN + padded(json.len());
    if let Some(bin) = bin {
        length += CHUNK_HEADER_LEN + padded(bin.len());
    }

    let mut bytes = Vec::with_capacity(length);
    bytes.write_u32::<LE>(MAGIC)?;
    bytes.write_u32::<LE>(VERSION)?;
    bytes.write_u32::<LE>(length as u32)?;

    bytes.write_u32::<LE>(padded(json.len()) as u32)?;
    bytes.write_u32::<LE>(CHUNK_JSON)?;
    bytes.extend_from_slice(json);
    bytes.resize(bytes.len() + padded(json.len()) - json.len(), b' ');

    if let Some(bin) = bin {
        bytes.write_u32::<LE>(padded(bin.len()) as u32)?;
        bytes.write_u32::<LE>(CHUNK_BIN)?;
        bytes.extend_from_slice(bin);
        bytes.resize(bytes.len() + padded(bin.len()) - bin.len(), 0);
    }

    Ok(bytes)
}

/// Unwraps a container into its JSON text and optional binary payload.
///
/// The binary chunk may be absent entirely (a document with no buffer
/// data). The binary payload is returned as stored, including alignment
/// padding; consumers slice it to the buffer length declared in the JSON.
pub fn decode(bytes: &[u8]) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::Malformed("container shorter than its header".into()));
    }
    let mut reader = Cursor::new(bytes);
    let magic = reader.read_u32::<LE>()?;
    if magic != MAGIC {
        return Err(Error::Malformed(format!(
            "bad container magic {:#010x}",
            magic
        )));
    }
    let version = reader.read_u32::<LE>()?;
    if version != VERSION {
        return Err(Error::Malformed(format!(
            "unsupported container version {}",
            version
        )));
    }
    let declared = reader.read_u32::<LE>()? as usize;
    let end = declared.min(bytes.len());

    let mut json: Option<Vec<u8>> = None;
    let mut bin: Option<Vec<u8>> = None;
    let mut offset = HEADER_LEN;
    while offset + CHUNK_HEADER_LEN <= end {
        let mut header = Cursor::new(&bytes[offset..]);
        let chunk_len = header.read_u32::<LE>()? as usize;
        let chunk_kind = header.read_u32::<LE>()?;
        let start = offset + CHUNK_HEADER_LEN;
        if start + chunk_len > end {
            return Err(Error::Malformed("chunk extends past container end".into()));
        }
        let data = &bytes[start..start + chunk_len];
        match chunk_kind {
            CHUNK_JSON => {
                if json.is_some() {
                    return Err(Error::Malformed("duplicate JSON chunk".into()));
                }
                if bin.is_some() {
                    return Err(Error::Malformed("JSON chunk must come first".into()));
                }
                // Strip the space padding; it is not part of the payload.
                let trimmed = data
                    .iter()
                    .rposition(|&b| b != b' ')
                    .map(|i| &data[..=i])
                    .unwrap_or(&[]);
                json = Some(trimmed.to_vec());
            }
            CHUNK_BIN => {
                if json.is_none() {
                    return Err(Error::Malformed("JSON chunk must come first".into()));
                }
                bin = Some(data.to_vec());
            }
            // Unknown chunk kinds are skipped.
            _ => {}
        }
        offset = start + chunk_len;
    }

    match json {
        Some(json) => Ok((json, bin)),
        None => Err(Error::Malformed("container has no JSON chunk".into())),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn chunk_layout_and_total_length() {
        let json = b"0123456789";
        let bin = b"emberz!";
        let bytes = encode(json, Some(bin)).unwrap();

        // 12-byte header + 8 + 12 (JSON padded) + 8 + 8 (binary padded).
        assert_eq!(48, bytes.len());
        let mut reader = Cursor::new(&bytes[..]);
        assert_eq!(MAGIC, reader.read_u32::<LE>().unwrap());
        assert_eq!(VERSION, reader.read_u32::<LE>().unwrap());
        assert_eq!(48, reader.read_u32::<LE>().unwrap());
        assert_eq!(12, reader.read_u32::<LE>().unwrap());
        assert_eq!(CHUNK_JSON, reader.read_u32::<LE>().unwrap());
        // JSON payload is space-padded.
        assert_eq!(b"0123456789  ".to_vec(), bytes[20..32].to_vec());
        let mut tail = Cursor::new(&bytes[32..]);
        assert_eq!(8, tail.read_u32::<LE>().unwrap());
        assert_eq!(CHUNK_BIN, tail.read_u32::<LE>().unwrap());
        // Binary payload is zero-padded.
        assert_eq!(b"emberz!\0".to_vec(), bytes[40..48].to_vec());

        let (json_out, bin_out) = decode(&bytes).unwrap();
        assert_eq!(json.to_vec(), json_out);
        let bin_out = bin_out.unwrap();
        assert_eq!(bin.to_vec(), bin_out[..bin.len()].to_vec());
    }

    #[test]
    fn tolerates_missing_binary_chunk() {
        let bytes = encode(b"{}", None).unwrap();
        let (json, bin) = decode(&bytes).unwrap();
        assert_eq!(b"{}".to_vec(), json);
        assert_eq!(None, bin);
    }

    #[test]
    fn detects_binary_containers() {
        let bytes = encode(b"{}", None).unwrap();
        assert!(is_binary(&bytes));
        assert!(!is_binary(b"{ \"asset\": { \"version\": \"2.0\" } }"));
        assert!(!is_binary(b"glTF"));
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut bytes = encode(b"{}", None).unwrap();
        bytes[0] = b'x';
        assert!(matches!(decode(&bytes), Err(Error::Malformed(_))));

        let mut bytes = encode(b"{}", None).unwrap();
        bytes[4] = 3;
        assert!(matches!(decode(&bytes), Err(Error::Malformed(_))));
    }
}
