// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Segment file layout.
//!
//! One file per index directory:
//!
//! ```text
//! ┌──────────┬─────────┬──────────────┬──────────────────────┬───────────────┐
//! │ "TBLX"   │ version │ payload_len  │ payload (brotli JSON)│ crc32 "XLBT"  │
//! │ 4 bytes  │ 1 byte  │ u32 LE       │ payload_len bytes    │ 8 bytes       │
//! └──────────┴─────────┴──────────────┴──────────────────────┴───────────────┘
//! ```
//!
//! The footer is a CRC32 over everything before it plus the header magic
//! reversed. A wrong footer means the file got truncated or corrupted, and the
//! index refuses to open rather than serve partial results.
//!
//! Only stored documents are persisted. Postings are rebuilt on open, which
//! keeps the file format independent of analyzer internals. Since that makes
//! opening cost proportional to the corpus, readers that need to notice new
//! commits compare a [`SegmentStamp`] (read from the footer alone) instead of
//! reopening.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher as Crc32Hasher;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::SearchableDocument;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Magic bytes: "TBLX" in ASCII (header)
pub const MAGIC: [u8; 4] = *b"TBLX";

/// Footer magic: "XLBT" (reversed, marks valid file end)
pub const FOOTER_MAGIC: [u8; 4] = *b"XLBT";

pub const VERSION: u8 = 1;

/// Name of the segment file inside an index directory.
pub const SEGMENT_FILE: &str = "segment.tbx";

/// 4 (magic) + 1 (version) + 4 (payload length)
pub const HEADER_SIZE: usize = 9;

/// 4 (crc32) + 4 (magic)
pub const FOOTER_SIZE: usize = 8;

/// Brotli quality. 9 is most of the ratio of 11 at a fraction of the time.
const BROTLI_QUALITY: u32 = 9;
const BROTLI_LGWIN: u32 = 22;

// ============================================================================
// PAYLOAD
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentPayload {
    pub documents: Vec<SearchableDocument>,
}

/// Identifies one committed segment without decoding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentStamp {
    pub len: u64,
    pub crc32: u32,
}

pub fn segment_path(dir: &Path) -> PathBuf {
    dir.join(SEGMENT_FILE)
}

/// Compute CRC32 over the given bytes
pub fn compute_crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Serialize a payload into a complete segment image.
pub fn encode(payload: &SegmentPayload) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(payload)?;

    let mut compressed = Vec::new();
    {
        let mut encoder =
            brotli::CompressorWriter::new(&mut compressed, 4096, BROTLI_QUALITY, BROTLI_LGWIN);
        encoder.write_all(&json)?;
    }

    let payload_len = u32::try_from(compressed.len()).map_err(|_| {
        Error::Config(format!(
            "segment payload of {} bytes exceeds the 4 GiB format limit",
            compressed.len()
        ))
    })?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + compressed.len() + FOOTER_SIZE);
    buf.extend_from_slice(&MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&compressed);

    let crc32 = compute_crc32(&buf);
    buf.extend_from_slice(&crc32.to_le_bytes());
    buf.extend_from_slice(&FOOTER_MAGIC);
    Ok(buf)
}

/// Validate and decode a segment image. `path` only labels errors.
///
/// Checks, in order: minimum size, footer magic, CRC32, header magic,
/// version, payload length.
pub fn decode(bytes: &[u8], path: &Path) -> Result<SegmentPayload> {
    let corrupt = |reason: String| Error::CorruptIndex {
        path: path.to_path_buf(),
        reason,
    };

    let min_size = HEADER_SIZE + FOOTER_SIZE;
    if bytes.len() < min_size {
        return Err(corrupt(format!(
            "file too small: {} bytes (minimum {})",
            bytes.len(),
            min_size
        )));
    }

    let footer_start = bytes.len() - FOOTER_SIZE;
    if bytes[footer_start + 4..] != FOOTER_MAGIC {
        return Err(corrupt("invalid footer magic (truncated file?)".to_string()));
    }

    let stored = u32::from_le_bytes([
        bytes[footer_start],
        bytes[footer_start + 1],
        bytes[footer_start + 2],
        bytes[footer_start + 3],
    ]);
    let computed = compute_crc32(&bytes[..footer_start]);
    if stored != computed {
        return Err(corrupt(format!(
            "CRC32 mismatch: expected {:#010x}, got {:#010x}",
            stored, computed
        )));
    }

    if bytes[..4] != MAGIC {
        return Err(corrupt(format!("invalid magic: {:?}", &bytes[..4])));
    }
    if bytes[4] != VERSION {
        return Err(corrupt(format!(
            "unsupported version: {} (expected {})",
            bytes[4], VERSION
        )));
    }

    let payload_len = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) as usize;
    if HEADER_SIZE + payload_len != footer_start {
        return Err(corrupt(format!(
            "payload length {} does not match file size {}",
            payload_len,
            bytes.len()
        )));
    }

    let mut json = Vec::new();
    brotli::Decompressor::new(&bytes[HEADER_SIZE..footer_start], 4096)
        .read_to_end(&mut json)
        .map_err(|e| corrupt(format!("brotli: {}", e)))?;

    serde_json::from_slice(&json).map_err(|e| corrupt(format!("payload: {}", e)))
}

/// Read the segment in `dir`. `Ok(None)` when the directory holds no segment.
pub fn read_segment(dir: &Path) -> Result<Option<SegmentPayload>> {
    Ok(read_stamped_segment(dir)?.map(|(_, payload)| payload))
}

/// Like [`read_segment`], also returning the stamp of the bytes decoded.
pub fn read_stamped_segment(dir: &Path) -> Result<Option<(SegmentStamp, SegmentPayload)>> {
    let path = segment_path(dir);
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(&path)?;
    let payload = decode(&bytes, &path)?;
    let footer_start = bytes.len() - FOOTER_SIZE;
    let stamp = SegmentStamp {
        len: bytes.len() as u64,
        crc32: u32::from_le_bytes([
            bytes[footer_start],
            bytes[footer_start + 1],
            bytes[footer_start + 2],
            bytes[footer_start + 3],
        ]),
    };
    Ok(Some((stamp, payload)))
}

/// Stamp of the segment in `dir`, reading only its footer.
///
/// `Ok(None)` when there is no segment. A short file or a bad footer magic is
/// [`Error::CorruptIndex`]; the CRC itself is only verified on a full read.
pub fn read_stamp(dir: &Path) -> Result<Option<SegmentStamp>> {
    let path = segment_path(dir);
    let mut file = match File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let len = file.metadata()?.len();
    if len < (HEADER_SIZE + FOOTER_SIZE) as u64 {
        return Err(Error::CorruptIndex {
            path,
            reason: format!("file too small: {} bytes", len),
        });
    }

    let mut footer = [0u8; FOOTER_SIZE];
    file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
    file.read_exact(&mut footer)?;
    if footer[4..] != FOOTER_MAGIC {
        return Err(Error::CorruptIndex {
            path,
            reason: "invalid footer magic (truncated file?)".to_string(),
        });
    }
    Ok(Some(SegmentStamp {
        len,
        crc32: u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]),
    }))
}

/// Write the segment into `dir`, creating the directory if needed.
///
/// Goes through a temporary file and a rename so a crash mid-write leaves the
/// previous segment intact.
pub fn write_segment(dir: &Path, payload: &SegmentPayload) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let bytes = encode(payload)?;
    let path = segment_path(dir);
    let tmp = dir.join(format!("{}.tmp", SEGMENT_FILE));
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, &path)?;
    Ok(path)
}
