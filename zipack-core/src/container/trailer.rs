use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom, Write};

pub const TAIL_MAGIC: [u8; 8] = *b"ZPAKTAIL";
/// Fixed footer at the very end of the final volume:
/// u64-LE trailer length followed by the magic.
pub const TAIL_LEN: u64 = 16;

/// Directory entry: where an entry's payload starts and everything needed
/// to decode it without touching the inline record.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrailerEntry {
    pub path: String,
    pub is_dir: bool,
    /// 1-based volume holding the first payload byte.
    pub volume: u32,
    /// Payload offset within that volume.
    pub offset: u64,
    pub u_size: u64,
    pub c_size: u64,
    pub mtime: i64,
    pub crc32: u32,
    pub codec: u8,
    pub encrypted: bool,
    pub verifier: Option<[u8; 32]>,
}

/// Appended once to the final volume: the entry directory, the whole-archive
/// checksum over the uncompressed logical stream, and the volume geometry
/// needed to reconstruct a split archive.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Trailer {
    pub entries: Vec<TrailerEntry>,
    /// CRC-32 of the concatenated uncompressed entry payloads, in entry order.
    pub crc32: u32,
    pub total_u: u64,
    pub total_c: u64,
    pub volume_count: u32,
    /// Capacity used when splitting; 0 for a single-file archive.
    pub volume_capacity: u64,
}

impl Trailer {
    /// Layout: [CBOR body][len u64-LE][TAIL_MAGIC]. Returns bytes written.
    pub fn write_to(&self, mut w: impl Write) -> Result<u64> {
        let mut body = Vec::new();
        ciborium::ser::into_writer(self, &mut body)
            .map_err(|e| EngineError::Format(format!("trailer encode: {e}")))?;
        w.write_all(&body)?;
        w.write_all(&(body.len() as u64).to_le_bytes())?;
        w.write_all(&TAIL_MAGIC)?;
        Ok(body.len() as u64 + TAIL_LEN)
    }

    /// Locate and parse the trailer from the end of the final volume.
    /// Also returns the offset where entry data ends (= trailer start).
    pub fn read_at_eof<F: Read + Seek>(f: &mut F) -> Result<(Trailer, u64)> {
        let len = f.seek(SeekFrom::End(0))?;
        if len < TAIL_LEN {
            return Err(EngineError::Format("file too small for trailer".into()));
        }
        f.seek(SeekFrom::End(-(TAIL_LEN as i64)))?;
        let mut lbuf = [0u8; 8];
        f.read_exact(&mut lbuf)?;
        let body_len = u64::from_le_bytes(lbuf);
        let mut magic = [0u8; 8];
        f.read_exact(&mut magic)?;
        if magic != TAIL_MAGIC {
            return Err(EngineError::Format("missing trailer magic".into()));
        }
        if body_len > len - TAIL_LEN {
            return Err(EngineError::Format("implausible trailer length".into()));
        }
        let data_end = len - TAIL_LEN - body_len;
        f.seek(SeekFrom::Start(data_end))?;
        let mut body = vec![0u8; body_len as usize];
        f.read_exact(&mut body)?;
        let trailer: Trailer = ciborium::de::from_reader(&body[..])
            .map_err(|e| EngineError::Format(format!("trailer decode: {e}")))?;
        Ok((trailer, data_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Trailer {
        Trailer {
            entries: vec![TrailerEntry {
                path: "a.txt".into(),
                is_dir: false,
                volume: 1,
                offset: 42,
                u_size: 10240,
                c_size: 128,
                mtime: 0,
                crc32: 1,
                codec: 1,
                encrypted: false,
                verifier: None,
            }],
            crc32: 0xCAFEBABE,
            total_u: 10240,
            total_c: 128,
            volume_count: 1,
            volume_capacity: 0,
        }
    }

    #[test]
    fn locates_trailer_after_arbitrary_data() {
        let mut buf = Cursor::new(Vec::new());
        buf.write_all(b"leading entry data of any shape").unwrap();
        let data_end = buf.position();
        sample().write_to(&mut buf).unwrap();

        let (back, end) = Trailer::read_at_eof(&mut buf).unwrap();
        assert_eq!(end, data_end);
        assert_eq!(back.crc32, 0xCAFEBABE);
        assert_eq!(back.entries.len(), 1);
        assert_eq!(back.entries[0].offset, 42);
    }

    #[test]
    fn truncated_file_is_a_format_error() {
        let mut buf = Cursor::new(vec![0u8; 4]);
        assert!(matches!(
            Trailer::read_at_eof(&mut buf),
            Err(EngineError::Format(_))
        ));
    }

    #[test]
    fn garbage_tail_is_a_format_error() {
        let mut buf = Cursor::new(vec![0u8; 64]);
        assert!(matches!(
            Trailer::read_at_eof(&mut buf),
            Err(EngineError::Format(_))
        ));
    }
}
