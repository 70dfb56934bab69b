use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Guard against corrupt length prefixes; records are small metadata blobs.
pub const MAX_RECORD_LEN: u32 = 1 << 20;

/// Per-entry metadata written inline before the payload: a u32-LE length
/// prefix followed by the CBOR body. The same fields are mirrored in the
/// trailer directory so multi-volume readers never have to scan.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EntryRecord {
    pub path: String,
    pub is_dir: bool,
    /// Uncompressed payload size.
    pub u_size: u64,
    /// Encoded (compressed, possibly encrypted) payload size on disk.
    pub c_size: u64,
    pub mtime: i64,
    /// CRC-32 of the uncompressed payload.
    pub crc32: u32,
    pub codec: u8,
    pub encrypted: bool,
    /// One-way password verifier; present only when `encrypted`.
    pub verifier: Option<[u8; 32]>,
}

impl EntryRecord {
    /// Serialize as length prefix + CBOR. Returns total bytes written.
    pub fn write_to(&self, mut w: impl Write) -> Result<u64> {
        let mut body = Vec::new();
        ciborium::ser::into_writer(self, &mut body)
            .map_err(|e| EngineError::Format(format!("entry record encode: {e}")))?;
        let len = body.len() as u32;
        w.write_all(&len.to_le_bytes())?;
        w.write_all(&body)?;
        Ok(4 + body.len() as u64)
    }

    pub fn read_from(mut r: impl Read) -> Result<Self> {
        let mut lbuf = [0u8; 4];
        r.read_exact(&mut lbuf)?;
        let len = u32::from_le_bytes(lbuf);
        if len == 0 || len > MAX_RECORD_LEN {
            return Err(EngineError::Format(format!(
                "implausible entry record length {len}"
            )));
        }
        let mut body = vec![0u8; len as usize];
        r.read_exact(&mut body)?;
        ciborium::de::from_reader(&body[..])
            .map_err(|e| EngineError::Format(format!("entry record decode: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn record_roundtrips_through_prefix_framing() {
        let rec = EntryRecord {
            path: "sub/b.txt".into(),
            is_dir: false,
            u_size: 20480,
            c_size: 310,
            mtime: 1_700_000_000,
            crc32: 0xDEADBEEF,
            codec: 1,
            encrypted: true,
            verifier: Some([3u8; 32]),
        };
        let mut buf = Vec::new();
        let n = rec.write_to(&mut buf).unwrap();
        assert_eq!(n as usize, buf.len());

        let back = EntryRecord::read_from(Cursor::new(&buf)).unwrap();
        assert_eq!(back.path, "sub/b.txt");
        assert_eq!(back.c_size, 310);
        assert_eq!(back.verifier, Some([3u8; 32]));
    }

    #[test]
    fn rejects_implausible_length() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_RECORD_LEN + 1).to_le_bytes());
        assert!(EntryRecord::read_from(Cursor::new(&buf)).is_err());
    }
}
