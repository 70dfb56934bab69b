use crate::error::{EngineError, Result};
use std::io::{Read, Write};

pub const MAGIC: &[u8; 6] = b"ZPAKAR";
pub const VERSION: u16 = 1;
pub const FLAG_ENCRYPTED: u16 = 1 << 0;

/// Fixed header at the head of volume 1: magic + version + flags + key salt.
pub const HEADER_LEN: u64 = 6 + 2 + 2 + 32;

#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    pub version: u16,
    pub flags: u16,
    /// Argon2 salt for the archive password; all-zero when unencrypted.
    pub key_salt: [u8; 32],
}

impl Superblock {
    pub fn write_to(&self, mut w: impl Write) -> Result<()> {
        w.write_all(MAGIC)?;
        w.write_all(&self.version.to_le_bytes())?;
        w.write_all(&self.flags.to_le_bytes())?;
        w.write_all(&self.key_salt)?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> Result<Self> {
        let mut magic = [0u8; 6];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(EngineError::Format("bad archive magic".into()));
        }
        let mut v = [0u8; 2];
        r.read_exact(&mut v)?;
        let version = u16::from_le_bytes(v);
        if version != VERSION {
            return Err(EngineError::Format(format!(
                "unsupported archive version {version}"
            )));
        }
        let mut fl = [0u8; 2];
        r.read_exact(&mut fl)?;
        let flags = u16::from_le_bytes(fl);
        let mut key_salt = [0u8; 32];
        r.read_exact(&mut key_salt)?;
        Ok(Self {
            version,
            flags,
            key_salt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_len_matches_layout() {
        let sb = Superblock {
            version: VERSION,
            flags: FLAG_ENCRYPTED,
            key_salt: [9u8; 32],
        };
        let mut buf = Vec::new();
        sb.write_to(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, HEADER_LEN);

        let back = Superblock::read_from(Cursor::new(&buf)).unwrap();
        assert_eq!(back.flags, FLAG_ENCRYPTED);
        assert_eq!(back.key_salt, [9u8; 32]);
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = vec![0u8; HEADER_LEN as usize];
        assert!(Superblock::read_from(Cursor::new(&buf)).is_err());
    }
}
