use crate::codec;
use crate::config::JobConfig;
use crate::container::record::EntryRecord;
use crate::container::superblock::{HEADER_LEN, Superblock};
use crate::container::trailer::{Trailer, TrailerEntry};
use crate::crypto::cipher::{ChaChaCipher, EntryCipher};
use crate::error::{EngineError, EntryFailure, Result};
use crate::progress::{Coordinator, Phase};
use crate::volume::{VolumeChain, locate_volumes};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

/// What a full pass over an archive produced. `computed_crc` is `None`
/// whenever at least one entry was skipped or failed, because the
/// whole-archive stream is incomplete in that case and the comparison
/// would be meaningless.
#[derive(Debug)]
pub struct ReadOutcome {
    pub failed: Vec<EntryFailure>,
    pub archive_crc: u32,
    pub computed_crc: Option<u32>,
    pub total_u: u64,
    /// Physical bytes across all volumes on disk.
    pub physical: u64,
    pub entry_count: usize,
    pub volume_count: u32,
}

impl ReadOutcome {
    pub fn checksum_ok(&self) -> bool {
        self.computed_crc == Some(self.archive_crc)
    }
}

/// Reject absolute paths and any `..` component before joining under the
/// destination root. Archives are untrusted input.
fn safe_join(root: &Path, rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);
    if p.is_absolute()
        || p.components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(EngineError::UnsafePath(rel.to_string()));
    }
    Ok(root.join(p))
}

struct EntryMeta {
    path: String,
    is_dir: bool,
    u_size: u64,
    c_size: u64,
    crc32: u32,
    codec: u8,
    encrypted: bool,
    verifier: Option<[u8; 32]>,
    index: u64,
}

impl EntryMeta {
    fn from_record(rec: &EntryRecord, index: u64) -> Self {
        Self {
            path: rec.path.clone(),
            is_dir: rec.is_dir,
            u_size: rec.u_size,
            c_size: rec.c_size,
            crc32: rec.crc32,
            codec: rec.codec,
            encrypted: rec.encrypted,
            verifier: rec.verifier,
            index,
        }
    }

    fn from_trailer(te: &TrailerEntry, index: u64) -> Self {
        Self {
            path: te.path.clone(),
            is_dir: te.is_dir,
            u_size: te.u_size,
            c_size: te.c_size,
            crc32: te.crc32,
            codec: te.codec,
            encrypted: te.encrypted,
            verifier: te.verifier,
            index,
        }
    }
}

/// Write adapter under the codec on the way out: feeds the destination (or
/// a sink when verifying), accumulates both checksums, counts bytes and
/// reports progress. Cancellation surfaces as an I/O error mid-entry.
struct DecodeSink<'a, W: Write> {
    inner: W,
    coord: &'a Coordinator,
    whole: &'a mut crc32fast::Hasher,
    entry: &'a mut crc32fast::Hasher,
    n: &'a mut u64,
}

impl<W: Write> Write for DecodeSink<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.coord.is_cancelled() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "job cancelled",
            ));
        }
        let n = self.inner.write(buf)?;
        self.whole.update(&buf[..n]);
        self.entry.update(&buf[..n]);
        *self.n += n as u64;
        self.coord.add(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

struct ReadState<'a> {
    dest: Option<&'a Path>,
    password: Option<&'a str>,
    cipher: ChaChaCipher,
    coord: &'a Coordinator,
    whole: crc32fast::Hasher,
    failed: Vec<EntryFailure>,
    /// Set when any entry's payload did not flow through `whole`.
    skipped: bool,
}

impl ReadState<'_> {
    fn fail(&mut self, path: &str, reason: &str) {
        self.failed.push(EntryFailure {
            path: path.to_string(),
            reason: reason.to_string(),
        });
        self.skipped = true;
        self.coord.log(&format!("skipped {path}: {reason}"));
    }

    /// Whether this entry's payload can be decoded at all. Failures are
    /// recorded and the caller skips the payload bytes.
    fn password_gate(&mut self, meta: &EntryMeta) -> bool {
        if !meta.encrypted {
            return true;
        }
        let Some(pw) = self.password else {
            self.fail(&meta.path, &EngineError::PasswordRequired.to_string());
            return false;
        };
        match &meta.verifier {
            Some(token) if !self.cipher.check(token, pw) => {
                self.fail(&meta.path, &EngineError::WrongPassword.to_string());
                false
            }
            _ => true,
        }
    }

    /// Decode one non-directory entry from its on-disk payload. Fatal errors
    /// (destination I/O, unsafe paths, cancellation) propagate; anything
    /// attributable to this entry alone is recorded and swallowed.
    fn decode_entry(&mut self, meta: &EntryMeta, payload: Vec<u8>) -> Result<()> {
        let compressed = if meta.encrypted {
            // gate already passed, so a password is present
            let pw = self.password.ok_or(EngineError::PasswordRequired)?;
            match self.cipher.decrypt(&payload, pw, meta.index) {
                Ok(p) => p,
                Err(_) => {
                    self.fail(&meta.path, "decryption failed (corrupt or tampered)");
                    return Ok(());
                }
            }
        } else {
            payload
        };

        let Some(compressor) = codec::by_id(meta.codec) else {
            self.fail(&meta.path, &format!("unknown codec id {}", meta.codec));
            return Ok(());
        };

        let out_path = match self.dest {
            Some(root) => {
                let p = safe_join(root, &meta.path)?;
                if let Some(parent) = p.parent() {
                    fs::create_dir_all(parent)?;
                }
                Some(p)
            }
            None => None,
        };

        let mut entry_crc = crc32fast::Hasher::new();
        let mut written = 0u64;
        let res = {
            let mut src = &compressed[..];
            match &out_path {
                Some(p) => {
                    let mut f = File::create(p)?;
                    let mut sink = DecodeSink {
                        inner: &mut f,
                        coord: self.coord,
                        whole: &mut self.whole,
                        entry: &mut entry_crc,
                        n: &mut written,
                    };
                    compressor.decompress(&mut src, &mut sink)
                }
                None => {
                    let mut sink = DecodeSink {
                        inner: std::io::sink(),
                        coord: self.coord,
                        whole: &mut self.whole,
                        entry: &mut entry_crc,
                        n: &mut written,
                    };
                    compressor.decompress(&mut src, &mut sink)
                }
            }
        };

        if let Err(e) = res {
            // never leave a truncated file behind, cancellation included
            if let Some(p) = &out_path {
                let _ = fs::remove_file(p);
            }
            if self.coord.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            self.fail(&meta.path, &format!("decode failed: {e}"));
            return Ok(());
        }

        let actual = entry_crc.finalize();
        if actual != meta.crc32 || written != meta.u_size {
            if let Some(p) = &out_path {
                let _ = fs::remove_file(p);
            }
            self.fail(
                &meta.path,
                &format!(
                    "checksum mismatch (expected {:#010x}, got {actual:#010x})",
                    meta.crc32
                ),
            );
            return Ok(());
        }

        if out_path.is_some() {
            self.coord.log(&format!("extracted {} ({written} bytes)", meta.path));
        }
        Ok(())
    }

    fn handle_dir(&mut self, meta: &EntryMeta) -> Result<()> {
        if let Some(root) = self.dest {
            let p = safe_join(root, &meta.path)?;
            fs::create_dir_all(p)?;
        }
        Ok(())
    }
}

/// Walk an archive once, extracting when `dest` is set, dry-running when it
/// is not. A single-file archive is parsed sequentially from its inline
/// records; a split archive is driven by the trailer directory so each
/// payload is read through the volume chain.
pub(crate) fn read_archive(
    source: &Path,
    dest: Option<&Path>,
    password: Option<&str>,
    coord: &Coordinator,
    phase: Phase,
) -> Result<ReadOutcome> {
    let vols = locate_volumes(source)?;
    let mut physical = 0u64;
    for v in &vols {
        physical += fs::metadata(v)?.len();
    }

    let mut last = File::open(vols.last().ok_or_else(|| {
        EngineError::Config(format!("source archive not found: {}", source.display()))
    })?)?;
    let (trailer, data_end) = Trailer::read_at_eof(&mut last)?;
    drop(last);

    if trailer.volume_count as usize != vols.len() {
        return Err(EngineError::Format(format!(
            "archive spans {} volume(s) but {} found",
            trailer.volume_count,
            vols.len()
        )));
    }

    let sb = Superblock::read_from(File::open(&vols[0])?)?;

    coord.begin(phase, trailer.total_u);
    if let Some(root) = dest {
        fs::create_dir_all(root)?;
    }

    let mut state = ReadState {
        dest,
        password,
        cipher: ChaChaCipher::new(sb.key_salt),
        coord,
        whole: crc32fast::Hasher::new(),
        failed: Vec::new(),
        skipped: false,
    };

    if vols.len() == 1 {
        read_sequential(&vols[0], data_end, &mut state)?;
    } else {
        read_indexed(&vols, &trailer, &mut state)?;
    }

    if coord.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    let computed = if state.skipped {
        None
    } else {
        Some(state.whole.finalize())
    };
    if state.failed.is_empty() {
        coord.finish();
    }

    Ok(ReadOutcome {
        failed: state.failed,
        archive_crc: trailer.crc32,
        computed_crc: computed,
        total_u: trailer.total_u,
        physical,
        entry_count: trailer.entries.len(),
        volume_count: trailer.volume_count,
    })
}

/// Single-volume path: records and payloads are interleaved, so one forward
/// pass over the file visits everything in entry order.
fn read_sequential(vol: &Path, data_end: u64, state: &mut ReadState<'_>) -> Result<()> {
    let mut f = File::open(vol)?;
    f.seek(SeekFrom::Start(HEADER_LEN))?;
    let mut index = 0u64;
    while f.stream_position()? < data_end {
        if state.coord.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let rec = EntryRecord::read_from(&mut f)?;
        let meta = EntryMeta::from_record(&rec, index);
        index += 1;

        if meta.is_dir {
            state.handle_dir(&meta)?;
            continue;
        }
        if !state.password_gate(&meta) {
            f.seek(SeekFrom::Current(meta.c_size as i64))?;
            continue;
        }
        let mut payload = vec![0u8; meta.c_size as usize];
        f.read_exact(&mut payload)?;
        state.decode_entry(&meta, payload)?;
    }
    Ok(())
}

/// Split-archive path: the trailer directory points every payload at its
/// (volume, offset), and the chain reader follows splits across volumes.
fn read_indexed(vols: &[PathBuf], trailer: &Trailer, state: &mut ReadState<'_>) -> Result<()> {
    for (i, te) in trailer.entries.iter().enumerate() {
        if state.coord.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let meta = EntryMeta::from_trailer(te, i as u64);

        if meta.is_dir {
            state.handle_dir(&meta)?;
            continue;
        }
        if !state.password_gate(&meta) {
            continue;
        }
        let payload = if meta.c_size == 0 {
            Vec::new()
        } else {
            let mut chain = VolumeChain::open(vols, te.volume, te.offset)?;
            let mut buf = vec![0u8; meta.c_size as usize];
            chain.read_exact(&mut buf)?;
            buf
        };
        state.decode_entry(&meta, payload)?;
    }
    Ok(())
}

/// Extract an archive into the configured destination directory.
///
/// Recoverable per-entry failures (missing or wrong password, corrupt
/// payloads) are collected in the outcome; the whole-archive checksum is
/// enforced only when every entry was decoded.
pub fn extract_archive(config: &JobConfig, coord: &Coordinator) -> Result<ReadOutcome> {
    config.validate_extract()?;
    let out = read_archive(
        &config.source,
        Some(&config.destination),
        config.password(),
        coord,
        Phase::Extracting,
    )?;
    if out.failed.is_empty() && !out.checksum_ok() {
        return Err(EngineError::Checksum {
            expected: out.archive_crc,
            actual: out.computed_crc.unwrap_or(0),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_join_rejects_escapes() {
        let root = Path::new("/tmp/out");
        assert!(safe_join(root, "a/b.txt").is_ok());
        assert!(matches!(
            safe_join(root, "../evil"),
            Err(EngineError::UnsafePath(_))
        ));
        assert!(matches!(
            safe_join(root, "a/../../evil"),
            Err(EngineError::UnsafePath(_))
        ));
        assert!(matches!(
            safe_join(root, "/etc/passwd"),
            Err(EngineError::UnsafePath(_))
        ));
    }
}
