use crate::codec::{self, CodecId};
use crate::config::JobConfig;
use crate::container::record::EntryRecord;
use crate::container::superblock::{FLAG_ENCRYPTED, Superblock, VERSION};
use crate::container::trailer::{Trailer, TrailerEntry};
use crate::crypto::cipher::{ChaChaCipher, EntryCipher};
use crate::error::{EngineError, Result};
use crate::pack::walker::EntrySet;
use crate::progress::{Coordinator, Phase};
use crate::volume::VolumeWriter;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

/// What a finished compression pass reports back to the job layer.
#[derive(Clone, Debug)]
pub struct PackSummary {
    pub archive_path: PathBuf,
    pub volumes: Vec<PathBuf>,
    pub original: u64,
    /// Physical bytes across all volumes, records and trailer included.
    pub compressed: u64,
    pub ratio: f64,
    pub entry_count: usize,
}

/// Read adapter over a source file: feeds the codec while accumulating the
/// whole-archive and per-entry checksums, counting bytes, and reporting
/// progress per chunk. Surfaces cancellation as an I/O error so the codec
/// unwinds promptly mid-entry.
struct SourceReader<'a, R: Read> {
    inner: R,
    coord: &'a Coordinator,
    whole: &'a mut crc32fast::Hasher,
    entry: &'a mut crc32fast::Hasher,
    n: &'a mut u64,
}

impl<R: Read> Read for SourceReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.coord.is_cancelled() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "job cancelled",
            ));
        }
        let n = self.inner.read(buf)?;
        self.whole.update(&buf[..n]);
        self.entry.update(&buf[..n]);
        *self.n += n as u64;
        self.coord.add(n as u64);
        Ok(n)
    }
}

/// Stream the entry set into an archive at the configured destination.
/// On cancellation or fatal error every volume created so far is removed,
/// so a failed job never leaves files that can be mistaken for an archive.
pub fn write_archive(set: &EntrySet, config: &JobConfig, coord: &Coordinator) -> Result<PackSummary> {
    let dest = config.final_destination();
    coord.begin(Phase::Compressing, set.total_bytes);

    let password = config.password();
    let cipher = match password {
        Some(_) => Some(ChaChaCipher::with_random_salt()?),
        None => None,
    };

    let mut vw = VolumeWriter::create(&dest, config.split_size)?;
    match write_entries(set, config, coord, cipher.as_ref(), password, &mut vw) {
        Ok(trailer) => {
            let (physical, volumes, paths) = vw.finish()?;
            coord.finish();
            let ratio = if trailer.total_u == 0 {
                0.0
            } else {
                (1.0 - physical as f64 / trailer.total_u as f64) * 100.0
            };
            coord.log(&format!(
                "compressed {} entries: {} -> {} bytes ({ratio:.2}%), {volumes} volume(s)",
                set.len(),
                trailer.total_u,
                physical,
            ));
            Ok(PackSummary {
                archive_path: dest,
                volumes: paths,
                original: trailer.total_u,
                compressed: physical,
                ratio,
                entry_count: set.len(),
            })
        }
        Err(e) => {
            let _ = vw.discard();
            if coord.is_cancelled() {
                Err(EngineError::Cancelled)
            } else {
                Err(e)
            }
        }
    }
}

fn write_entries(
    set: &EntrySet,
    config: &JobConfig,
    coord: &Coordinator,
    cipher: Option<&ChaChaCipher>,
    password: Option<&str>,
    vw: &mut VolumeWriter,
) -> Result<Trailer> {
    let sb = Superblock {
        version: VERSION,
        flags: if cipher.is_some() { FLAG_ENCRYPTED } else { 0 },
        key_salt: cipher.map(|c| c.salt()).unwrap_or([0u8; 32]),
    };
    sb.write_to(&mut *vw)?;

    let token = match (cipher, password) {
        (Some(c), Some(pw)) => Some(c.verifier(pw)?),
        _ => None,
    };

    let (compressor, level) = codec::for_level(config.level);
    let mut whole = crc32fast::Hasher::new();
    let mut tentries = Vec::with_capacity(set.len());
    let mut total_u = 0u64;
    let mut total_c = 0u64;

    for (i, entry) in set.entries.iter().enumerate() {
        if coord.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        if entry.is_dir {
            let rec = EntryRecord {
                path: entry.rel_path.clone(),
                is_dir: true,
                u_size: 0,
                c_size: 0,
                mtime: entry.mtime,
                crc32: 0,
                codec: CodecId::Store as u8,
                encrypted: false,
                verifier: None,
            };
            rec.write_to(&mut *vw)?;
            let (volume, offset) = vw.position();
            tentries.push(TrailerEntry {
                path: entry.rel_path.clone(),
                is_dir: true,
                volume,
                offset,
                u_size: 0,
                c_size: 0,
                mtime: entry.mtime,
                crc32: 0,
                codec: CodecId::Store as u8,
                encrypted: false,
                verifier: None,
            });
            continue;
        }

        let mut src = File::open(&entry.abs_path)?;
        let mut entry_crc = crc32fast::Hasher::new();
        let mut read_bytes = 0u64;
        let mut payload = Vec::new();
        {
            let mut reader = SourceReader {
                inner: &mut src,
                coord,
                whole: &mut whole,
                entry: &mut entry_crc,
                n: &mut read_bytes,
            };
            compressor.compress(&mut reader, &mut payload, level)?;
        }
        let crc = entry_crc.finalize();

        let (payload, encrypted) = match (cipher, password) {
            (Some(c), Some(pw)) => (c.encrypt(&payload, pw, i as u64)?, true),
            _ => (payload, false),
        };

        let rec = EntryRecord {
            path: entry.rel_path.clone(),
            is_dir: false,
            u_size: read_bytes,
            c_size: payload.len() as u64,
            mtime: entry.mtime,
            crc32: crc,
            codec: compressor.id() as u8,
            encrypted,
            verifier: if encrypted { token } else { None },
        };
        rec.write_to(&mut *vw)?;
        let (volume, offset) = vw.position();
        vw.write_all(&payload)?;

        total_u += read_bytes;
        total_c += payload.len() as u64;
        tentries.push(TrailerEntry {
            path: entry.rel_path.clone(),
            is_dir: false,
            volume,
            offset,
            u_size: read_bytes,
            c_size: payload.len() as u64,
            mtime: entry.mtime,
            crc32: crc,
            codec: compressor.id() as u8,
            encrypted,
            verifier: if encrypted { token } else { None },
        });
        coord.log(&format!("added {} ({read_bytes} bytes)", entry.rel_path));
    }

    if coord.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    let trailer = Trailer {
        entries: tentries,
        crc32: whole.finalize(),
        total_u,
        total_c,
        volume_count: vw.volume_count(),
        volume_capacity: config.split_size,
    };
    vw.append_trailer(&trailer)?;
    Ok(trailer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::walker::walk;
    use std::fs;

    #[test]
    fn cancelled_before_start_leaves_no_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.bin"), vec![1u8; 4096]).unwrap();
        let cfg = JobConfig {
            source: tmp.path().to_path_buf(),
            destination: tmp.path().join("out.zpk"),
            ..Default::default()
        };
        let set = walk(&cfg.source, &cfg).unwrap();

        let coord = Coordinator::new();
        coord.cancel();
        let err = write_archive(&set, &cfg, &coord).unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert!(!cfg.destination.exists());
    }

    #[test]
    fn empty_input_still_produces_a_valid_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("empty");
        fs::create_dir(&src).unwrap();
        let cfg = JobConfig {
            source: src.clone(),
            destination: tmp.path().join("out.zpk"),
            ..Default::default()
        };
        let set = walk(&src, &cfg).unwrap();
        assert!(set.is_empty());

        let coord = Coordinator::new();
        let summary = write_archive(&set, &cfg, &coord).unwrap();
        assert_eq!(summary.original, 0);
        assert_eq!(summary.ratio, 0.0);
        assert!(cfg.destination.exists());
        // empty job counts as complete
        assert_eq!(coord.percent(), 100);
    }
}
