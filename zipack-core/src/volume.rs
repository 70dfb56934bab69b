use crate::container::trailer::Trailer;
use crate::error::{EngineError, Result};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Numbered volume file name: `backup.zpk` -> `backup.001.zpk`.
/// Volumes are 1-based and zero-padded so lexicographic order is
/// sequence order.
pub fn volume_path(dest: &Path, index: u32) -> PathBuf {
    match dest.extension().and_then(|e| e.to_str()) {
        Some(ext) => dest.with_extension(format!("{index:03}.{ext}")),
        None => dest.with_extension(format!("{index:03}")),
    }
}

/// Capacity-aware sink under the archive writer. With a capacity of 0 the
/// logical stream maps 1:1 onto a single file at `dest`; otherwise writes
/// are cut at volume boundaries (mid-payload splits included) and continue
/// into the next numbered volume.
pub struct VolumeWriter {
    dest: PathBuf,
    capacity: u64,
    index: u32,
    /// Bytes in the current volume.
    written: u64,
    total: u64,
    file: File,
    created: Vec<PathBuf>,
}

impl VolumeWriter {
    pub fn create(dest: &Path, capacity: u64) -> Result<Self> {
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let first = if capacity == 0 {
            dest.to_path_buf()
        } else {
            volume_path(dest, 1)
        };
        let file = File::create(&first)?;
        Ok(Self {
            dest: dest.to_path_buf(),
            capacity,
            index: 1,
            written: 0,
            total: 0,
            file,
            created: vec![first],
        })
    }

    /// Where the next byte will land: (1-based volume index, in-volume offset).
    pub fn position(&self) -> (u32, u64) {
        if self.capacity > 0 && self.written == self.capacity {
            (self.index + 1, 0)
        } else {
            (self.index, self.written)
        }
    }

    pub fn total_written(&self) -> u64 {
        self.total
    }

    pub fn volume_count(&self) -> u32 {
        self.index
    }

    fn roll(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.index += 1;
        let next = volume_path(&self.dest, self.index);
        self.file = File::create(&next)?;
        self.created.push(next);
        self.written = 0;
        Ok(())
    }

    /// Append the trailer to the current (final) volume. Bypasses the
    /// capacity split: the last volume may exceed capacity by the trailer.
    pub fn append_trailer(&mut self, trailer: &Trailer) -> Result<u64> {
        let n = trailer.write_to(&mut self.file)?;
        self.total += n;
        Ok(n)
    }

    /// Flush and close, returning (physical bytes, volume count, paths).
    pub fn finish(mut self) -> Result<(u64, u32, Vec<PathBuf>)> {
        self.file.flush()?;
        Ok((self.total, self.index, std::mem::take(&mut self.created)))
    }

    /// Remove every volume created so far. Used on cancellation and fatal
    /// errors so a failed job never leaves files that look like an archive.
    pub fn discard(self) -> io::Result<()> {
        drop(self.file);
        for p in &self.created {
            let _ = fs::remove_file(p);
        }
        Ok(())
    }
}

impl Write for VolumeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.capacity > 0 && self.written == self.capacity {
            self.roll()?;
        }
        let room = if self.capacity == 0 {
            buf.len()
        } else {
            buf.len().min((self.capacity - self.written) as usize)
        };
        let n = self.file.write(&buf[..room])?;
        self.written += n as u64;
        self.total += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// A numbered volume name maps back to its base archive path,
/// `backup.002.zpk` -> `backup.zpk`. `None` for unnumbered names.
fn strip_volume_index(p: &Path) -> Option<PathBuf> {
    let name = p.file_name()?.to_str()?;
    let mut parts: Vec<&str> = name.split('.').collect();
    let idx_pos = match parts.len() {
        0 | 1 => return None,
        2 => 1,
        n => n - 2,
    };
    let seg = parts[idx_pos];
    if seg.len() == 3 && seg.bytes().all(|b| b.is_ascii_digit()) {
        parts.remove(idx_pos);
        Some(p.with_file_name(parts.join(".")))
    } else {
        None
    }
}

/// Find the physical files of an archive: the single file at `source`, or
/// the numbered volume set derived from it, in sequence order. Pointing at
/// any numbered part selects the whole set.
pub fn locate_volumes(source: &Path) -> Result<Vec<PathBuf>> {
    let base = match strip_volume_index(source) {
        Some(base) => base,
        None if source.is_file() => return Ok(vec![source.to_path_buf()]),
        None => source.to_path_buf(),
    };
    let mut vols = Vec::new();
    loop {
        let p = volume_path(&base, vols.len() as u32 + 1);
        if !p.is_file() {
            break;
        }
        vols.push(p);
    }
    if vols.is_empty() {
        return Err(EngineError::Config(format!(
            "source archive not found: {}",
            source.display()
        )));
    }
    Ok(vols)
}

/// Sequential reader over the logical stream, continuing into the next
/// volume when the current one ends.
pub struct VolumeChain<'a> {
    vols: &'a [PathBuf],
    current: usize,
    file: File,
}

impl<'a> VolumeChain<'a> {
    /// Open positioned at (1-based volume, in-volume offset).
    pub fn open(vols: &'a [PathBuf], volume: u32, offset: u64) -> Result<Self> {
        if volume == 0 || volume as usize > vols.len() {
            return Err(EngineError::Format(format!(
                "entry points at volume {volume} of {}",
                vols.len()
            )));
        }
        let current = (volume - 1) as usize;
        let mut file = File::open(&vols[current])?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(Self {
            vols,
            current,
            file,
        })
    }
}

impl Read for VolumeChain<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.file.read(buf)?;
            if n > 0 || buf.is_empty() {
                return Ok(n);
            }
            if self.current + 1 >= self.vols.len() {
                return Ok(0);
            }
            self.current += 1;
            self.file = File::open(&self.vols[self.current])?;
        }
    }
}
