use crate::container::trailer::Trailer;
use crate::error::Result;
use crate::volume::locate_volumes;
use std::fs::File;
use std::path::Path;

/// One line of `list` output, taken straight from the trailer directory.
#[derive(Debug, Clone)]
pub struct ListedEntry {
    pub path: String,
    pub is_dir: bool,
    pub u_size: u64,
    pub c_size: u64,
    pub mtime: i64,
    pub encrypted: bool,
}

/// Archive-wide figures shown alongside the entry list.
#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    pub entries: Vec<ListedEntry>,
    pub total_u: u64,
    pub total_c: u64,
    pub volume_count: u32,
    pub volume_capacity: u64,
}

/// List the contents of an archive without decoding any payloads.
/// Works on encrypted archives too; only the payloads are sealed.
pub fn list(source: &Path) -> Result<ArchiveInfo> {
    let vols = locate_volumes(source)?;
    let mut last = File::open(&vols[vols.len() - 1])?;
    let (trailer, _) = Trailer::read_at_eof(&mut last)?;

    let entries = trailer
        .entries
        .iter()
        .map(|te| ListedEntry {
            path: te.path.clone(),
            is_dir: te.is_dir,
            u_size: te.u_size,
            c_size: te.c_size,
            mtime: te.mtime,
            encrypted: te.encrypted,
        })
        .collect();

    Ok(ArchiveInfo {
        entries,
        total_u: trailer.total_u,
        total_c: trailer.total_c,
        volume_count: trailer.volume_count,
        volume_capacity: trailer.volume_capacity,
    })
}
