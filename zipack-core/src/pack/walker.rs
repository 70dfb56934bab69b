use crate::config::JobConfig;
use crate::error::{EngineError, Result};
use crate::pack::filter::{FileFilter, include_file};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One file or directory selected for archiving. Paths are relative to the
/// walk root with forward-slash separators; produced once per traversal and
/// read-only afterwards.
#[derive(Clone, Debug)]
pub struct FileEntry {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub size: u64,
    pub mtime: i64,
    pub is_dir: bool,
}

/// Ordered entry list plus aggregate logical size, both from a single pass.
/// The total is the progress denominator and the stats numerator, so size
/// estimation and actual writing can never disagree.
#[derive(Clone, Debug, Default)]
pub struct EntrySet {
    pub entries: Vec<FileEntry>,
    pub total_bytes: u64,
}

impl EntrySet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn mtime_from(md: &fs::Metadata) -> i64 {
    md.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn rel_display(path: &Path, root: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| EngineError::Format(format!("path escapes root: {}", path.display())))?;
    let parts: Vec<String> = rel
        .iter()
        .map(|c| c.to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Traverse `root` once, applying the hidden/filter rules to leaf files.
/// Order is lexicographic by relative path, so repeated runs over an
/// unchanged tree produce identical entry sets. A plain-file root yields
/// at most one entry.
pub fn walk(root: &Path, config: &JobConfig) -> Result<EntrySet> {
    let filter = FileFilter::parse(&config.filter);
    let md = fs::metadata(root)
        .map_err(|_| EngineError::Config(format!("source does not exist: {}", root.display())))?;

    if md.is_file() {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !include_file(&name, config.exclude_hidden, &filter) {
            return Ok(EntrySet::default());
        }
        return Ok(EntrySet {
            total_bytes: md.len(),
            entries: vec![FileEntry {
                rel_path: name,
                abs_path: root.to_path_buf(),
                size: md.len(),
                mtime: mtime_from(&md),
                is_dir: false,
            }],
        });
    }

    let max_depth = if config.include_subdirs {
        usize::MAX
    } else {
        1
    };

    let mut entries = Vec::new();
    let mut total = 0u64;
    for e in WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .max_depth(max_depth)
    {
        let e = e.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let p = e.path();
        if e.file_type().is_dir() {
            if !config.include_subdirs {
                continue;
            }
            // directory markers recreate empty dirs on extract
            let dmd = e.metadata().map_err(std::io::Error::other)?;
            entries.push(FileEntry {
                rel_path: rel_display(p, root)?,
                abs_path: p.to_path_buf(),
                size: 0,
                mtime: mtime_from(&dmd),
                is_dir: true,
            });
        } else if e.file_type().is_file() {
            let name = e.file_name().to_string_lossy();
            if !include_file(&name, config.exclude_hidden, &filter) {
                continue;
            }
            let fmd = e.metadata().map_err(std::io::Error::other)?;
            total += fmd.len();
            entries.push(FileEntry {
                rel_path: rel_display(p, root)?,
                abs_path: p.to_path_buf(),
                size: fmd.len(),
                mtime: mtime_from(&fmd),
                is_dir: false,
            });
        }
        // symlinks are skipped
    }
    entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

    Ok(EntrySet {
        entries,
        total_bytes: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn touch(path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap().write_all(bytes).unwrap();
    }

    #[test]
    fn walk_is_deterministic_and_totals_match() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("b.txt"), &[0u8; 20]);
        touch(&tmp.path().join("a.txt"), &[0u8; 10]);
        touch(&tmp.path().join("sub/c.txt"), &[0u8; 5]);

        let cfg = JobConfig::default();
        let set = walk(tmp.path(), &cfg).unwrap();
        let paths: Vec<&str> = set.entries.iter().map(|e| e.rel_path.as_str()).collect();
        assert_eq!(paths, ["a.txt", "b.txt", "sub", "sub/c.txt"]);
        assert_eq!(set.total_bytes, 35);

        let again = walk(tmp.path(), &cfg).unwrap();
        let again_paths: Vec<&str> =
            again.entries.iter().map(|e| e.rel_path.as_str()).collect();
        assert_eq!(paths, again_paths);
    }

    #[test]
    fn no_subdirs_stays_at_top_level() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("top.txt"), &[0u8; 4]);
        touch(&tmp.path().join("sub/deep.txt"), &[0u8; 4]);

        let cfg = JobConfig {
            include_subdirs: false,
            ..Default::default()
        };
        let set = walk(tmp.path(), &cfg).unwrap();
        let files: Vec<&str> = set
            .entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.rel_path.as_str())
            .collect();
        assert_eq!(files, ["top.txt"]);
        assert_eq!(set.total_bytes, 4);
    }

    #[test]
    fn excluded_files_do_not_count_toward_total() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("a.txt"), &[0u8; 5]);
        touch(&tmp.path().join("b.png"), &[0u8; 5]);
        touch(&tmp.path().join(".hidden"), &[0u8; 5]);

        let cfg = JobConfig {
            filter: "*.txt,*.jpg".into(),
            ..Default::default()
        };
        let set = walk(tmp.path(), &cfg).unwrap();
        let files: Vec<&str> = set
            .entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.rel_path.as_str())
            .collect();
        assert_eq!(files, ["a.txt"]);
        assert_eq!(set.total_bytes, 5);
    }

    #[test]
    fn single_file_root() {
        let tmp = tempfile::tempdir().unwrap();
        let f = tmp.path().join("only.dat");
        touch(&f, &[0u8; 9]);

        let set = walk(&f, &JobConfig::default()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.entries[0].rel_path, "only.dat");
        assert_eq!(set.total_bytes, 9);
    }
}
