use crate::presentation::cli::Level;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use zipack_core::{
    CompressionLevel, Coordinator, EngineError, JobConfig, JobResult, Result, list, progress,
    start_compress, start_extract, start_verify,
};

impl From<Level> for CompressionLevel {
    fn from(l: Level) -> Self {
        match l {
            Level::None => CompressionLevel::None,
            Level::Fastest => CompressionLevel::Fastest,
            Level::Default => CompressionLevel::Default,
            Level::Maximum => CompressionLevel::Maximum,
        }
    }
}

fn prompt_password(confirm: bool) -> Result<String> {
    let pw = rpassword::prompt_password("password: ")?;
    if confirm {
        let again = rpassword::prompt_password("confirm password: ")?;
        if pw != again {
            return Err(EngineError::Config("passwords do not match".into()));
        }
    }
    Ok(pw)
}

/// Coordinator wired to the terminal: log lines to stdout, a percentage
/// meter to stderr that only repaints when the integer percent changes.
fn terminal_coordinator() -> Arc<Coordinator> {
    let coord = Arc::new(Coordinator::new());
    coord.on_log(|msg| println!("{msg}"));
    let last = AtomicU8::new(u8::MAX);
    coord.on_progress(move |phase, processed, total| {
        let pct = progress::percent(processed, total);
        if last.swap(pct, Ordering::Relaxed) != pct {
            eprint!("\r{phase:?} {pct:>3}%");
            if pct == 100 {
                eprintln!();
            }
        }
    });
    coord
}

fn print_result(result: &JobResult) {
    if let Some(path) = &result.archive_path {
        println!("archive: {}", path.display());
    }
    println!(
        "{} entries, {} -> {} bytes ({:.2}% saved), {} volume(s)",
        result.entry_count, result.original, result.compressed, result.ratio, result.volume_count
    );
    if let Some(ok) = result.verified {
        println!("verification: {}", if ok { "ok" } else { "FAILED" });
    }
    for f in &result.failed_entries {
        println!("failed: {} ({})", f.path, f.reason);
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_compress(
    source: PathBuf,
    archive: PathBuf,
    no_subdirs: bool,
    include_hidden: bool,
    filter: String,
    level: Level,
    encrypt: bool,
    split_mb: u64,
    timestamp: bool,
    verify: bool,
) -> Result<bool> {
    let password = if encrypt {
        Some(prompt_password(true)?)
    } else {
        None
    };
    let config = JobConfig {
        source,
        destination: archive,
        include_subdirs: !no_subdirs,
        exclude_hidden: !include_hidden,
        filter,
        level: level.into(),
        password,
        split_size: split_mb * 1024 * 1024,
        add_timestamp: timestamp,
        verify_after: verify,
    };

    let coord = terminal_coordinator();
    let result = start_compress(config, coord)?.wait()?;
    print_result(&result);
    Ok(result.success)
}

/// Default extraction directory, `backup.zpk` -> `backup_extracted`.
fn default_dest(archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".into());
    archive.with_file_name(format!("{stem}_extracted"))
}

pub fn handle_extract(archive: PathBuf, dest: Option<PathBuf>, password: bool) -> Result<bool> {
    let password = if password {
        Some(prompt_password(false)?)
    } else {
        None
    };
    let destination = dest.unwrap_or_else(|| default_dest(&archive));
    let config = JobConfig {
        source: archive,
        destination: destination.clone(),
        password,
        ..Default::default()
    };

    let coord = terminal_coordinator();
    let result = start_extract(config, coord)?.wait()?;
    println!("extracted to {}", destination.display());
    print_result(&result);
    Ok(result.success)
}

pub fn handle_verify(archive: PathBuf, password: bool) -> Result<bool> {
    let password = if password {
        Some(prompt_password(false)?)
    } else {
        None
    };

    let coord = terminal_coordinator();
    let result = start_verify(archive, password, coord)?.wait()?;
    print_result(&result);
    Ok(result.success)
}

pub fn handle_list(archive: PathBuf) -> Result<bool> {
    let info = list(&archive)?;
    for e in &info.entries {
        if e.is_dir {
            println!("{:>12}  {}/", "-", e.path);
        } else {
            let lock = if e.encrypted { " *" } else { "" };
            println!("{:>12}  {}{lock}", e.u_size, e.path);
        }
    }
    println!(
        "{} entries, {} -> {} bytes, {} volume(s)",
        info.entries.len(),
        info.total_u,
        info.total_c,
        info.volume_count
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dest_sits_next_to_the_archive() {
        assert_eq!(
            default_dest(Path::new("/data/backup.zpk")),
            Path::new("/data/backup_extracted")
        );
        assert_eq!(
            default_dest(Path::new("plain")),
            Path::new("plain_extracted")
        );
    }
}
