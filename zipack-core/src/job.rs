use crate::config::JobConfig;
use crate::error::{EngineError, EntryFailure, Result};
use crate::pack::{walker, writer};
use crate::progress::{Coordinator, Phase};
use crate::read::{extract, verify};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Final report of a finished job, whatever its kind.
#[derive(Debug)]
pub struct JobResult {
    /// False only when entries failed or post-write verification did.
    /// Fatal errors never produce a result at all.
    pub success: bool,
    /// The archive actually written, timestamp suffix applied.
    pub archive_path: Option<PathBuf>,
    pub original: u64,
    pub compressed: u64,
    /// Space saved, percent of the original size.
    pub ratio: f64,
    pub entry_count: usize,
    pub volume_count: u32,
    /// Post-write verification verdict, when one ran.
    pub verified: Option<bool>,
    pub failed_entries: Vec<EntryFailure>,
}

/// A running worker. The coordinator is shared with the caller, so cancel,
/// progress and log callbacks all work while the job runs.
pub struct JobHandle {
    coord: Arc<Coordinator>,
    worker: JoinHandle<Result<JobResult>>,
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle").finish_non_exhaustive()
    }
}

impl JobHandle {
    pub fn coordinator(&self) -> Arc<Coordinator> {
        Arc::clone(&self.coord)
    }

    pub fn cancel(&self) {
        self.coord.cancel();
    }

    /// Register callbacks after start. Events emitted before registration
    /// are missed; register on the coordinator first when that matters.
    pub fn on_progress(&self, f: impl Fn(Phase, u64, u64) + Send + 'static) {
        self.coord.on_progress(f);
    }

    pub fn on_log(&self, f: impl Fn(&str) + Send + 'static) {
        self.coord.on_log(f);
    }

    /// Block until the worker finishes and return its result.
    pub fn wait(self) -> Result<JobResult> {
        self.worker
            .join()
            .map_err(|_| EngineError::Format("worker thread panicked".into()))?
    }
}

fn spawn(
    coord: Arc<Coordinator>,
    work: impl FnOnce(&Coordinator) -> Result<JobResult> + Send + 'static,
) -> JobHandle {
    let worker_coord = Arc::clone(&coord);
    let worker = thread::spawn(move || work(&worker_coord));
    JobHandle { coord, worker }
}

fn ratio(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        0.0
    } else {
        (1.0 - compressed as f64 / original as f64) * 100.0
    }
}

/// Start a compression job on its own worker thread.
/// Configuration problems surface here, before any thread is spawned.
pub fn start_compress(config: JobConfig, coord: Arc<Coordinator>) -> Result<JobHandle> {
    config.validate_compress()?;
    Ok(spawn(coord, move |c| run_compress(&config, c)))
}

pub fn start_extract(config: JobConfig, coord: Arc<Coordinator>) -> Result<JobHandle> {
    config.validate_extract()?;
    Ok(spawn(coord, move |c| run_extract(&config, c)))
}

pub fn start_verify(
    source: PathBuf,
    password: Option<String>,
    coord: Arc<Coordinator>,
) -> Result<JobHandle> {
    if source.as_os_str().is_empty() {
        return Err(EngineError::Config("source archive path is empty".into()));
    }
    Ok(spawn(coord, move |c| {
        run_verify(&source, password.as_deref(), c)
    }))
}

fn run_compress(config: &JobConfig, coord: &Coordinator) -> Result<JobResult> {
    let set = walker::walk(&config.source, config)?;
    coord.log(&format!(
        "selected {} entries, {} bytes",
        set.len(),
        set.total_bytes
    ));

    let summary = writer::write_archive(&set, config, coord)?;

    let (verified, failed_entries) = if config.verify_after {
        let report = verify::verify_archive(&summary.archive_path, config.password(), coord)?;
        (Some(report.ok), report.outcome.failed)
    } else {
        (None, Vec::new())
    };

    Ok(JobResult {
        success: verified.unwrap_or(true),
        archive_path: Some(summary.archive_path),
        original: summary.original,
        compressed: summary.compressed,
        ratio: summary.ratio,
        entry_count: summary.entry_count,
        volume_count: summary.volumes.len() as u32,
        verified,
        failed_entries,
    })
}

fn run_extract(config: &JobConfig, coord: &Coordinator) -> Result<JobResult> {
    let out = extract::extract_archive(config, coord)?;
    let success = out.failed.is_empty();
    if !success {
        coord.log(&format!(
            "extraction finished with {} skipped entries",
            out.failed.len()
        ));
    }
    Ok(JobResult {
        success,
        archive_path: None,
        original: out.total_u,
        compressed: out.physical,
        ratio: ratio(out.total_u, out.physical),
        entry_count: out.entry_count,
        volume_count: out.volume_count,
        verified: None,
        failed_entries: out.failed,
    })
}

fn run_verify(source: &Path, password: Option<&str>, coord: &Coordinator) -> Result<JobResult> {
    let report = verify::verify_archive(source, password, coord)?;
    let out = report.outcome;
    Ok(JobResult {
        success: report.ok,
        archive_path: None,
        original: out.total_u,
        compressed: out.physical,
        ratio: ratio(out.total_u, out.physical),
        entry_count: out.entry_count,
        volume_count: out.volume_count,
        verified: Some(report.ok),
        failed_entries: out.failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn invalid_config_fails_before_spawning() {
        let coord = Arc::new(Coordinator::new());
        let err = start_compress(JobConfig::default(), coord).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn compress_job_reports_through_handle() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("data.txt"), b"hello hello hello hello").unwrap();
        let config = JobConfig {
            source: tmp.path().to_path_buf(),
            destination: tmp.path().join("out.zpk"),
            ..Default::default()
        };

        let coord = Arc::new(Coordinator::new());
        let handle = start_compress(config.clone(), coord).unwrap();
        let result = handle.wait().unwrap();
        assert!(result.success);
        assert_eq!(result.archive_path, Some(config.destination.clone()));
        assert_eq!(result.original, 23);
        assert!(config.destination.exists());
    }

    #[test]
    fn cancelled_job_surfaces_cancelled_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("data.bin"), vec![0u8; 1 << 16]).unwrap();
        let config = JobConfig {
            source: tmp.path().to_path_buf(),
            destination: tmp.path().join("out.zpk"),
            ..Default::default()
        };

        let coord = Arc::new(Coordinator::new());
        coord.cancel();
        let handle = start_compress(config, coord).unwrap();
        assert!(matches!(handle.wait(), Err(EngineError::Cancelled)));
    }
}
