use crate::error::Result;
use crate::progress::{Coordinator, Phase};
use crate::read::extract::{ReadOutcome, read_archive};
use std::path::Path;

/// Everything a verification pass reports: overall verdict plus the entries
/// that failed and why.
#[derive(Debug)]
pub struct VerifyReport {
    pub ok: bool,
    pub failing: Vec<String>,
    pub outcome: ReadOutcome,
}

/// Decode every entry without writing anything, checking per-entry checksums
/// and the whole-archive checksum. Checksums cover plaintext, so encrypted
/// entries verify only with the password; without it they are listed as
/// failing and the verdict is negative.
pub fn verify_archive(
    source: &Path,
    password: Option<&str>,
    coord: &Coordinator,
) -> Result<VerifyReport> {
    let outcome = read_archive(source, None, password, coord, Phase::Verifying)?;
    let failing: Vec<String> = outcome.failed.iter().map(|f| f.path.clone()).collect();
    let ok = outcome.failed.is_empty() && outcome.checksum_ok();
    coord.log(&if ok {
        format!("verify ok: {} entries intact", outcome.entry_count)
    } else {
        format!("verify failed: {} entries damaged or unreadable", failing.len().max(1))
    });
    Ok(VerifyReport {
        ok,
        failing,
        outcome,
    })
}
