use crate::error::{EngineError, Result};
use std::path::PathBuf;
use time::OffsetDateTime;

/// Codec setting for a compression job. Maps onto zstd levels in `codec`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    /// STORE: payloads are written uncompressed.
    None,
    Fastest,
    #[default]
    Default,
    Maximum,
}

/// Immutable description of one compress/extract job. Built by the caller,
/// validated before the worker starts, never mutated afterwards.
#[derive(Clone, Debug)]
pub struct JobConfig {
    /// File or directory to pack, or the archive to extract.
    pub source: PathBuf,
    /// Archive path to create, or the directory to extract into.
    pub destination: PathBuf,
    pub include_subdirs: bool,
    pub exclude_hidden: bool,
    /// Comma-separated glob list (`*.txt, *.jpg`); empty means no filter.
    pub filter: String,
    pub level: CompressionLevel,
    /// Non-empty password enables per-entry encryption.
    pub password: Option<String>,
    /// Volume capacity in bytes; 0 disables splitting.
    pub split_size: u64,
    /// Append `_<unix-seconds>` to the destination file name.
    pub add_timestamp: bool,
    pub verify_after: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            include_subdirs: true,
            exclude_hidden: true,
            filter: String::new(),
            level: CompressionLevel::Default,
            password: None,
            split_size: 0,
            add_timestamp: false,
            verify_after: false,
        }
    }
}

impl JobConfig {
    /// The effective password: `None` when unset or empty.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    pub fn validate_compress(&self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(EngineError::Config("source path is empty".into()));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(EngineError::Config("destination path is empty".into()));
        }
        if !self.source.exists() {
            return Err(EngineError::Config(format!(
                "source does not exist: {}",
                self.source.display()
            )));
        }
        // the superblock must fit inside volume 1
        if self.split_size > 0 && self.split_size < 512 {
            return Err(EngineError::Config(format!(
                "volume capacity too small: {} bytes",
                self.split_size
            )));
        }
        Ok(())
    }

    pub fn validate_extract(&self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(EngineError::Config("source archive path is empty".into()));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(EngineError::Config("destination path is empty".into()));
        }
        Ok(())
    }

    /// Destination with the timestamp suffix applied when requested,
    /// e.g. `backup.zpk` -> `backup_1756425600.zpk`.
    pub fn final_destination(&self) -> PathBuf {
        if !self.add_timestamp {
            return self.destination.clone();
        }
        let ts = OffsetDateTime::now_utc().unix_timestamp();
        let stem = self
            .destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let named = match self.destination.extension() {
            Some(ext) => format!("{stem}_{ts}.{}", ext.to_string_lossy()),
            None => format!("{stem}_{ts}"),
        };
        self.destination.with_file_name(named)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_paths_rejected() {
        let cfg = JobConfig::default();
        assert!(matches!(
            cfg.validate_compress(),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(cfg.validate_extract(), Err(EngineError::Config(_))));
    }

    #[test]
    fn missing_source_rejected() {
        let cfg = JobConfig {
            source: PathBuf::from("/definitely/not/here"),
            destination: PathBuf::from("/tmp/out.zpk"),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate_compress(),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn tiny_split_size_rejected() {
        let tmp = std::env::temp_dir();
        let cfg = JobConfig {
            source: tmp.clone(),
            destination: tmp.join("out.zpk"),
            split_size: 100,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate_compress(),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn empty_password_is_none() {
        let mut cfg = JobConfig {
            password: Some(String::new()),
            ..Default::default()
        };
        assert!(cfg.password().is_none());
        cfg.password = Some("secret".into());
        assert_eq!(cfg.password(), Some("secret"));
    }

    #[test]
    fn timestamp_suffix_keeps_extension() {
        let cfg = JobConfig {
            destination: PathBuf::from("/tmp/backup.zpk"),
            add_timestamp: true,
            ..Default::default()
        };
        let dest = cfg.final_destination();
        let name = dest.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("backup_"));
        assert!(name.ends_with(".zpk"));
    }
}
