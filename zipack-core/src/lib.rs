#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod progress;

pub mod codec;

pub mod crypto {
    pub mod cipher;
}

pub mod container {
    pub mod record;
    pub mod superblock;
    pub mod trailer;
}

pub mod volume;

pub mod pack {
    pub mod filter;
    pub mod walker;
    pub mod writer;
}

pub mod read {
    pub mod extract;
    pub mod verify;
}

pub mod list;

pub mod job;

// Re-exports: stable API surface
pub use config::{CompressionLevel, JobConfig};
pub use error::{EngineError, EntryFailure, Result};
pub use job::{JobHandle, JobResult, start_compress, start_extract, start_verify};
pub use list::{ArchiveInfo, ListedEntry, list};
pub use progress::{Coordinator, Phase};
pub use read::extract::extract_archive;
pub use read::verify::verify_archive;
