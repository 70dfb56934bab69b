use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("format error: {0}")]
    Format(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("archive checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Checksum { expected: u32, actual: u32 },

    #[error("unsafe entry path: {0}")]
    UnsafePath(String),

    #[error("password required")]
    PasswordRequired,

    #[error("wrong password")]
    WrongPassword,

    #[error("job cancelled")]
    Cancelled,
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, EngineError>;

/// A per-entry failure that does not abort the job. The worker records it
/// and moves on to the next entry; callers inspect the collected list.
#[derive(Clone, Debug)]
pub struct EntryFailure {
    pub path: String,
    pub reason: String,
}
