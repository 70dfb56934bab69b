use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "zipack archive tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Level {
    /// Store entries uncompressed
    None,
    Fastest,
    #[default]
    Default,
    Maximum,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pack a file or directory into an archive
    Compress {
        /// File or directory to pack
        source: PathBuf,
        /// Archive to create
        archive: PathBuf,

        /// Do not descend into subdirectories
        #[arg(long)]
        no_subdirs: bool,

        /// Include dotfiles (excluded by default)
        #[arg(long)]
        include_hidden: bool,

        /// Comma-separated name patterns, e.g. "*.txt,*.jpg"
        #[arg(long, default_value = "")]
        filter: String,

        #[arg(long, value_enum, default_value_t = Level::Default)]
        level: Level,

        /// Prompt for a password and encrypt entry payloads
        #[arg(long)]
        encrypt: bool,

        /// Split into volumes of this many mebibytes (0 = single file)
        #[arg(long = "split-mb", default_value_t = 0)]
        split_mb: u64,

        /// Append a timestamp to the archive file name
        #[arg(long)]
        timestamp: bool,

        /// Re-read and check the archive after writing it
        #[arg(long)]
        verify: bool,
    },

    /// Extract an archive
    Extract {
        /// Archive (or any numbered volume of it)
        archive: PathBuf,
        /// Defaults to "<stem>_extracted" next to the archive
        dest: Option<PathBuf>,

        /// Prompt for the archive password
        #[arg(long)]
        password: bool,
    },

    /// Check archive integrity without extracting
    Verify {
        archive: PathBuf,

        /// Prompt for the archive password
        #[arg(long)]
        password: bool,
    },

    /// List archive contents
    List { archive: PathBuf },
}
