pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use zipack_core::Result;

/// Parse the command line and dispatch. Returns whether the job succeeded;
/// fatal errors propagate.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Compress {
            source,
            archive,
            no_subdirs,
            include_hidden,
            filter,
            level,
            encrypt,
            split_mb,
            timestamp,
            verify,
        } => handlers::handle_compress(
            source,
            archive,
            no_subdirs,
            include_hidden,
            filter,
            level,
            encrypt,
            split_mb,
            timestamp,
            verify,
        ),
        Commands::Extract {
            archive,
            dest,
            password,
        } => handlers::handle_extract(archive, dest, password),
        Commands::Verify { archive, password } => handlers::handle_verify(archive, password),
        Commands::List { archive } => handlers::handle_list(archive),
    }
}
