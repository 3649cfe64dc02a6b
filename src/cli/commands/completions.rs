//! Completions command - print shell completion scripts

use crate::cli::args::{Cli, CompletionsArgs};
use crate::error::AssetCacheResult;
use clap::CommandFactory;
use std::io;

/// Execute the completions command
pub fn execute(args: CompletionsArgs) -> AssetCacheResult<()> {
    let mut command = Cli::command();
    clap_complete::generate(args.shell, &mut command, "asset-cache", &mut io::stdout());
    Ok(())
}
