use std::path::PathBuf;

use clap::Args;

use super::{compile_or_exit, load_options, read_source};

#[derive(Args)]
pub struct CheckArgs {
    /// Input .coin file
    pub input: PathBuf,
}

pub fn cmd_check(args: CheckArgs) {
    let source = read_source(&args.input);
    let options = load_options(&args.input);
    let coin = compile_or_exit(&source, &args.input, &options);
    eprintln!(
        "OK: {} ({} action{})",
        args.input.display(),
        coin.actions.len(),
        if coin.actions.len() == 1 { "" } else { "s" }
    );
}
