use std::path::PathBuf;
use std::process;

use clap::Args;
use coinscript::diagnostic::render_diagnostics;

use super::read_source;

#[derive(Args)]
pub struct HashArgs {
    /// Input .clsp file with raw tree source
    pub input: PathBuf,
    /// Print the hash without the file name
    #[arg(long)]
    pub bare: bool,
}

pub fn cmd_hash(args: HashArgs) {
    let source = read_source(&args.input);
    let hash = match coinscript::hash_tree_source(&source) {
        Ok(hash) => hash,
        Err(e) => {
            let filename = args.input.display().to_string();
            render_diagnostics(&[e.to_diagnostic()], &filename, &source);
            process::exit(1);
        }
    };

    if args.bare {
        println!("{}", hash.to_hex());
    } else {
        println!("{} {}", hash, args.input.display());
    }
}
