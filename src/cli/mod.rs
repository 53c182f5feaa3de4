pub mod build;
pub mod check;
pub mod hash;

use std::path::Path;
use std::process;

use coinscript::diagnostic::render_diagnostics;
use coinscript::CompileOptions;

/// Read a source file, exiting on error.
pub fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

/// Options from the nearest `coinscript.toml`, exiting on a malformed file.
pub fn load_options(input: &Path) -> CompileOptions {
    match CompileOptions::discover(input) {
        Ok(options) => options,
        Err(diag) => {
            eprintln!("error: {}", diag.message);
            process::exit(1);
        }
    }
}

/// Compile `source`, rendering any error and exiting.
pub fn compile_or_exit(source: &str, input: &Path, options: &CompileOptions) -> coinscript::CompiledCoin {
    match coinscript::compile_coin(source, options) {
        Ok(coin) => coin,
        Err(e) => {
            let filename = input.display().to_string();
            render_diagnostics(&[e.to_diagnostic()], &filename, source);
            process::exit(1);
        }
    }
}
