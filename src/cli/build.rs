use std::path::{Path, PathBuf};
use std::process;

use clap::Args;
use coinscript::api::BuildArtifact;

use super::{compile_or_exit, load_options, read_source};

#[derive(Args)]
pub struct BuildArgs {
    /// Input .coin file
    pub input: PathBuf,
    /// Output file (default: <input>.clsp, or <input>.json with --json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Pretty-print with indentation and action comments
    #[arg(long)]
    pub pretty: bool,
    /// Write a JSON artifact with every program, hash and action signature
    #[arg(long)]
    pub json: bool,
    /// Render condition codes as numbers
    #[arg(long)]
    pub numeric: bool,
    /// Fail spends whose sends exceed the coin amount
    #[arg(long)]
    pub conservation_check: bool,
}

pub fn cmd_build(args: BuildArgs) {
    let BuildArgs {
        input,
        output,
        pretty,
        json,
        numeric,
        conservation_check,
    } = args;
    let source = read_source(&input);
    let mut options = load_options(&input);
    options.pretty |= pretty;
    options.conservation_check |= conservation_check;
    if numeric {
        options.opcodes = coinscript::config::OpcodeMode::Numeric;
    }

    let coin = compile_or_exit(&source, &input, &options);
    let out_path = output.unwrap_or_else(|| input.with_extension(if json { "json" } else { "clsp" }));

    if json {
        let artifact = BuildArtifact::new(&coin, &options);
        let text = match artifact.to_json() {
            Ok(text) => text,
            Err(e) => {
                eprintln!("error: cannot encode artifact: {}", e);
                process::exit(1);
            }
        };
        write_output(&out_path, &text);
    } else {
        write_output(&out_path, &coin.main.render(&options));
        for program in coin.launcher.iter() {
            write_output(&sibling(&out_path, "launcher"), &program.render(&options));
        }
        for action in &coin.actions {
            if let Some(program) = &action.program {
                write_output(&sibling(&out_path, &action.name), &program.render(&options));
            }
        }
    }

    eprintln!(
        "Compiled {} -> {} ({})",
        input.display(),
        out_path.display(),
        coin.main.tree_hash()
    );
}

/// `out/coin.clsp` + `launcher` → `out/coin.launcher.clsp`
fn sibling(main: &Path, suffix: &str) -> PathBuf {
    let stem = main
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = main
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clsp".to_string());
    main.with_file_name(format!("{}.{}.{}", stem, suffix, ext))
}

fn write_output(path: &Path, text: &str) {
    let mut text = text.to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    if let Err(e) = std::fs::write(path, text) {
        eprintln!("error: cannot write '{}': {}", path.display(), e);
        process::exit(1);
    }
    tracing::debug!(path = %path.display(), "wrote output");
}
