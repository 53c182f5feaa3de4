use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(
    name = "coinscript",
    version,
    about = "CoinScript compiler: contracts to content-addressed tree programs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a .coin file to program source
    Build(cli::build::BuildArgs),
    /// Lex, parse and generate without writing output
    Check(cli::check::CheckArgs),
    /// Print the structural hash of a raw tree program
    Hash(cli::hash::HashArgs),
}

fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    install_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => cli::build::cmd_build(args),
        Command::Check(args) => cli::check::cmd_check(args),
        Command::Hash(args) => cli::hash::cmd_hash(args),
    }
}
