use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lotsizing::evaluate::Evaluate;
use lotsizing::generate::InstanceGenerator;
use lotsizing::resolution::Solve;

#[derive(Debug, Parser)]
#[command(author, version, about = "Integer programming formulation for the discrete, single-machine, multi-item lot sizing problem", long_about = None)]
#[command(propagate_version = true)]
struct LotSizingTools {
    /// Log formulation and solver progress
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Generate(InstanceGenerator),
    Solve(Solve),
    Evaluate(Evaluate),
}

fn main() -> anyhow::Result<()> {
    let cli = LotSizingTools::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Generate(generate) => generate.generate().context("cannot generate instance"),
        Command::Solve(solve) => solve
            .solve()
            .with_context(|| format!("cannot solve {}", solve.file.display())),
        Command::Evaluate(evaluate) => evaluate
            .evaluate()
            .with_context(|| format!("cannot evaluate schedule on {}", evaluate.file.display())),
    }
}
