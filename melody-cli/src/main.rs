//! # melody-id - Melody Identification CLI
//!
//! Runs the melody-core analysis session over recorded audio, names
//! frequencies, and renders template melodies to WAV for checking the
//! pipeline end to end.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "melody-id")]
#[command(author, version, about = "Identify melodies by pitch trajectory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify which template a recording follows
    Identify(commands::identify::IdentifyArgs),

    /// Print the nearest pitch name for frequencies
    Name(commands::name::NameArgs),

    /// Render a template melody as a sine tone
    Render(commands::render::RenderArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Identify(args) => commands::identify::run(args),
        Commands::Name(args) => commands::name::run(args),
        Commands::Render(args) => commands::render::run(args),
    }
}
