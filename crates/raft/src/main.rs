//! Raft CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "raft")]
#[command(version)]
#[command(about = "Raft template compiler", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v for debug, -vv for trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tokens of a template, one per line
    Tokens {
        /// Template file
        file: PathBuf,
    },

    /// Print the syntax tree of a template as JSON
    Ast {
        /// Template file
        file: PathBuf,
    },

    /// Compile a template to PHP
    Compile {
        /// Template file
        file: PathBuf,

        /// Write output to FILE instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a template with the built-in runtime
    Render {
        /// Template file
        file: PathBuf,

        /// JSON file with an object of variables
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Variable (KEY=VALUE); VALUE is read as JSON when it parses
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Layout to render the template's blocks into
        #[arg(short, long)]
        layout: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "raft=info",
        1 => "raft=debug,raft_template=debug",
        _ => "raft=trace,raft_template=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Tokens { file } => commands::tokens::execute(config, &file),
        Commands::Ast { file } => commands::ast::execute(config, &file),
        Commands::Compile { file, output } => {
            commands::compile::execute(config, &file, output.as_deref())
        }
        Commands::Render {
            file,
            data,
            vars,
            layout,
        } => commands::render::execute(commands::render::RenderArgs {
            file,
            data,
            vars,
            layout,
            config: cli.config.clone(),
        }),
    }
}
