// fsgate - Main Entry Point
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// CLI, MCP stdio server and REST server. All file operations route through
// the path security gate.
// Usage:
//   fsgate serve                                  # Run MCP server (stdio)
//   fsgate http --bind 127.0.0.1:8765             # Run REST API
//   fsgate call <tool> <json-args>                # One-shot tool call
//   fsgate check <path>                           # Classify a path
//   fsgate config [--write <file>]                # Show effective config

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fsgate::{
    config::ServerConfig,
    gate::{self, Operation},
    mcp, rest, security,
    outcome::OutcomeKind,
    tools,
    validate::{validate_path, PathKind},
};
use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fsgate")]
#[command(author = "Joseph Stone")]
#[command(version)]
#[command(about = "fsgate - file manager gateway with path validation and destructive-operation gating")]
struct Cli {
    /// JSON config file; environment variables override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run MCP server (stdio JSON-RPC)
    Serve,

    /// Run the REST API
    Http {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8765")]
        bind: SocketAddr,
    },

    /// One-shot tool call; exits 1 when blocked, refused or failed
    Call {
        /// Tool name (read_file, delete_file, ...)
        tool: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },

    /// Classify a path and show the warnings it would raise
    Check {
        path: String,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Also write it to this file
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ServerConfig> {
    let mut config = match path {
        Some(p) => ServerConfig::load(p)?,
        None => ServerConfig::default(),
    };
    config.apply_env().context("Invalid environment configuration")?;
    Ok(config)
}

/// Logs go to stderr or LOG_FILE, never stdout
fn init_logging(config: &ServerConfig) -> Result<()> {
    let env = env_logger::Env::default().default_filter_or(config.log_level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    builder.target(env_logger::Target::Stderr);

    if let Some(path) = &config.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    // Safe if already init
    let _ = builder.try_init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_logging(&config)?;

    match &cli.command {
        Commands::Serve => {
            mcp::run(&config);
        }

        Commands::Http { bind } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(rest::serve(*bind, config))?;
        }

        Commands::Call { tool, args } => {
            let args: Value = serde_json::from_str(args)
                .with_context(|| format!("Invalid args JSON: {}", args))?;

            let result = tools::dispatch(tool, &args, &config);
            println!("{}", tools::render_result(&result));

            let succeeded = matches!(&result, Ok(o) if o.kind == OutcomeKind::Success);
            if !succeeded {
                std::process::exit(1);
            }
        }

        Commands::Check { path } => {
            let resolved = validate_path(path, false, PathKind::Any)
                .with_context(|| format!("Invalid path: {}", path))?;
            let classification = security::classify(&resolved, &config);
            let decision = gate::process(Operation::DeleteFile, &[&resolved], &config);

            let report = json!({
                "path": resolved,
                "warnings": classification.warnings,
                "delete_allowed": decision.allowed,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Config { write } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if let Some(target) = write {
                config.save(target)
                    .with_context(|| format!("Failed to write config to {:?}", target))?;
                eprintln!("Config written to {:?}", target);
            }
        }
    }

    Ok(())
}
