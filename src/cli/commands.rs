//! CLI command definitions using clap.
//!
//! Subcommands:
//! - serve: run the HTTP API (default; `--host`/`--port` apply to it)
//! - chunk: decompose every unchunked task once and exit
//! - tasks: print stored tasks

use chunkd::config::ServerConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chunkd - splits tasks into schedulable chunks with a generative model
#[derive(Parser, Debug)]
#[command(name = "chunkd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Address to bind (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true, env = "PORT")]
    pub port: Option<u16>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Apply `--host` and `--port` (or `PORT`) over the configured address
    pub fn apply_server_overrides(&self, server: &mut ServerConfig) {
        if let Some(host) = &self.host {
            server.host = host.clone();
        }
        if let Some(port) = self.port {
            server.port = port;
        }
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API (default)
    Serve,

    /// Decompose all unchunked tasks once
    Chunk,

    /// List stored tasks
    Tasks {
        /// Show each task's chunks
        #[arg(long)]
        chunks: bool,
    },
}
