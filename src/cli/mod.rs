//! CLI module for chunkd - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
