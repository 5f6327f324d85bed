//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{PrepareCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Build, tag and deploy container images from a CI run
#[derive(Debug, Parser, Clone)]
#[command(name = "shipline")]
#[command(version)]
#[command(about = "Build, tag and deploy container images from a CI run", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run prepare, build and deploy
    Run(RunCommand),

    /// Print short SHA, branch tag and environment
    Prepare(PrepareCommand),

    /// Validate a pipeline configuration
    Validate(ValidateCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
