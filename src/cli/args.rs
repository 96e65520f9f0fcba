//! Command-line argument parsing

use crate::config::DEFAULT_CHUNK_SIZE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "linkspocket")]
#[command(about = "Push and pull directories of files as OCI artifacts")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Talk to the registry over plain HTTP
    #[arg(long = "insecure-http", global = true)]
    pub insecure_http: bool,

    /// Only print warnings and errors
    #[arg(long = "quiet", short = 'q', global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Bytes per upload request
    #[arg(long = "chunk-size", global = true, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Whole-request timeout in seconds
    #[arg(long = "timeout", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Push every regular file in a directory as one artifact
    Push {
        /// Directory holding the artifact files
        #[arg(long = "dir", short = 'd')]
        dir: PathBuf,

        /// Target reference, e.g. registry.example.com:5000/seeds:v1
        #[arg(long = "ref", short = 'R')]
        reference: String,

        /// Derive the tag from the artifact config digest when the reference has none
        #[arg(long = "autotag")]
        autotag: bool,
    },
    /// Pull an artifact into <out>/<tag or digest>/
    Pull {
        /// Source reference with a tag or a digest
        #[arg(long = "ref", short = 'R')]
        reference: String,

        /// Parent directory for the pulled artifact
        #[arg(long = "out", short = 'o')]
        out: PathBuf,

        /// Remove a previous pull of the same reference first
        #[arg(long = "clean")]
        clean: bool,

        /// Check every downloaded blob against its digest
        #[arg(long = "verify")]
        verify: bool,
    },
}
