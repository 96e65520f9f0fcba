//! Command line interface module
//!
//! Argument parsing, directory artifacts and the push/pull runner. Everything here
//! sits on top of the public [`crate::registry::RegistryClient`] API.

pub mod args;
pub mod artifact;
pub mod runner;

pub use args::{Args, Command};
pub use runner::{CliError, Runner};
