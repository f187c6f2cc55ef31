//! Subcommand implementations

pub mod scoring;
pub mod service;
