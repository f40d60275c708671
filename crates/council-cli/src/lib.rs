//! Command-line front end for council deliberations.
//!
//! Talks to the orchestration service over HTTP and records every session
//! through [`coordination::store::SessionStore`].

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod render;

pub use cli::{Cli, Command};
pub use client::{CheckResult, ClientError, CouncilClient};
pub use config::CouncilConfig;
