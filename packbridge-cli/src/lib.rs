//! # packbridge-cli: Packing Station Bridge Driver
//!
//! Command-line front end for `packbridge-core`: loads a TOML config,
//! connects to the orchestration server as this station, and runs a
//! single scan, reprint or log operation, or stays connected in watch
//! mode with background reconnects.

pub mod commands;
pub mod config;
