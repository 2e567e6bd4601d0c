//! Soonish - multi-user event reminder and notification service.
//!
//! This crate is the thin root binary: configuration, process wiring, and
//! the CLI. The actual core (C1-C9) lives in the `soonish-*` crates.

pub mod cli;
pub mod config;
pub mod db;

pub use config::Config;
