//! `taxipred` library crate.
//!
//! The binary (`taxipred`) is a thin wrapper around this library so that:
//!
//! - the model, API and dashboard logic is testable without spawning processes
//! - the HTTP router can be exercised in-process
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod model;
pub mod plot;
pub mod report;
pub mod server;
pub mod tui;
