//! Core types for the Time Travel Concierge
//!
//! This crate provides the session store, configuration and logging
//! shared by the client, server and CLI crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
