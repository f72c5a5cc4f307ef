//! Client-facing surface of the checkpoint service
//!
//! - ServiceConfig: `syncpoint.toml` in the data directory
//! - CheckpointService: wires store, sessions, protocol engine, and the
//!   durable writer slot for one data directory
//! - Client: the two-operation facade (`run_as_writer` / `run_as_reader`)
//!   a thin CLI or embedding process calls

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod service;

pub use client::Client;
pub use config::{ServiceConfig, CONFIG_FILE_NAME};
pub use service::CheckpointService;
