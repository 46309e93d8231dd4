// SPDX-License-Identifier: MIT OR Apache-2.0
//! Request-scoped evaluation contexts and the `Config` assembly that binds
//! an edge URL and API keys to a repository and edge service.

#![deny(unsafe_code)]

mod base;
mod client;
mod config;
mod error;
mod server;

pub use client::ClientEvalContext;
pub use config::{Config, Context};
pub use error::ConfigError;
pub use server::ServerEvalContext;
