//! Shared utilities for tradedesk
//!
//! This crate provides common functionality used across the tradedesk workspace:
//! logging setup and the layered [`DeskConfig`].

pub mod config;
pub mod logging;

pub use config::{ConfigError, DeskConfig, DeskConfigBuilder};
pub use logging::{init_tracing, init_tracing_with};
