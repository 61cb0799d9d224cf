//! PACSAT server configuration management
//!
//! This crate provides configuration loading and parsing for the ground-link server:
//! - TOML configuration file parsing
//! - Stack configuration structures
//! - Runtime-editable stack state (administrative enable flags)

pub mod stack_config;
pub mod toml_config;

pub use stack_config::*;
pub use toml_config::*;
