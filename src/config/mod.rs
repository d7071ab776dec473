// src/config/mod.rs

//! Configuration loading and validation for appvisor.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate names, durations and jitter ranges (`validate.rs`).
//! - Parse duration strings shared with `Components.config` (`duration.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ApplicationConfig, ConfigFile, RawConfigFile, SupervisorSection, TimingSection};
pub use validate::validate_config;
