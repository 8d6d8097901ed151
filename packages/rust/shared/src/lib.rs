//! Shared types, error model, and configuration for jobsweep.
//!
//! This crate is the foundation depended on by all other jobsweep crates.
//! It provides:
//! - [`JobsweepError`], the unified error type
//! - Domain types ([`NormalizedRecord`], [`SeenEntry`], [`Tier`], [`RunId`])
//! - Per-tier raw records ([`RawRecord`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod raw;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AcquisitionConfig, AppConfig, BoardConfig, GoogleJobsConfig, JSearchConfig, NicheConfig,
    RegistryBackend, RegistryConfig, RunConfig, SearchConfig, SinkConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_secret,
};
pub use error::{JobsweepError, Result};
pub use raw::{
    ApplyOption, BoardCard, DetectedExtensions, GoogleJobsPosting, JSearchPosting, RawRecord,
    RequiredExperience,
};
pub use types::{
    EmploymentType, ExperienceLevel, NormalizedRecord, PostedDate, RegistryStats, RunId,
    SeenEntry, Tier,
};
