//! Shared types, error model, and configuration for InputBuilder.
//!
//! This crate is the foundation depended on by the other InputBuilder crates.
//! It provides:
//! - [`InputBuilderError`], the unified error type
//! - Domain types ([`ExampleDirectory`], [`BuildScriptPair`], [`RunReport`])
//! - Configuration ([`AppConfig`], [`WaitPolicy`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompletionConfig, CompletionMode, PathsConfig, SCRIPT_PLACEHOLDER,
    SelectionConfig, ToolConfig, WaitPolicy, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{InputBuilderError, Result};
pub use types::{
    ARTIFACT_FILE, ArtifactFingerprint, BUILD_SCRIPT_FILE, BuildScriptPair, DirectoryReport,
    ExampleDirectory, OPTIONAL_SCRIPT_FILE, RunReport, ToolExit,
};
