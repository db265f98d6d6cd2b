//! Core workflow for InputBuilder.
//!
//! Stages build scripts into example directories, runs the external tool,
//! waits for its artifact, and cleans up (e.g., [`builder::build_inputs`]).

pub mod builder;
pub mod selection;
pub mod staging;
pub mod tool;
pub mod wait;
