//! The build workflow: stage → clear → invoke → wait → verify → clean up,
//! one example directory at a time.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use inputbuilder_shared::{
    ArtifactFingerprint, BuildScriptPair, DirectoryReport, ExampleDirectory, InputBuilderError,
    Result, RunReport, WaitPolicy,
};

use crate::selection::{DirectorySelection, discover_examples};
use crate::staging::{remove_stale_artifact, remove_staged_scripts, stage_scripts};
use crate::tool::ExternalTool;
use crate::wait::await_artifact;

/// Filesystem timestamp slack allowed by the freshness check.
const FRESHNESS_TOLERANCE_SECS: i64 = 2;

/// Configuration for a build run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root holding one subdirectory per example.
    pub input_dir: PathBuf,
    /// Templates staged into every example.
    pub scripts: BuildScriptPair,
    /// How completion is awaited after the tool exits.
    pub wait: WaitPolicy,
    /// Which examples are processed.
    pub selection: DirectorySelection,
    /// Reject artifacts older than the tool invocation.
    pub verify_fresh: bool,
}

/// Progress callback for reporting build status.
pub trait ProgressReporter: Send + Sync {
    /// Called before an example directory is processed.
    fn directory_started(&self, name: &str, current: usize, total: usize);
    /// Called when entering a step within the current directory.
    fn phase(&self, name: &str);
    /// Called after a directory is finalized.
    fn directory_finished(&self, report: &DirectoryReport);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn directory_started(&self, _name: &str, _current: usize, _total: usize) {}
    fn phase(&self, _name: &str) {}
    fn directory_finished(&self, _report: &DirectoryReport) {}
    fn done(&self, _report: &RunReport) {}
}

/// Rebuild the artifact of every selected example directory.
///
/// Directories are processed in name order. The first failure aborts the
/// run; later directories are left untouched.
#[instrument(skip_all, fields(input_dir = %config.input_dir.display()))]
pub async fn build_inputs<T: ExternalTool>(
    config: &BuildConfig,
    tool: &T,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let started_at = Utc::now();
    let run_id = Uuid::now_v7();

    let examples = discover_examples(&config.input_dir, &config.selection)?;
    info!(%run_id, count = examples.len(), "starting input build");

    let total = examples.len();
    let mut directories = Vec::with_capacity(total);
    for (i, example) in examples.iter().enumerate() {
        progress.directory_started(&example.name, i + 1, total);
        let report = build_directory(example, config, tool, progress)
            .await
            .inspect_err(|e| error!(directory = %example.name, error = %e, "aborting run"))?;
        progress.directory_finished(&report);
        directories.push(report);
    }

    let report = RunReport {
        run_id,
        input_dir: config.input_dir.clone(),
        started_at,
        finished_at: Utc::now(),
        directories,
    };
    progress.done(&report);
    info!(%run_id, built = report.directories.len(), "input build finished");

    Ok(report)
}

/// Run the full sequence for a single example directory.
///
/// On failure the staged scripts are left in place for inspection.
#[instrument(skip_all, fields(directory = %example.name))]
pub async fn build_directory<T: ExternalTool>(
    example: &ExampleDirectory,
    config: &BuildConfig,
    tool: &T,
    progress: &dyn ProgressReporter,
) -> Result<DirectoryReport> {
    let start = Instant::now();

    progress.phase("Staging build scripts");
    stage_scripts(&config.scripts, example)?;

    if remove_stale_artifact(example)? {
        info!("removed previous artifact");
    }

    progress.phase("Running external tool");
    let script = example.build_script_path();
    let script = std::path::absolute(&script).map_err(|e| InputBuilderError::io(&script, e))?;
    let invoked_at = Utc::now();
    let exit = tool.invoke(&script).await?;
    if !exit.success {
        warn!(exit_code = ?exit.code, "external tool exited unsuccessfully");
    }

    progress.phase("Waiting for artifact");
    let artifact = example.artifact_path();
    if !await_artifact(&artifact, &config.wait).await {
        return Err(InputBuilderError::ArtifactNotProduced {
            directory: example.name.clone(),
            artifact,
        });
    }

    let fingerprint = ArtifactFingerprint::compute(&artifact)?;
    if config.verify_fresh && is_stale(&fingerprint, invoked_at) {
        return Err(InputBuilderError::StaleArtifact {
            directory: example.name.clone(),
            artifact,
        });
    }

    progress.phase("Cleaning up");
    remove_staged_scripts(example)?;

    let report = DirectoryReport {
        name: example.name.clone(),
        artifact,
        fingerprint,
        tool_exit_code: exit.code,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        sha256 = %report.fingerprint.sha256,
        size = report.fingerprint.size,
        elapsed_ms = report.elapsed_ms,
        "artifact built"
    );

    Ok(report)
}

fn is_stale(fingerprint: &ArtifactFingerprint, invoked_at: DateTime<Utc>) -> bool {
    fingerprint.modified_at + TimeDelta::seconds(FRESHNESS_TOLERANCE_SECS) < invoked_at
}
