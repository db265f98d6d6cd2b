//! Core domain types for InputBuilder example directories.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{InputBuilderError, Result};

/// File name of the main build script template.
pub const BUILD_SCRIPT_FILE: &str = "build_inputs.m";

/// File name of the optional-inputs script template.
pub const OPTIONAL_SCRIPT_FILE: &str = "optional_inputs.m";

/// File name of the artifact the external tool writes into each example.
pub const ARTIFACT_FILE: &str = "simulated_inputs.mat";

// ---------------------------------------------------------------------------
// BuildScriptPair
// ---------------------------------------------------------------------------

/// The two template scripts copied verbatim into every example directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildScriptPair {
    /// Source path of `build_inputs.m`.
    pub build_script: PathBuf,
    /// Source path of `optional_inputs.m`.
    pub optional_script: PathBuf,
}

impl BuildScriptPair {
    /// Locate both templates inside `build_file_dir`.
    ///
    /// Existence is not checked here; a missing template surfaces when it is copied.
    pub fn in_dir(build_file_dir: &Path) -> Self {
        Self {
            build_script: build_file_dir.join(BUILD_SCRIPT_FILE),
            optional_script: build_file_dir.join(OPTIONAL_SCRIPT_FILE),
        }
    }
}

// ---------------------------------------------------------------------------
// ExampleDirectory
// ---------------------------------------------------------------------------

/// One example input folder under the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleDirectory {
    /// Directory name, used to identify the example in logs and errors.
    pub name: String,
    /// Full path to the directory.
    pub path: PathBuf,
}

impl ExampleDirectory {
    /// Wrap an existing directory path, naming it after its last component.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    /// Where the staged copy of `build_inputs.m` lives.
    pub fn build_script_path(&self) -> PathBuf {
        self.path.join(BUILD_SCRIPT_FILE)
    }

    /// Where the staged copy of `optional_inputs.m` lives.
    pub fn optional_script_path(&self) -> PathBuf {
        self.path.join(OPTIONAL_SCRIPT_FILE)
    }

    /// Where the external tool is expected to write its artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.path.join(ARTIFACT_FILE)
    }

    pub fn has_artifact(&self) -> bool {
        self.artifact_path().is_file()
    }

    /// Staging scripts still present, e.g. after an aborted run.
    pub fn leftover_scripts(&self) -> Vec<PathBuf> {
        [self.build_script_path(), self.optional_script_path()]
            .into_iter()
            .filter(|p| p.exists())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ArtifactFingerprint
// ---------------------------------------------------------------------------

/// Content hash and timestamp of a produced artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFingerprint {
    /// SHA-256 of the artifact bytes, lowercase hex.
    pub sha256: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time reported by the filesystem.
    pub modified_at: DateTime<Utc>,
}

impl ArtifactFingerprint {
    /// Hash and stat the file at `path`.
    pub fn compute(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| InputBuilderError::io(path, e))?;
        let metadata = std::fs::metadata(path).map_err(|e| InputBuilderError::io(path, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| InputBuilderError::io(path, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);

        Ok(Self {
            sha256: format!("{:x}", hasher.finalize()),
            size: bytes.len() as u64,
            modified_at: DateTime::<Utc>::from(modified),
        })
    }
}

// ---------------------------------------------------------------------------
// Tool + run reporting
// ---------------------------------------------------------------------------

/// How the external process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExit {
    /// Exit code, absent when the process was killed by a signal.
    pub code: Option<i32>,
    pub success: bool,
}

impl ToolExit {
    /// A clean zero exit.
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            success: true,
        }
    }
}

/// Outcome of one finalized example directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryReport {
    /// Example directory name.
    pub name: String,
    /// Path of the produced artifact.
    pub artifact: PathBuf,
    /// Fingerprint of the produced artifact.
    pub fingerprint: ArtifactFingerprint,
    /// Exit code of the external tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_exit_code: Option<i32>,
    /// Wall time spent on this directory.
    pub elapsed_ms: u64,
}

/// Summary of a full build run, written by `--report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Time-sortable run identifier.
    pub run_id: Uuid,
    /// Input root that was processed.
    pub input_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Finalized directories in processing order.
    pub directories: Vec<DirectoryReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ib-types-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn example_directory_paths() {
        let example = ExampleDirectory::new("inputs/example_inputs/hydro");
        assert_eq!(example.name, "hydro");
        assert_eq!(
            example.build_script_path(),
            PathBuf::from("inputs/example_inputs/hydro/build_inputs.m")
        );
        assert_eq!(
            example.optional_script_path(),
            PathBuf::from("inputs/example_inputs/hydro/optional_inputs.m")
        );
        assert_eq!(
            example.artifact_path(),
            PathBuf::from("inputs/example_inputs/hydro/simulated_inputs.mat")
        );
    }

    #[test]
    fn script_pair_in_dir() {
        let pair = BuildScriptPair::in_dir(Path::new("inputs/Inputs2Copy"));
        assert!(pair.build_script.ends_with("build_inputs.m"));
        assert!(pair.optional_script.ends_with("optional_inputs.m"));
    }

    #[test]
    fn leftover_scripts_lists_only_present_files() {
        let dir = temp_dir();
        let example = ExampleDirectory::new(&dir);
        assert!(example.leftover_scripts().is_empty());

        std::fs::write(example.build_script_path(), "disp(1)").unwrap();
        assert_eq!(example.leftover_scripts(), vec![example.build_script_path()]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn fingerprint_hashes_content() {
        let dir = temp_dir();
        let path = dir.join(ARTIFACT_FILE);
        std::fs::write(&path, b"hello").unwrap();

        let fp = ArtifactFingerprint::compute(&path).expect("fingerprint");
        assert_eq!(fp.size, 5);
        assert_eq!(
            fp.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(fp.modified_at <= Utc::now());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn fingerprint_missing_file_is_io_error() {
        let result = ArtifactFingerprint::compute(Path::new("/nonexistent/simulated_inputs.mat"));
        assert!(matches!(result, Err(InputBuilderError::Io { .. })));
    }

    #[test]
    fn run_report_serialization() {
        let report = RunReport {
            run_id: Uuid::now_v7(),
            input_dir: PathBuf::from("inputs/example_inputs"),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            directories: vec![DirectoryReport {
                name: "solar".into(),
                artifact: PathBuf::from("inputs/example_inputs/solar/simulated_inputs.mat"),
                fingerprint: ArtifactFingerprint {
                    sha256: "abc".into(),
                    size: 3,
                    modified_at: Utc::now(),
                },
                tool_exit_code: None,
                elapsed_ms: 1200,
            }],
        };

        let json = serde_json::to_string_pretty(&report).expect("serialize");
        assert!(!json.contains("tool_exit_code"));
        let parsed: RunReport = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.directories.len(), 1);
        assert_eq!(parsed.directories[0].name, "solar");
    }
}
