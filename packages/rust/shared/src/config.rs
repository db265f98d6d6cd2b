//! Application configuration for InputBuilder.
//!
//! User config lives at `~/.inputbuilder/inputbuilder.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{InputBuilderError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "inputbuilder.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".inputbuilder";

/// Placeholder in [`ToolConfig::run_expression`] replaced by the script path.
pub const SCRIPT_PLACEHOLDER: &str = "{script}";

// ---------------------------------------------------------------------------
// Config structs (matching inputbuilder.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input and template locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// External tool invocation.
    #[serde(default)]
    pub tool: ToolConfig,

    /// How completion of the external tool is awaited.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Which example directories are processed.
    #[serde(default)]
    pub selection: SelectionConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root holding one subdirectory per example.
    #[serde(default = "default_input_dir")]
    pub input_dir: String,

    /// Directory holding `build_inputs.m` and `optional_inputs.m`.
    #[serde(default = "default_build_file_dir")]
    pub build_file_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            build_file_dir: default_build_file_dir(),
        }
    }
}

fn default_input_dir() -> String {
    "inputs/example_inputs".into()
}
fn default_build_file_dir() -> String {
    "inputs/Inputs2Copy".into()
}

/// `[tool]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable to run.
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments placed before the run expression.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Final argument; `{script}` is replaced by the absolute build script path.
    #[serde(default = "default_run_expression")]
    pub run_expression: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            run_expression: default_run_expression(),
        }
    }
}

fn default_command() -> String {
    "matlab".into()
}
fn default_args() -> Vec<String> {
    vec!["-nosplash".into(), "-nodesktop".into(), "-r".into()]
}
fn default_run_expression() -> String {
    "run('{script}'); exit;".into()
}

/// Completion wait mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Sleep a fixed duration, then check once.
    Fixed,
    /// Poll with exponential backoff until a timeout.
    Poll,
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_mode")]
    pub mode: CompletionMode,

    /// Seconds to sleep in `fixed` mode.
    #[serde(default = "default_fixed_wait")]
    pub fixed_wait_secs: u64,

    /// First poll interval in `poll` mode.
    #[serde(default = "default_poll_initial")]
    pub poll_initial_ms: u64,

    /// Upper bound on a single poll interval.
    #[serde(default = "default_poll_max")]
    pub poll_max_ms: u64,

    /// Interval multiplier between polls.
    #[serde(default = "default_poll_factor")]
    pub poll_factor: f64,

    /// Give up polling after this many seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Size and mtime must hold still this long before the artifact counts as written.
    #[serde(default = "default_poll_settle")]
    pub poll_settle_ms: u64,

    /// Reject artifacts older than the tool invocation.
    #[serde(default = "default_true")]
    pub verify_fresh: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            fixed_wait_secs: default_fixed_wait(),
            poll_initial_ms: default_poll_initial(),
            poll_max_ms: default_poll_max(),
            poll_factor: default_poll_factor(),
            poll_timeout_secs: default_poll_timeout(),
            poll_settle_ms: default_poll_settle(),
            verify_fresh: true,
        }
    }
}

fn default_mode() -> CompletionMode {
    CompletionMode::Poll
}
fn default_fixed_wait() -> u64 {
    60
}
fn default_poll_initial() -> u64 {
    500
}
fn default_poll_max() -> u64 {
    10_000
}
fn default_poll_factor() -> f64 {
    2.0
}
fn default_poll_timeout() -> u64 {
    300
}
fn default_poll_settle() -> u64 {
    2_000
}
fn default_true() -> bool {
    true
}

/// `[selection]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Only process example names matching one of these regexes (all when empty).
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Skip example names matching any of these regexes.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Wait policy (runtime, derived from [completion])
// ---------------------------------------------------------------------------

/// Runtime completion policy, validated from [`CompletionConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitPolicy {
    /// Sleep for `wait`, then check once.
    Fixed { wait: Duration },
    /// Check immediately, then back off exponentially until `timeout`.
    /// The artifact is accepted once it has not changed for `settle`.
    Poll {
        initial: Duration,
        max_interval: Duration,
        factor: f64,
        timeout: Duration,
        settle: Duration,
    },
}

impl TryFrom<&CompletionConfig> for WaitPolicy {
    type Error = InputBuilderError;

    fn try_from(config: &CompletionConfig) -> Result<Self> {
        match config.mode {
            CompletionMode::Fixed => Ok(Self::Fixed {
                wait: Duration::from_secs(config.fixed_wait_secs),
            }),
            CompletionMode::Poll => {
                if config.poll_initial_ms == 0 {
                    return Err(InputBuilderError::validation(
                        "poll_initial_ms must be greater than zero",
                    ));
                }
                if !(config.poll_factor >= 1.0 && config.poll_factor.is_finite()) {
                    return Err(InputBuilderError::validation(format!(
                        "poll_factor must be a finite number >= 1.0, got {}",
                        config.poll_factor
                    )));
                }
                if config.poll_max_ms < config.poll_initial_ms {
                    return Err(InputBuilderError::validation(
                        "poll_max_ms must not be smaller than poll_initial_ms",
                    ));
                }
                Ok(Self::Poll {
                    initial: Duration::from_millis(config.poll_initial_ms),
                    max_interval: Duration::from_millis(config.poll_max_ms),
                    factor: config.poll_factor,
                    timeout: Duration::from_secs(config.poll_timeout_secs),
                    settle: Duration::from_millis(config.poll_settle_ms),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.inputbuilder/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| InputBuilderError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.inputbuilder/inputbuilder.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| InputBuilderError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        InputBuilderError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| InputBuilderError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| InputBuilderError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| InputBuilderError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
