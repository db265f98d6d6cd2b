//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use inputbuilder_core::builder::{BuildConfig, ProgressReporter, build_inputs};
use inputbuilder_core::selection::{DirectorySelection, discover_examples};
use inputbuilder_core::tool::{CommandTool, ExternalTool};
use inputbuilder_shared::{
    AppConfig, BuildScriptPair, CompletionMode, DirectoryReport, ExampleDirectory, RunReport,
    WaitPolicy, init_config, load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// InputBuilder: regenerate simulated inputs for every example.
#[derive(Parser)]
#[command(
    name = "inputbuilder",
    version,
    about = "Stage build scripts into example directories and rebuild their simulated inputs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.inputbuilder/inputbuilder.toml.
    #[arg(long, global = true, env = "INPUTBUILDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Defaults to `build` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Completion wait mode override.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum WaitMode {
    Fixed,
    Poll,
}

impl From<WaitMode> for CompletionMode {
    fn from(mode: WaitMode) -> Self {
        match mode {
            WaitMode::Fixed => CompletionMode::Fixed,
            WaitMode::Poll => CompletionMode::Poll,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Rebuild the simulated inputs of every example directory.
    Build(BuildArgs),

    /// Show example directories and their artifact status.
    List(ListArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Directory selection flags shared by `build` and `list`.
#[derive(Args, Debug, Default)]
pub(crate) struct SelectionArgs {
    /// Root holding one subdirectory per example.
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Only process examples whose name matches this regex (repeatable).
    #[arg(long)]
    pub include: Vec<String>,

    /// Skip examples whose name matches this regex (repeatable).
    #[arg(long)]
    pub exclude: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Directory holding build_inputs.m and optional_inputs.m.
    #[arg(long)]
    pub build_file_dir: Option<PathBuf>,

    /// External tool executable.
    #[arg(long)]
    pub tool: Option<String>,

    /// How to wait for the artifact: fixed or poll.
    #[arg(long, value_enum)]
    pub wait: Option<WaitMode>,

    /// Seconds to sleep in fixed mode.
    #[arg(long)]
    pub wait_secs: Option<u64>,

    /// Seconds to keep polling in poll mode.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Accept artifacts older than the tool invocation.
    #[arg(long)]
    pub no_verify_fresh: bool,

    /// Write a JSON run report to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ListArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "inputbuilder=info",
        1 => "inputbuilder=debug",
        _ => "inputbuilder=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Config resolution
// ---------------------------------------------------------------------------

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Fold selection flags into the loaded config.
fn apply_selection(config: &mut AppConfig, args: &SelectionArgs) {
    if let Some(dir) = &args.input_dir {
        config.paths.input_dir = dir.to_string_lossy().into_owned();
    }
    if !args.include.is_empty() {
        config.selection.include_patterns = args.include.clone();
    }
    if !args.exclude.is_empty() {
        config.selection.exclude_patterns = args.exclude.clone();
    }
}

/// Fold `build` flags into the loaded config.
fn apply_build_args(config: &mut AppConfig, args: &BuildArgs) {
    apply_selection(config, &args.selection);
    if let Some(dir) = &args.build_file_dir {
        config.paths.build_file_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(tool) = &args.tool {
        config.tool.command = tool.clone();
    }
    if let Some(mode) = args.wait {
        config.completion.mode = mode.into();
    }
    if let Some(secs) = args.wait_secs {
        config.completion.fixed_wait_secs = secs;
    }
    if let Some(secs) = args.timeout_secs {
        config.completion.poll_timeout_secs = secs;
    }
    if args.no_verify_fresh {
        config.completion.verify_fresh = false;
    }
}

fn build_config(config: &AppConfig) -> Result<BuildConfig> {
    Ok(BuildConfig {
        input_dir: PathBuf::from(&config.paths.input_dir),
        scripts: BuildScriptPair::in_dir(Path::new(&config.paths.build_file_dir)),
        wait: WaitPolicy::try_from(&config.completion)?,
        selection: DirectorySelection::try_from(&config.selection)?,
        verify_fresh: config.completion.verify_fresh,
    })
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        None => cmd_build(config_path, &BuildArgs::default()).await,
        Some(Command::Build(args)) => cmd_build(config_path, &args).await,
        Some(Command::List(args)) => cmd_list(config_path, &args).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

async fn cmd_build(config_path: Option<&Path>, args: &BuildArgs) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    apply_build_args(&mut config, args);

    let build = build_config(&config)?;
    let tool = CommandTool::from(&config.tool);

    info!(
        input_dir = %build.input_dir.display(),
        tool = tool.command(),
        wait = ?build.wait,
        "building example inputs"
    );

    let reporter = CliProgress::new();
    let report = run_build(&build, &tool, &reporter).await?;

    if let Some(path) = &args.report {
        write_report(path, &report)?;
        info!(path = %path.display(), "wrote run report");
    }

    let elapsed = (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0;
    println!();
    println!("  Inputs rebuilt successfully!");
    println!("  Run:          {}", report.run_id);
    println!("  Directories:  {}", report.directories.len());
    for dir in &report.directories {
        let short_hash = dir.fingerprint.sha256.get(..12).unwrap_or(&dir.fingerprint.sha256);
        println!("    {:<24} {short_hash}", dir.name);
    }
    println!("  Time:         {elapsed:.1}s");
    println!();

    Ok(())
}

/// Run the build, clearing the spinner before an error is reported.
async fn run_build<T: ExternalTool>(
    build: &BuildConfig,
    tool: &T,
    reporter: &CliProgress,
) -> Result<RunReport> {
    let report = build_inputs(build, tool, reporter)
        .await
        .inspect_err(|_| reporter.abandon())?;
    Ok(report)
}

fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .wrap_err_with(|| format!("failed to write run report to {}", path.display()))
}

/// One `list` row: name, artifact status, and any staged scripts left behind.
fn status_line(example: &ExampleDirectory) -> String {
    let artifact = if example.has_artifact() {
        "built"
    } else {
        "missing"
    };
    let leftovers = example.leftover_scripts();
    let note = if leftovers.is_empty() {
        String::new()
    } else {
        format!("  ({} staged script(s) left over)", leftovers.len())
    };
    format!("  {:<24} {artifact}{note}", example.name)
}

async fn cmd_list(config_path: Option<&Path>, args: &ListArgs) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    apply_selection(&mut config, &args.selection);

    let input_dir = PathBuf::from(&config.paths.input_dir);
    let selection = DirectorySelection::try_from(&config.selection)?;
    let examples = discover_examples(&input_dir, &selection)?;

    info!(input_dir = %input_dir.display(), count = examples.len(), "listing examples");

    for example in &examples {
        println!("{}", status_line(example));
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    /// Stop the spinner without a final frame.
    fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn directory_started(&self, name: &str, current: usize, total: usize) {
        self.spinner.set_prefix(format!("[{current}/{total}] {name}"));
    }

    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn directory_finished(&self, report: &DirectoryReport) {
        self.spinner.println(format!(
            "  ✓ {} ({:.1}s)",
            report.name,
            report.elapsed_ms as f64 / 1000.0
        ));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_defaults_to_build() {
        let cli = Cli::try_parse_from(["inputbuilder"]).expect("parse");
        assert!(cli.command.is_none());
    }

    #[test]
    fn build_flags_override_config() {
        let cli = Cli::try_parse_from([
            "inputbuilder",
            "build",
            "--input-dir",
            "/data/examples",
            "--tool",
            "/opt/matlab/bin/matlab",
            "--wait",
            "fixed",
            "--wait-secs",
            "90",
            "--exclude",
            "^draft",
            "--no-verify-fresh",
        ])
        .expect("parse");

        let Some(Command::Build(args)) = cli.command else {
            panic!("expected build subcommand");
        };

        let mut config = AppConfig::default();
        apply_build_args(&mut config, &args);

        assert_eq!(config.paths.input_dir, "/data/examples");
        assert_eq!(config.paths.build_file_dir, "inputs/Inputs2Copy");
        assert_eq!(config.tool.command, "/opt/matlab/bin/matlab");
        assert_eq!(config.completion.mode, CompletionMode::Fixed);
        assert_eq!(config.completion.fixed_wait_secs, 90);
        assert_eq!(config.selection.exclude_patterns, vec!["^draft"]);
        assert!(!config.completion.verify_fresh);
    }

    #[test]
    fn build_config_from_fixed_mode() {
        let mut config = AppConfig::default();
        config.completion.mode = CompletionMode::Fixed;

        let build = build_config(&config).expect("valid config");
        assert_eq!(
            build.wait,
            WaitPolicy::Fixed {
                wait: std::time::Duration::from_secs(60)
            }
        );
        assert_eq!(build.input_dir, PathBuf::from("inputs/example_inputs"));
        assert!(build.scripts.build_script.ends_with("Inputs2Copy/build_inputs.m"));
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ib-cli-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn status_line_reports_artifact_and_leftovers() {
        let root = temp_dir();
        let built = ExampleDirectory::new(root.join("built_example"));
        let aborted = ExampleDirectory::new(root.join("aborted_example"));
        std::fs::create_dir_all(&built.path).unwrap();
        std::fs::create_dir_all(&aborted.path).unwrap();
        std::fs::write(built.artifact_path(), b"mat").unwrap();
        std::fs::write(aborted.build_script_path(), "run").unwrap();
        std::fs::write(aborted.optional_script_path(), "opt").unwrap();

        let line = status_line(&built);
        assert!(line.contains("built_example"));
        assert!(line.trim_end().ends_with("built"));
        assert!(!line.contains("left over"));

        let line = status_line(&aborted);
        assert!(line.contains("missing"));
        assert!(line.contains("(2 staged script(s) left over)"));

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn failed_build_clears_spinner() {
        let root = temp_dir();
        let mut config = AppConfig::default();
        config.paths.input_dir = root.join("missing").to_string_lossy().into_owned();
        let build = build_config(&config).unwrap();
        let tool = CommandTool::from(&config.tool);

        let reporter = CliProgress::new();
        assert!(run_build(&build, &tool, &reporter).await.is_err());
        assert!(reporter.spinner.is_finished());

        std::fs::remove_dir_all(&root).ok();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn build_writes_json_report() {
        let root = temp_dir();
        let input_dir = root.join("example_inputs");
        let build_file_dir = root.join("Inputs2Copy");
        std::fs::create_dir_all(input_dir.join("alpha")).unwrap();
        std::fs::create_dir_all(&build_file_dir).unwrap();
        std::fs::write(build_file_dir.join("build_inputs.m"), "optional_inputs;").unwrap();
        std::fs::write(build_file_dir.join("optional_inputs.m"), "x = 1;").unwrap();

        let mut config = AppConfig::default();
        config.paths.input_dir = input_dir.to_string_lossy().into_owned();
        config.paths.build_file_dir = build_file_dir.to_string_lossy().into_owned();
        config.tool.command = "sh".into();
        config.tool.args = vec!["-c".into()];
        config.tool.run_expression =
            "printf built > \"$(dirname '{script}')/simulated_inputs.mat\"".into();
        config.completion.mode = CompletionMode::Fixed;
        config.completion.fixed_wait_secs = 0;
        let config_path = root.join("inputbuilder.toml");
        std::fs::write(&config_path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let report_path = root.join("report.json");
        let args = BuildArgs {
            report: Some(report_path.clone()),
            ..Default::default()
        };
        cmd_build(Some(&config_path), &args).await.unwrap();

        let json = std::fs::read_to_string(&report_path).unwrap();
        let report: RunReport = serde_json::from_str(&json).expect("report deserializes");
        assert_eq!(report.directories.len(), 1);
        assert_eq!(report.directories[0].name, "alpha");
        assert_eq!(report.directories[0].fingerprint.size, 5);
        assert_eq!(report.input_dir, input_dir);

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn build_config_rejects_bad_pattern() {
        let mut config = AppConfig::default();
        config.selection.include_patterns = vec!["[".into()];
        assert!(build_config(&config).is_err());
    }
}
