//! External computational tool invocation.
//!
//! The builder only relies on the contract "given a script path, the tool
//! eventually writes the artifact or it does not", expressed by
//! [`ExternalTool`]. [`CommandTool`] is the subprocess-backed implementation.

use std::future::Future;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, instrument};

use inputbuilder_shared::{InputBuilderError, Result, SCRIPT_PLACEHOLDER, ToolConfig, ToolExit};

/// Something that can execute a staged build script.
pub trait ExternalTool {
    /// Run the tool on `script` (an absolute path) and wait for it to exit.
    fn invoke(&self, script: &Path) -> impl Future<Output = Result<ToolExit>>;
}

/// Runs a configured executable as a child process.
#[derive(Debug, Clone)]
pub struct CommandTool {
    command: String,
    args: Vec<String>,
    run_expression: String,
}

impl CommandTool {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        run_expression: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            run_expression: run_expression.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Full argument list for `script`: configured args, then the run expression.
    pub fn arguments(&self, script: &Path) -> Vec<String> {
        let expression = self
            .run_expression
            .replace(SCRIPT_PLACEHOLDER, &script.to_string_lossy());
        let mut args = self.args.clone();
        args.push(expression);
        args
    }
}

impl From<&ToolConfig> for CommandTool {
    fn from(config: &ToolConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            config.run_expression.clone(),
        )
    }
}

impl ExternalTool for CommandTool {
    #[instrument(skip_all, fields(command = %self.command, script = %script.display()))]
    async fn invoke(&self, script: &Path) -> Result<ToolExit> {
        let args = self.arguments(script);
        info!(?args, "invoking external tool");

        let status = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| InputBuilderError::ToolSpawn {
                command: self.command.clone(),
                source,
            })?;

        Ok(ToolExit {
            code: status.code(),
            success: status.success(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn default_arguments_match_matlab_batch_invocation() {
        let tool = CommandTool::from(&ToolConfig::default());
        let args = tool.arguments(Path::new("/data/example_inputs/wave/build_inputs.m"));
        assert_eq!(tool.command(), "matlab");
        assert_eq!(
            args,
            vec![
                "-nosplash",
                "-nodesktop",
                "-r",
                "run('/data/example_inputs/wave/build_inputs.m'); exit;",
            ]
        );
    }

    #[test]
    fn run_expression_without_placeholder_is_passed_through() {
        let tool = CommandTool::new("octave", vec!["--eval".into()], "disp(1)");
        assert_eq!(tool.arguments(Path::new("/x.m")), vec!["--eval", "disp(1)"]);
    }

    #[tokio::test]
    async fn spawn_failure_names_command() {
        let tool = CommandTool::new("ib-no-such-binary-4242", vec![], "{script}");
        let err = tool.invoke(Path::new("/tmp/build_inputs.m")).await.unwrap_err();
        match err {
            InputBuilderError::ToolSpawn { command, .. } => {
                assert_eq!(command, "ib-no-such-binary-4242")
            }
            other => panic!("expected ToolSpawn, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_tool_writes_artifact_next_to_script() {
        let dir: PathBuf =
            std::env::temp_dir().join(format!("ib-tool-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let script = dir.join("build_inputs.m");
        std::fs::write(&script, "").unwrap();

        let tool = CommandTool::new(
            "sh",
            vec!["-c".into()],
            "printf built > \"$(dirname '{script}')/simulated_inputs.mat\"",
        );
        let exit = tool.invoke(&script).await.unwrap();

        assert!(exit.success);
        assert_eq!(exit.code, Some(0));
        assert_eq!(
            std::fs::read_to_string(dir.join("simulated_inputs.mat")).unwrap(),
            "built"
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let tool = CommandTool::new("sh", vec!["-c".into()], "exit 3");
        let exit = tool.invoke(Path::new("/unused.m")).await.unwrap();
        assert!(!exit.success);
        assert_eq!(exit.code, Some(3));
    }
}
