//! Binary rule-set compilation through the external `sing-box` tool.
//!
//! Command execution sits behind [`CommandExecutor`] so tests can mock the
//! tool without it being installed.

use anyhow::Result;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::error::RirsetError;

/// Output from command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Whether the command exited with status 0
    pub success: bool,
    /// The exit code, if the process was not killed by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Non-empty output lines, stdout first
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}

/// Trait for command execution, allowing dependency injection for testing.
#[cfg_attr(test, automock)]
pub trait CommandExecutor: Send + Sync {
    /// Run `cmd` with `args` and wait for it to finish.
    ///
    /// An `Err` means the process could not be started at all; a nonzero
    /// exit is reported through [`CommandOutput::success`].
    fn execute(&self, cmd: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs real processes with `std::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct RealCommandExecutor;

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, cmd: &str, args: &[String]) -> Result<CommandOutput> {
        let output = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// Compiles source rule-sets into `.srs` files.
pub struct RuleSetCompiler<E: CommandExecutor = RealCommandExecutor> {
    executor: E,
    binary: String,
}

impl RuleSetCompiler<RealCommandExecutor> {
    pub fn new(binary: &str) -> Self {
        Self::with_executor(binary, RealCommandExecutor)
    }
}

impl<E: CommandExecutor> RuleSetCompiler<E> {
    pub fn with_executor(binary: &str, executor: E) -> Self {
        Self {
            executor,
            binary: binary.to_string(),
        }
    }

    /// Arguments for `sing-box rule-set compile --output <output> <source>`
    fn compile_args(source: &Path, output: &Path) -> Vec<String> {
        vec![
            "rule-set".to_string(),
            "compile".to_string(),
            "--output".to_string(),
            output.to_string_lossy().into_owned(),
            source.to_string_lossy().into_owned(),
        ]
    }

    /// Compile `source` into `output`.
    ///
    /// A failed spawn or a nonzero exit is returned as
    /// [`RirsetError::Compile`]; the caller decides whether the run continues.
    pub fn compile(&self, source: &Path, output: &Path) -> crate::error::Result<()> {
        let args = Self::compile_args(source, output);
        debug!("Running {} {}", self.binary, args.join(" "));

        let result = self.executor.execute(&self.binary, &args).map_err(|e| {
            RirsetError::Compile(format!("failed to run {}: {}", self.binary, e))
        })?;

        for line in result.lines() {
            info!("{}: {}", self.binary, line);
        }

        if !result.success {
            let code = result
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let detail: Vec<&str> = result.lines().collect();
            return Err(RirsetError::Compile(format!(
                "{:?} exited with {}: {}",
                output.file_name().unwrap_or(output.as_os_str()),
                code,
                detail.join("; ")
            )));
        }

        info!("Compiled {:?}", output);
        Ok(())
    }
}
