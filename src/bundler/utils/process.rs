//! External tool invocation with captured output.
//!
//! Every native tool call goes through [`ToolCommand`]: the exit status and
//! both output streams are captured, and failures are surfaced verbatim in
//! a fixed diagnostic layout. Tool-specific output is never parsed here.

use crate::bundler::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// A command line for one native tool.
#[derive(Clone, Debug)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    /// Starts a command for `program`.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends `flag` followed by `value`.
    pub fn opt(self, flag: &str, value: impl AsRef<OsStr>) -> Self {
        self.arg(flag).arg(value)
    }

    /// The executable this command runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments in order.
    #[cfg(test)]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// True when `flag` appears among the arguments.
    #[cfg(test)]
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a.as_os_str() == OsStr::new(flag))
    }

    /// Value following the first occurrence of `flag`.
    #[cfg(test)]
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a.as_os_str() == OsStr::new(flag))
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    /// Every value following an occurrence of `flag`, in order.
    #[cfg(test)]
    pub fn values_of(&self, flag: &str) -> Vec<&OsStr> {
        self.args
            .windows(2)
            .filter(|pair| pair[0].as_os_str() == OsStr::new(flag))
            .map(|pair| pair[1].as_os_str())
            .collect()
    }

    /// Runs the command to completion, capturing stdout and stderr.
    ///
    /// Only a failure to launch is an error here; a non-zero exit is
    /// reported through [`ToolOutput::success`]. Dropping the returned
    /// future kills the tool.
    pub async fn output(&self) -> std::io::Result<ToolOutput> {
        log::debug!("Running: {}", self);

        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(ToolOutput {
            command: self.to_string(),
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Runs a build tool, mapping launch failures and non-zero exits to
    /// [`Error::BuildTool`] named `tool`.
    pub async fn run(&self, tool: &str) -> Result<ToolOutput> {
        let output = self.output().await.map_err(|e| Error::BuildTool {
            tool: tool.to_string(),
            diagnostic: launch_diagnostic(self, &e),
        })?;

        if !output.success() {
            let diagnostic = output.diagnostic();
            log::error!("{tool} failed:\n{diagnostic}");
            return Err(Error::BuildTool {
                tool: tool.to_string(),
                diagnostic,
            });
        }

        Ok(output)
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Diagnostic for a tool that could not be started at all.
pub fn launch_diagnostic(command: &ToolCommand, error: &std::io::Error) -> String {
    if error.kind() == std::io::ErrorKind::NotFound {
        format!("{} not found", command.program().display())
    } else {
        format!("failed to launch {}: {}", command.program().display(), error)
    }
}

/// Captured result of a finished tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Command line that ran.
    pub command: String,
    /// Exit status.
    pub status: ExitStatus,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl ToolOutput {
    /// True when the tool exited with status 0.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Formats command, exit code and both streams for the operator.
    pub fn diagnostic(&self) -> String {
        let code = match self.status.code() {
            Some(code) => code.to_string(),
            None => "terminated by signal".to_string(),
        };

        let mut out = format!("Command: {}\nReturn Code: {}\n", self.command, code);
        out.push_str("Standard Output:\n");
        out.push_str(&indent_stream(&self.stdout));
        out.push_str("Standard Error:\n");
        out.push_str(&indent_stream(&self.stderr));
        out
    }
}

fn indent_stream(stream: &str) -> String {
    let lines: Vec<_> = stream.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return "    None\n".to_string();
    }
    lines.iter().map(|l| format!("    {l}\n")).collect()
}
