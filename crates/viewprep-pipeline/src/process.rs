use std::{
    fmt,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::error::PipelineError;

/// An external command line with its working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    /// The executable
    pub program: String,
    /// The arguments, in order
    pub args: Vec<String>,
    /// Working directory of the child, inherited if `None`
    pub current_dir: Option<PathBuf>,
}

impl StageCommand {
    /// Create a command without arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a `--name value` option.
    pub fn opt(self, name: &str, value: impl fmt::Display) -> Self {
        self.arg(format!("--{name}")).arg(value.to_string())
    }

    /// Append a `--name path` option.
    pub fn path_opt(self, name: &str, path: &Path) -> Self {
        self.arg(format!("--{name}"))
            .arg(path.to_string_lossy().into_owned())
    }

    /// Append a `--name 0|1` option.
    pub fn flag_opt(self, name: &str, value: bool) -> Self {
        self.opt(name, value as u8)
    }

    /// Set the working directory of the child process.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// The engine subcommand, i.e. the first argument.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// The value following `--name`, if present.
    pub fn option(&self, name: &str) -> Option<&str> {
        let flag = format!("--{name}");
        self.args
            .iter()
            .position(|a| *a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for StageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// The outcome of an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    /// Exit code, `None` if terminated by a signal
    pub exit_code: Option<i32>,
    /// Captured standard error
    pub stderr: String,
}

impl StageOutput {
    /// Whether the command exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external commands synchronously.
pub trait CommandRunner {
    /// Run `command` to completion and report its outcome.
    ///
    /// A non-zero exit is not an error at this level; errors are reserved
    /// for commands that could not be run at all.
    fn run(&mut self, command: &StageCommand) -> Result<StageOutput, PipelineError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run(&mut self, command: &StageCommand) -> Result<StageOutput, PipelineError> {
        (**self).run(command)
    }
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, command: &StageCommand) -> Result<StageOutput, PipelineError> {
        let mut child = Command::new(&command.program);
        child
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.current_dir {
            child.current_dir(dir);
        }

        let output = child.output().map_err(|source| PipelineError::Spawn {
            command: command.to_string(),
            source,
        })?;

        Ok(StageOutput {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run `command` and turn a non-zero exit into [`PipelineError::ExternalStageFailed`].
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &mut R,
    command: &StageCommand,
) -> Result<StageOutput, PipelineError> {
    log::debug!("running `{command}`");
    let output = runner.run(command)?;
    if !output.success() {
        log::error!("`{command}` exited with {:?}", output.exit_code);
        return Err(PipelineError::ExternalStageFailed {
            command: command.to_string(),
            exit_code: output.exit_code,
            stderr: output.stderr,
        });
    }
    log::info!("command `{}` executed successfully", command);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = StageCommand::new("colmap")
            .arg("feature_extractor")
            .path_opt("database_path", Path::new("/tmp/run/database.db"))
            .opt("SiftExtraction.max_num_features", 32768)
            .flag_opt("SiftExtraction.use_gpu", true);
        assert_eq!(cmd.subcommand(), Some("feature_extractor"));
        assert_eq!(cmd.option("database_path"), Some("/tmp/run/database.db"));
        assert_eq!(cmd.option("SiftExtraction.use_gpu"), Some("1"));
        assert_eq!(cmd.option("missing"), None);
        assert_eq!(
            cmd.to_string(),
            "colmap feature_extractor --database_path /tmp/run/database.db \
             --SiftExtraction.max_num_features 32768 --SiftExtraction.use_gpu 1"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_exit_codes() -> Result<(), PipelineError> {
        let mut runner = ProcessRunner;

        let ok = StageCommand::new("sh").arg("-c").arg("exit 0");
        assert!(run_checked(&mut runner, &ok)?.success());

        let failing = StageCommand::new("sh")
            .arg("-c")
            .arg("echo 'no CUDA device' >&2; exit 3");
        match run_checked(&mut runner, &failing) {
            Err(PipelineError::ExternalStageFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "no CUDA device\n");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_process_runner_missing_binary() {
        let mut runner = ProcessRunner;
        let cmd = StageCommand::new("definitely-not-a-real-binary-4242");
        assert!(matches!(
            runner.run(&cmd),
            Err(PipelineError::Spawn { .. })
        ));
    }
}
