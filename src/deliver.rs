//! Delivery of the converted artifact. The sink is a black box: an external command.

use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::info;

/// Errors from a delivery sink. Maps to CLI exit code 3.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery command is empty.")]
    EmptyCommand,

    #[error("Could not run delivery command {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Delivery command {program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Hands a finished artifact to whatever sends it on.
pub trait DeliverySink {
    fn deliver(
        &self,
        title: &str,
        artifact: &Path,
        credentials: Option<&Path>,
    ) -> Result<(), DeliveryError>;
}

/// Runs `<program> [args...] <title> <artifact> [credentials]`.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a configured command line on whitespace. No shell quoting.
    pub fn from_command_line(cmd: &str) -> Result<Self, DeliveryError> {
        let mut parts = cmd.split_whitespace().map(String::from);
        let program = parts.next().ok_or(DeliveryError::EmptyCommand)?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl DeliverySink for CommandSink {
    fn deliver(
        &self,
        title: &str,
        artifact: &Path,
        credentials: Option<&Path>,
    ) -> Result<(), DeliveryError> {
        info!(program = %self.program, artifact = %artifact.display(), "delivering");
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(title).arg(artifact);
        if let Some(c) = credentials {
            cmd.arg(c);
        }
        let out = cmd.output().map_err(|e| DeliveryError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;
        if out.status.success() {
            Ok(())
        } else {
            Err(DeliveryError::Failed {
                program: self.program.clone(),
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_is_split_on_whitespace() -> Result<(), DeliveryError> {
        let sink = CommandSink::from_command_line("  send-ebook  --to me@example.com ")?;
        assert_eq!(sink.program(), "send-ebook");
        assert_eq!(sink.args(), ["--to", "me@example.com"]);
        Ok(())
    }

    #[test]
    fn blank_command_is_rejected() {
        assert!(matches!(
            CommandSink::from_command_line("   "),
            Err(DeliveryError::EmptyCommand)
        ));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let sink = CommandSink::new("storyscrape-no-such-sender-xyz", vec![]);
        assert!(matches!(
            sink.deliver("T", Path::new("t.mobi"), None),
            Err(DeliveryError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn receives_title_artifact_and_credentials() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let log = dir.path().join("args.txt");
        let script = format!("printf '%s\\n' \"$@\" > {}", log.display());
        let sink = CommandSink::new("sh", vec!["-c".into(), script, "sh".into()]);
        sink.deliver(
            "My Story",
            Path::new("out/my-story.mobi"),
            Some(Path::new("creds.toml")),
        )?;
        let args = std::fs::read_to_string(&log)?;
        assert_eq!(args, "My Story\nout/my-story.mobi\ncreds.toml\n");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_reported() {
        let sink = CommandSink::new("false", vec![]);
        assert!(matches!(
            sink.deliver("T", Path::new("t.mobi"), None),
            Err(DeliveryError::Failed { .. })
        ));
    }
}
