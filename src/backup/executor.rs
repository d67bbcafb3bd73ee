// dbbackup-agent/src/backup/executor.rs
use async_trait::async_trait;
use std::fs::File;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::backup::command::DumpCommand;
use crate::errors::ExecutionError;

/// Runs a dump command to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &DumpCommand) -> Result<(), ExecutionError>;
}

/// Spawns the dump as a child process with stdout redirected into the artifact file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &DumpCommand) -> Result<(), ExecutionError> {
        let output_file = File::create(&command.output).map_err(|source| ExecutionError::Output {
            path: command.output.clone(),
            source,
        })?;

        debug!(program = %command.program, path = %command.output.display(), "Spawning dump process");
        let child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::from(output_file))
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let result = match child {
            Ok(child) => match child.wait_with_output().await {
                Ok(output) if output.status.success() => Ok(()),
                Ok(output) => Err(ExecutionError::NonZeroExit {
                    program: command.program.clone(),
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                }),
                Err(source) => Err(ExecutionError::Spawn {
                    program: command.program.clone(),
                    source,
                }),
            },
            Err(source) => Err(ExecutionError::Spawn {
                program: command.program.clone(),
                source,
            }),
        };

        if result.is_err() {
            discard_partial_output(command);
        }
        result
    }
}

fn discard_partial_output(command: &DumpCommand) {
    if let Err(e) = std::fs::remove_file(&command.output) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %command.output.display(), error = %e, "Failed to remove partial dump file");
        }
    }
}
