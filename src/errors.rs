use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Raised while loading or validating configuration. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} must be set")]
    Missing { key: &'static str },

    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// The dump process could not be run or exited unsuccessfully.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("failed to create dump output file {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    NonZeroExit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// The artifact could not be placed in object storage.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("artifact path has no file name: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("failed to read artifact {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("failed to put s3://{bucket}/{key}: {message}")]
    Put {
        bucket: String,
        key: String,
        message: String,
    },
}

/// A single webhook delivery failed. Never leaves the notifier.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("failed to build webhook payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Umbrella error surfaced to whoever triggered the backup run.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("database dump failed: {0}")]
    Dump(#[from] ExecutionError),

    #[error("upload to object storage failed: {0}")]
    Upload(#[from] UploadError),
}
