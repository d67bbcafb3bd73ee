pub mod logging;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use which::which;

use crate::config::{EngineSettings, ExecutionMode};

/// Creates the backup output directory. Failure here is fatal for the agent.
pub fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "Failed to create backup output directory: {}",
            output_dir.display()
        )
    })?;
    info!(path = %output_dir.display(), "📂 Backup output directory ready");
    Ok(())
}

/// The executable the configured engine will spawn: the dump tool itself, or
/// the container runtime in containerized mode.
pub fn required_executable(engine: &EngineSettings) -> &'static str {
    let (mode, tool) = match engine {
        EngineSettings::MySql(cfg) => (&cfg.mode, "mysqldump"),
        EngineSettings::Postgres(cfg) => (&cfg.mode, "pg_dump"),
    };
    match mode {
        ExecutionMode::Local => tool,
        ExecutionMode::Containerized { .. } => "docker",
    }
}

/// Looks the executable up on PATH. A missing tool is reported but not fatal:
/// it may be installed before the next scheduled run.
pub fn check_executable(name: &str) -> Option<PathBuf> {
    match which(name) {
        Ok(path) => {
            info!(executable = name, path = %path.display(), "Found dump executable");
            Some(path)
        }
        Err(_) => {
            warn!(
                executable = name,
                "{} not found in PATH. Backups will fail until it is installed.", name
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, PostgresDumpOptions};
    use tempfile::TempDir;

    #[test]
    fn test_prepare_output_dir_creates_nested_dirs() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        let target = root.path().join("a").join("b");

        prepare_output_dir(&target)?;
        prepare_output_dir(&target)?;

        assert!(target.is_dir());
        Ok(())
    }

    #[test]
    fn test_prepare_output_dir_fails_on_file() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        let file = root.path().join("occupied");
        fs::write(&file, b"x")?;

        assert!(prepare_output_dir(&file).is_err());
        Ok(())
    }

    #[test]
    fn test_required_executable_follows_mode() {
        let mut cfg = EngineConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "shop".to_string(),
            mode: ExecutionMode::Local,
            dump_options: PostgresDumpOptions::default(),
        };
        assert_eq!(required_executable(&EngineSettings::Postgres(cfg.clone())), "pg_dump");

        cfg.mode = ExecutionMode::Containerized {
            container: "pg1".to_string(),
        };
        assert_eq!(required_executable(&EngineSettings::Postgres(cfg)), "docker");
    }

    #[test]
    fn test_check_executable_missing() {
        assert!(check_executable("definitely-not-a-dump-tool").is_none());
    }
}
