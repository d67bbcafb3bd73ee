// dbbackup-agent/src/backup/naming.rs
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

const ARTIFACT_EXTENSION: &str = "sql";

/// A reserved location for one dump. The file only exists once the dump has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArtifact {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Reserves the artifact path for a dump starting now.
pub fn next_artifact(output_dir: &Path, filename_prefix: &str) -> BackupArtifact {
    artifact_at(output_dir, filename_prefix, Utc::now())
}

/// `<output_dir>/<prefix>-<ISO-8601 with ':' and '.' replaced by '-'>.sql`
///
/// Two calls within the same millisecond produce the same path.
pub fn artifact_at(output_dir: &Path, filename_prefix: &str, at: DateTime<Utc>) -> BackupArtifact {
    let timestamp = at.format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let file_name = format!("{}-{}.{}", filename_prefix, timestamp, ARTIFACT_EXTENSION);
    BackupArtifact {
        path: output_dir.join(file_name),
        created_at: at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_path_is_filesystem_safe_iso_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let artifact = artifact_at(Path::new("/var/backups"), "backup", at);

        assert_eq!(
            artifact.path,
            PathBuf::from("/var/backups/backup-2024-01-01T00-00-00-000Z.sql")
        );
        assert_eq!(artifact.created_at, at);
        let name = artifact.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(!name.contains(':'));
        assert_eq!(name.matches('.').count(), 1);
    }

    #[test]
    fn test_paths_differ_a_second_apart() {
        let first = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        let second = first + Duration::seconds(1);
        let dir = Path::new("./backups");

        assert_ne!(
            artifact_at(dir, "nightly", first).path,
            artifact_at(dir, "nightly", second).path
        );
    }

    #[test]
    fn test_same_instant_is_deterministic() {
        let at = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 5).unwrap();
        let dir = Path::new("out");
        assert_eq!(artifact_at(dir, "db", at), artifact_at(dir, "db", at));
    }

    #[test]
    fn test_next_artifact_uses_prefix_and_dir() {
        let artifact = next_artifact(Path::new("dumps"), "shop");
        assert!(artifact.path.starts_with("dumps"));
        let name = artifact.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("shop-"));
        assert!(name.ends_with("Z.sql"));
    }
}
