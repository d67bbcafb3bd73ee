// dbbackup-agent/src/config/mod.rs
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use cron::Schedule;
use url::Url;

use crate::errors::ConfigError;

const DEFAULT_SCHEDULE: &str = "0 0 * * *";
const DEFAULT_MYSQL_DUMP_OPTIONS: &str = "--single-transaction --quick --lock-tables=false";
const DEFAULT_POSTGRES_DUMP_OPTIONS: &str = "--clean --if-exists";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    MySql,
    Postgres,
}

/// Where the dump tool runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run the tool on this host against a network-reachable server.
    Local,
    /// Run the tool inside an already running container bound to the server.
    Containerized { container: String },
}

#[derive(Debug, Clone)]
pub struct EngineConfig<O> {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub mode: ExecutionMode,
    pub dump_options: O,
}

#[derive(Debug, Clone, Default)]
pub struct MySqlDumpOptions {
    pub compress: bool,
    pub add_drop_table: bool,
    pub add_locks: bool,
    pub extended_insert: bool,
    pub complete_insert: bool,
    pub create_options: bool,
    pub disable_keys: bool,
    pub set_charset: bool,
    pub delayed_insert: bool,
    pub replace: bool,
    pub ignore_table: Option<String>,
    pub additional_options: String,
}

#[derive(Debug, Clone, Default)]
pub struct PostgresDumpOptions {
    pub schema_only: bool,
    pub data_only: bool,
    pub no_owner: bool,
    pub no_privileges: bool,
    pub no_tablespaces: bool,
    pub ignore_table: Option<String>,
    pub additional_options: String,
}

/// Only the engine selected by `DATABASE_TYPE` is loaded.
#[derive(Debug, Clone)]
pub enum EngineSettings {
    MySql(EngineConfig<MySqlDumpOptions>),
    Postgres(EngineConfig<PostgresDumpOptions>),
}

#[derive(Debug, Clone)]
pub struct BackupSettings {
    pub output_dir: PathBuf,
    pub filename_prefix: String,
    /// Carried for operators and external cleanup jobs; the agent never deletes backups.
    pub retention_days: u32,
    pub schedule: Schedule,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub path_prefix: String,
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub webhook_url: String,
}

#[derive(Debug, Clone)]
pub struct GoogleChatConfig {
    pub webhook_url: String,
    pub thread_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub on_success: bool,
    pub on_error: bool,
    pub slack: Option<SlackConfig>,
    pub google_chat: Option<GoogleChatConfig>,
}

/// Immutable settings built once at startup and handed to the components that need them.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub engine: EngineSettings,
    pub backup: BackupSettings,
    /// `None` when object storage is disabled.
    pub s3: Option<S3Config>,
    pub logging: LoggingConfig,
    pub notification: NotificationConfig,
}

impl AppConfig {
    /// Loads configuration from the process environment (after `.env` has been applied).
    pub fn load_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let engine = match vars.string("DATABASE_TYPE", "mysql").to_lowercase().as_str() {
            "mysql" => EngineSettings::MySql(load_mysql(&vars)?),
            "postgresql" | "postgres" => EngineSettings::Postgres(load_postgres(&vars)?),
            other => {
                return Err(ConfigError::Invalid {
                    key: "DATABASE_TYPE",
                    value: other.to_string(),
                    reason: "expected 'mysql' or 'postgresql'".to_string(),
                });
            }
        };

        let schedule_expr = vars.string("BACKUP_SCHEDULE", DEFAULT_SCHEDULE);
        let backup = BackupSettings {
            output_dir: PathBuf::from(vars.string("BACKUP_OUTPUT_DIR", "./backups")),
            filename_prefix: vars.string("BACKUP_FILENAME_PREFIX", "backup"),
            retention_days: vars.number("BACKUP_RETENTION_DAYS", 7)?,
            schedule: parse_schedule(&schedule_expr)?,
        };

        let s3 = if vars.flag("S3_ENABLED", false) {
            Some(S3Config {
                bucket: vars.required("S3_BUCKET")?,
                region: vars.string("S3_REGION", "us-east-1"),
                access_key_id: vars.string("S3_ACCESS_KEY_ID", ""),
                secret_access_key: vars.secret("S3_SECRET_ACCESS_KEY"),
                path_prefix: vars.string("S3_PATH", "backups/"),
                endpoint_url: vars
                    .optional("S3_ENDPOINT")
                    .map(|endpoint| validate_url("S3_ENDPOINT", endpoint))
                    .transpose()?,
            })
        } else {
            None
        };

        let format = match vars.string("LOG_FORMAT", "pretty").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" | "text" => LogFormat::Pretty,
            other => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected 'json' or 'pretty'".to_string(),
                });
            }
        };
        let logging = LoggingConfig {
            level: vars.string("LOG_LEVEL", "info"),
            format,
        };

        let slack = if vars.flag("NOTIFICATION_SLACK_ENABLED", false) {
            Some(SlackConfig {
                webhook_url: validate_url(
                    "NOTIFICATION_SLACK_WEBHOOK_URL",
                    vars.required("NOTIFICATION_SLACK_WEBHOOK_URL")?,
                )?,
            })
        } else {
            None
        };
        let google_chat = if vars.flag("NOTIFICATION_GOOGLE_CHAT_ENABLED", false) {
            Some(GoogleChatConfig {
                webhook_url: validate_url(
                    "NOTIFICATION_GOOGLE_CHAT_WEBHOOK_URL",
                    vars.required("NOTIFICATION_GOOGLE_CHAT_WEBHOOK_URL")?,
                )?,
                thread_key: vars.optional("NOTIFICATION_GOOGLE_CHAT_THREAD_KEY"),
            })
        } else {
            None
        };
        let notification = NotificationConfig {
            enabled: vars.flag("NOTIFICATION_ENABLED", true),
            on_success: vars.flag("NOTIFICATION_SUCCESS", true),
            on_error: vars.flag("NOTIFICATION_ERROR", true),
            slack,
            google_chat,
        };

        Ok(AppConfig {
            engine,
            backup,
            s3,
            logging,
            notification,
        })
    }

    pub fn database_type(&self) -> DatabaseType {
        match self.engine {
            EngineSettings::MySql(_) => DatabaseType::MySql,
            EngineSettings::Postgres(_) => DatabaseType::Postgres,
        }
    }
}

fn load_mysql<F>(vars: &Vars<F>) -> Result<EngineConfig<MySqlDumpOptions>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let dump_options = MySqlDumpOptions {
        compress: vars.flag("MYSQL_DUMP_COMPRESS", true),
        add_drop_table: vars.flag("MYSQL_DUMP_ADD_DROP_TABLE", true),
        add_locks: vars.flag("MYSQL_DUMP_ADD_LOCKS", true),
        extended_insert: vars.flag("MYSQL_DUMP_EXTENDED_INSERT", true),
        complete_insert: vars.flag("MYSQL_DUMP_COMPLETE_INSERT", false),
        create_options: vars.flag("MYSQL_DUMP_CREATE_OPTIONS", true),
        disable_keys: vars.flag("MYSQL_DUMP_DISABLE_KEYS", true),
        set_charset: vars.flag("MYSQL_DUMP_SET_CHARSET", true),
        delayed_insert: vars.flag("MYSQL_DUMP_DELAYED_INSERT", false),
        replace: vars.flag("MYSQL_DUMP_REPLACE", false),
        ignore_table: vars.optional("MYSQL_DUMP_IGNORE_TABLE"),
        additional_options: vars.string("MYSQL_DUMP_OPTIONS", DEFAULT_MYSQL_DUMP_OPTIONS),
    };

    let config = EngineConfig {
        host: vars.string("MYSQL_HOST", "localhost"),
        port: vars.number("MYSQL_PORT", 3306)?,
        user: vars.string("MYSQL_USER", "root"),
        password: vars.secret("MYSQL_PASSWORD"),
        database: vars.required("MYSQL_DATABASE")?,
        mode: load_mode(vars, "MYSQL_USE_DOCKER", "MYSQL_DOCKER_CONTAINER", "mysql-container"),
        dump_options,
    };
    Ok(config)
}

fn load_postgres<F>(vars: &Vars<F>) -> Result<EngineConfig<PostgresDumpOptions>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let dump_options = PostgresDumpOptions {
        schema_only: vars.flag("POSTGRES_DUMP_SCHEMA_ONLY", false),
        data_only: vars.flag("POSTGRES_DUMP_DATA_ONLY", false),
        no_owner: vars.flag("POSTGRES_DUMP_NO_OWNER", true),
        no_privileges: vars.flag("POSTGRES_DUMP_NO_PRIVILEGES", true),
        no_tablespaces: vars.flag("POSTGRES_DUMP_NO_TABLESPACES", true),
        ignore_table: vars.optional("POSTGRES_DUMP_IGNORE_TABLE"),
        additional_options: vars.string("POSTGRES_DUMP_OPTIONS", DEFAULT_POSTGRES_DUMP_OPTIONS),
    };
    if dump_options.schema_only && dump_options.data_only {
        return Err(ConfigError::Invalid {
            key: "POSTGRES_DUMP_DATA_ONLY",
            value: "true".to_string(),
            reason: "cannot be combined with POSTGRES_DUMP_SCHEMA_ONLY".to_string(),
        });
    }

    let config = EngineConfig {
        host: vars.string("POSTGRES_HOST", "localhost"),
        port: vars.number("POSTGRES_PORT", 5432)?,
        user: vars.string("POSTGRES_USER", "postgres"),
        password: vars.secret("POSTGRES_PASSWORD"),
        database: vars.required("POSTGRES_DATABASE")?,
        mode: load_mode(
            vars,
            "POSTGRES_USE_DOCKER",
            "POSTGRES_DOCKER_CONTAINER",
            "postgres-container",
        ),
        dump_options,
    };
    Ok(config)
}

fn load_mode<F>(
    vars: &Vars<F>,
    use_docker_key: &'static str,
    container_key: &'static str,
    default_container: &str,
) -> ExecutionMode
where
    F: Fn(&str) -> Option<String>,
{
    if vars.flag(use_docker_key, false) {
        ExecutionMode::Containerized {
            container: vars.string(container_key, default_container),
        }
    } else {
        ExecutionMode::Local
    }
}

/// Parses a cron expression. Classic five-field expressions get a leading seconds field.
pub fn parse_schedule(expr: &str) -> Result<Schedule, ConfigError> {
    let trimmed = expr.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    };
    Schedule::from_str(&normalized).map_err(|e| ConfigError::Invalid {
        key: "BACKUP_SCHEDULE",
        value: expr.to_string(),
        reason: e.to_string(),
    })
}

fn validate_url(key: &'static str, value: String) -> Result<String, ConfigError> {
    match Url::parse(&value) {
        Ok(_) => Ok(value),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }),
    }
}

/// Key lookup where an empty value counts as unset.
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Credentials are taken byte for byte; only an empty value counts as unset.
    fn secret(&self, key: &str) -> String {
        (self.lookup)(key).unwrap_or_default()
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing { key })
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        self.optional(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(default)
    }

    fn number<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }
}
