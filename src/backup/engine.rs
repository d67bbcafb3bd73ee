// dbbackup-agent/src/backup/engine.rs
use std::path::Path;

use crate::backup::command::{DumpCommand, flag};
use crate::config::{EngineConfig, ExecutionMode, MySqlDumpOptions, PostgresDumpOptions};

/// Everything that differs between database engines: the dump invocation and how
/// the engine is named in messages.
pub trait EngineStrategy: Send + Sync {
    type Options: Send + Sync;

    fn display_name(&self) -> &'static str;

    /// Name of the dump executable.
    fn tool(&self) -> &'static str;

    fn config(&self) -> &EngineConfig<Self::Options>;

    fn local_command(&self, output: &Path) -> DumpCommand;

    fn containerized_command(&self, container: &str, output: &Path) -> DumpCommand;

    fn build_command(&self, output: &Path) -> DumpCommand {
        match &self.config().mode {
            ExecutionMode::Local => self.local_command(output),
            ExecutionMode::Containerized { container } => {
                self.containerized_command(container, output)
            }
        }
    }

    fn database(&self) -> &str {
        &self.config().database
    }
}

pub struct MySqlEngine {
    config: EngineConfig<MySqlDumpOptions>,
}

impl MySqlEngine {
    pub fn new(config: EngineConfig<MySqlDumpOptions>) -> Self {
        MySqlEngine { config }
    }

    fn dump_flags(&self) -> Vec<Option<String>> {
        let opts = &self.config.dump_options;
        vec![
            flag(opts.compress, "--compress"),
            flag(opts.add_drop_table, "--add-drop-table"),
            flag(opts.add_locks, "--add-locks"),
            flag(opts.extended_insert, "--extended-insert"),
            flag(opts.complete_insert, "--complete-insert"),
            flag(opts.create_options, "--create-options"),
            flag(opts.disable_keys, "--disable-keys"),
            flag(opts.set_charset, "--set-charset"),
            flag(opts.delayed_insert, "--delayed-insert"),
            flag(opts.replace, "--replace"),
            opts.ignore_table
                .as_ref()
                .map(|table| format!("--ignore-table={}.{}", self.config.database, table)),
        ]
    }

    fn credentials(&self, cmd: DumpCommand) -> DumpCommand {
        let cmd = cmd.arg(format!("-u{}", self.config.user));
        if self.config.password.is_empty() {
            cmd
        } else {
            cmd.secret_arg("-p", &self.config.password)
        }
    }

    fn finish(&self, cmd: DumpCommand) -> DumpCommand {
        cmd.flags(self.dump_flags())
            .extra_options(&self.config.dump_options.additional_options)
            .arg(self.config.database.clone())
    }
}

impl EngineStrategy for MySqlEngine {
    type Options = MySqlDumpOptions;

    fn display_name(&self) -> &'static str {
        "MySQL"
    }

    fn tool(&self) -> &'static str {
        "mysqldump"
    }

    fn config(&self) -> &EngineConfig<MySqlDumpOptions> {
        &self.config
    }

    fn local_command(&self, output: &Path) -> DumpCommand {
        let cmd = DumpCommand::new(self.tool(), output)
            .arg(format!("-h{}", self.config.host))
            .arg(format!("-P{}", self.config.port));
        self.finish(self.credentials(cmd))
    }

    fn containerized_command(&self, container: &str, output: &Path) -> DumpCommand {
        let cmd = DumpCommand::new(self.tool(), output);
        self.finish(self.credentials(cmd)).in_container(container)
    }
}

pub struct PostgresEngine {
    config: EngineConfig<PostgresDumpOptions>,
}

impl PostgresEngine {
    pub fn new(config: EngineConfig<PostgresDumpOptions>) -> Self {
        PostgresEngine { config }
    }

    fn dump_flags(&self) -> Vec<Option<String>> {
        let opts = &self.config.dump_options;
        vec![
            flag(opts.schema_only, "--schema-only"),
            flag(opts.data_only, "--data-only"),
            flag(opts.no_owner, "--no-owner"),
            flag(opts.no_privileges, "--no-privileges"),
            flag(opts.no_tablespaces, "--no-tablespaces"),
            opts.ignore_table
                .as_ref()
                .map(|table| format!("--exclude-table={}", table)),
        ]
    }

    fn finish(&self, cmd: DumpCommand) -> DumpCommand {
        cmd.arg(format!("-U{}", self.config.user))
            .flags(self.dump_flags())
            .extra_options(&self.config.dump_options.additional_options)
            .arg(self.config.database.clone())
    }
}

impl EngineStrategy for PostgresEngine {
    type Options = PostgresDumpOptions;

    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn tool(&self) -> &'static str {
        "pg_dump"
    }

    fn config(&self) -> &EngineConfig<PostgresDumpOptions> {
        &self.config
    }

    // pg_dump reads the password from PGPASSWORD rather than a flag.
    fn local_command(&self, output: &Path) -> DumpCommand {
        let mut cmd = DumpCommand::new(self.tool(), output);
        if !self.config.password.is_empty() {
            cmd = cmd.env("PGPASSWORD", self.config.password.clone());
        }
        let cmd = cmd
            .arg(format!("-h{}", self.config.host))
            .arg(format!("-p{}", self.config.port));
        self.finish(cmd)
    }

    // The container is expected to authenticate local connections on its own.
    fn containerized_command(&self, container: &str, output: &Path) -> DumpCommand {
        self.finish(DumpCommand::new(self.tool(), output))
            .in_container(container)
    }
}
