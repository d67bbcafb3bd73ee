// dbbackup-agent/src/backup/command.rs
use std::fmt;
use std::path::{Path, PathBuf};

const CONTAINER_RUNTIME: &str = "docker";
const MASK: &str = "***";

/// A fully assembled dump invocation. Standard output goes to `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub output: PathBuf,
    /// `(argument index, visible prefix length)` for arguments carrying a secret.
    masked: Vec<(usize, usize)>,
}

impl DumpCommand {
    pub fn new(program: impl Into<String>, output: &Path) -> Self {
        DumpCommand {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            output: output.to_path_buf(),
            masked: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends every present token. Disabled flags arrive as `None` and leave no trace.
    pub fn flags<I>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        self.args.extend(flags.into_iter().flatten());
        self
    }

    /// Operator supplied options, split on whitespace and appended as-is.
    pub fn extra_options(mut self, options: &str) -> Self {
        self.args.extend(options.split_whitespace().map(str::to_string));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Appends `prefix` + `value` as one argument. Only the prefix is ever rendered.
    pub fn secret_arg(mut self, prefix: &str, value: &str) -> Self {
        self.masked.push((self.args.len(), prefix.len()));
        self.args.push(format!("{}{}", prefix, value));
        self
    }

    /// Wraps the invocation in `docker exec <container> ...`.
    ///
    /// Environment variables are forwarded by name so their values stay out of argv.
    pub fn in_container(self, container: &str) -> Self {
        let mut args = vec!["exec".to_string()];
        for (key, _) in &self.env {
            args.push("-e".to_string());
            args.push(key.clone());
        }
        args.push(container.to_string());
        args.push(self.program);
        let shift = args.len();
        args.extend(self.args);

        DumpCommand {
            program: CONTAINER_RUNTIME.to_string(),
            args,
            env: self.env,
            output: self.output,
            masked: self
                .masked
                .into_iter()
                .map(|(index, visible)| (index + shift, visible))
                .collect(),
        }
    }

    fn masked_prefix(&self, index: usize) -> Option<usize> {
        self.masked
            .iter()
            .find(|(masked, _)| *masked == index)
            .map(|(_, visible)| *visible)
    }
}

/// Shell-like rendering with credentials masked, for logs.
impl fmt::Display for DumpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, _) in &self.env {
            write!(f, "{}={} ", key, MASK)?;
        }
        write!(f, "{}", self.program)?;
        for (index, arg) in self.args.iter().enumerate() {
            match self.masked_prefix(index) {
                Some(visible) => write!(f, " {}{}", &arg[..visible], MASK)?,
                None => write!(f, " {}", arg)?,
            }
        }
        write!(f, " > {}", self.output.display())
    }
}

/// `Some(token)` when the option is enabled.
pub fn flag(enabled: bool, token: &str) -> Option<String> {
    enabled.then(|| token.to_string())
}
