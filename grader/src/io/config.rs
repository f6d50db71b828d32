//! Grader configuration stored under `.grader/config.toml`.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::io::process::CommandLimits;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".grader/config.toml";

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));
static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("extension regex"));

/// Grader configuration (TOML).
///
/// Command argv entries are minijinja templates rendered with `source`,
/// `driver`, `workspace`, `unit` and `callable`. Missing fields default to the
/// bundled Python driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GraderConfig {
    /// Unit name the candidate is compiled under; also the source file stem.
    pub unit_name: String,

    /// Extension of the written candidate source file.
    pub source_extension: String,

    /// Wall-clock budget per command (compile, symbols, each invocation).
    pub command_timeout_secs: u64,

    /// Keep at most this many bytes of each command's stdout/stderr.
    pub output_limit_bytes: usize,

    /// Syntax/compile check. An empty command skips the check.
    pub compile: CommandConfig,

    /// Prints the unit's symbol table as JSON.
    pub symbols: CommandConfig,

    /// Runs one invocation: JSON request on stdin, JSON response on stdout.
    pub invoke: CommandConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    pub command: Vec<String>,
}

impl CommandConfig {
    fn new(args: &[&str]) -> Self {
        Self {
            command: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            unit_name: crate::engine::DEFAULT_UNIT_NAME.to_string(),
            source_extension: "py".to_string(),
            command_timeout_secs: 10,
            output_limit_bytes: 100_000,
            compile: CommandConfig::new(&["python3", "-m", "py_compile", "{{ source }}"]),
            symbols: CommandConfig::new(&["python3", "{{ driver }}", "symbols", "{{ source }}"]),
            invoke: CommandConfig::new(&["python3", "{{ driver }}", "invoke", "{{ source }}"]),
        }
    }
}

impl GraderConfig {
    pub fn validate(&self) -> Result<()> {
        if !IDENTIFIER_RE.is_match(&self.unit_name) {
            return Err(anyhow!("unit_name must be an identifier"));
        }
        if !EXTENSION_RE.is_match(&self.source_extension) {
            return Err(anyhow!("source_extension must be alphanumeric"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self
            .compile
            .command
            .first()
            .is_some_and(|program| program.trim().is_empty())
        {
            return Err(anyhow!("compile.command must be empty or start with a program"));
        }
        for (label, command) in [("symbols", &self.symbols), ("invoke", &self.invoke)] {
            if command.command.is_empty() || command.command[0].trim().is_empty() {
                return Err(anyhow!("{label}.command must be a non-empty array"));
            }
        }
        Ok(())
    }

    pub fn limits(&self) -> CommandLimits {
        CommandLimits {
            timeout: Duration::from_secs(self.command_timeout_secs),
            output_limit_bytes: self.output_limit_bytes,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GraderConfig::default()`.
pub fn load_config(path: &Path) -> Result<GraderConfig> {
    if !path.exists() {
        let cfg = GraderConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GraderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &GraderConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf).with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
