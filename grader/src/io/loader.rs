//! Subprocess-backed compiler/loader.
//!
//! `compile` acquires a temporary workspace, writes the candidate source and
//! the bundled driver into it, and runs the configured check command. The
//! resulting [`ProcessUnit`] owns the workspace; dropping it deletes every
//! artifact.
//!
//! The first invocation starts the rendered invoke command and keeps it
//! running, so module and instance state persist across the unit's cases. The
//! process speaks a line-delimited JSON protocol:
//!
//! - one request per stdin line: `{"callable", "parameters", "returns",
//!   "args"}` with arguments in their listy form,
//! - one response per request as a stdout line: `{"ok": value}` or
//!   `{"error": message}`. Other stdout lines are skipped.
//!
//! A timed-out or exited process is discarded; the next invocation starts a
//! new one.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use minijinja::{Environment, UndefinedBehavior, context};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::core::codec;
use crate::core::descriptor::RuntimeKind;
use crate::core::error::LoaderError;
use crate::core::signature::{CallableSpec, Symbol};
use crate::core::value::Value;
use crate::engine::{Loader, Unit};
use crate::io::config::GraderConfig;
use crate::io::process::{CommandOutput, LineSession, SessionRead, run_command_with_timeout};

const PYTHON_DRIVER: &str = include_str!("../../assets/python/driver.py");

/// File name of the driver inside a unit workspace.
pub const DRIVER_FILE: &str = "grader_driver.py";

/// Loader that compiles and runs candidates through configured commands.
pub struct ProcessLoader {
    config: GraderConfig,
}

impl ProcessLoader {
    pub fn new(config: GraderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GraderConfig {
        &self.config
    }
}

impl Loader for ProcessLoader {
    type Unit = ProcessUnit;

    fn unit_name(&self) -> &str {
        &self.config.unit_name
    }

    #[instrument(skip_all, fields(unit = unit_name))]
    fn compile(&self, unit_name: &str, source: &str) -> Result<ProcessUnit, LoaderError> {
        let workspace = tempfile::Builder::new()
            .prefix("grader-")
            .tempdir()
            .map_err(|err| LoaderError::Io(format!("create workspace: {err}")))?;
        let source_path = workspace
            .path()
            .join(format!("{unit_name}.{}", self.config.source_extension));
        let driver_path = workspace.path().join(DRIVER_FILE);
        write_file(&source_path, source)?;
        write_file(&driver_path, PYTHON_DRIVER)?;

        let unit = ProcessUnit {
            session: None,
            workspace,
            source_path,
            driver_path,
            unit_name: unit_name.to_string(),
            config: self.config.clone(),
        };
        debug!(workspace = %unit.workspace().display(), "unit workspace ready");

        if self.config.compile.command.is_empty() {
            return Ok(unit);
        }
        let output = unit.run(&self.config.compile.command, "", None)?;
        if output.timed_out {
            return Err(LoaderError::Compile(format!(
                "timed out after {}s",
                self.config.command_timeout_secs
            )));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "compile check failed");
            return Err(LoaderError::Compile(output.failure_detail()));
        }
        info!("candidate compiled");
        Ok(unit)
    }
}

/// A compiled candidate living in its own temporary workspace.
pub struct ProcessUnit {
    // Declared before the workspace so the driver is killed before the
    // directory is removed.
    session: Option<DriverSession>,
    workspace: TempDir,
    source_path: PathBuf,
    driver_path: PathBuf,
    unit_name: String,
    config: GraderConfig,
}

/// Running invoke process, bound to the callable its command was rendered for.
struct DriverSession {
    callable: String,
    process: LineSession,
}

/// How one request/response exchange ended.
enum Exchange {
    Response(InvokeResponse),
    TimedOut,
    Oversized(usize),
    Exited(CommandOutput),
}

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    callable: &'a str,
    parameters: &'a [RuntimeKind],
    returns: RuntimeKind,
    args: Vec<Json>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum InvokeResponse {
    Ok(Json),
    Error(String),
}

impl ProcessUnit {
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    fn render_command(&self, template: &[String], callable: &str) -> Result<Command, LoaderError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        let ctx = context! {
            source => self.source_path.display().to_string(),
            driver => self.driver_path.display().to_string(),
            workspace => self.workspace.path().display().to_string(),
            unit => self.unit_name.as_str(),
            callable => callable,
        };
        let argv = template
            .iter()
            .map(|arg| env.render_str(arg, &ctx))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| LoaderError::Io(format!("render command: {err}")))?;
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| LoaderError::Io("empty command".to_string()))?;
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(self.workspace.path());
        Ok(cmd)
    }

    fn run(
        &self,
        template: &[String],
        callable: &str,
        stdin: Option<Vec<u8>>,
    ) -> Result<CommandOutput, LoaderError> {
        let cmd = self.render_command(template, callable)?;
        run_command_with_timeout(cmd, stdin, self.config.limits())
            .map_err(|err| LoaderError::Io(format!("{err:#}")))
    }

    /// The running driver for `callable`, started on first use.
    fn driver(&mut self, callable: &str) -> Result<&mut LineSession, LoaderError> {
        let session = match self.session.take() {
            Some(session) if session.callable == callable => session,
            _ => {
                let cmd = self.render_command(&self.config.invoke.command, callable)?;
                let process = LineSession::spawn(cmd, self.config.limits())
                    .map_err(|err| LoaderError::Io(format!("{err:#}")))?;
                info!(callable, "driver process started");
                DriverSession {
                    callable: callable.to_string(),
                    process,
                }
            }
        };
        Ok(&mut self.session.insert(session).process)
    }
}

impl Unit for ProcessUnit {
    #[instrument(skip_all, fields(unit = %self.unit_name))]
    fn symbols(&mut self) -> Result<Vec<Symbol>, LoaderError> {
        let output = self.run(&self.config.symbols.command, "", None)?;
        if !output.succeeded() {
            warn!(timed_out = output.timed_out, "symbols command failed");
            let detail = if output.timed_out {
                format!("timed out after {}s", self.config.command_timeout_secs)
            } else {
                output.failure_detail()
            };
            return Err(LoaderError::Compile(detail));
        }
        let line = last_line(&output.stdout_text())
            .ok_or_else(|| LoaderError::Io("symbols command printed nothing".to_string()))?;
        let symbols: Vec<Symbol> = serde_json::from_str(&line)
            .map_err(|err| LoaderError::Io(format!("parse symbol table: {err}")))?;
        debug!(count = symbols.len(), "symbol table loaded");
        Ok(symbols)
    }

    #[instrument(skip_all, fields(unit = %self.unit_name, callable = %symbol.name))]
    fn invoke(
        &mut self,
        symbol: &Symbol,
        spec: &CallableSpec,
        args: &[Value],
    ) -> Result<Value, LoaderError> {
        let encoded = args
            .iter()
            .zip(&spec.parameters)
            .map(|(arg, descriptor)| codec::encode(arg, descriptor))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| LoaderError::Io(format!("encode arguments: {err}")))?;
        let request = InvokeRequest {
            callable: &symbol.name,
            parameters: &symbol.parameters,
            returns: spec.return_type.runtime_kind(),
            args: encoded,
        };
        let line = serde_json::to_string(&request)
            .map_err(|err| LoaderError::Io(format!("serialize request: {err}")))?;

        let timeout_secs = self.config.command_timeout_secs;
        let deadline = Instant::now() + self.config.limits().timeout;
        let outcome = exchange(self.driver(&symbol.name)?, &line, deadline)
            .map_err(|err| LoaderError::Io(format!("{err:#}")))?;
        let response = match outcome {
            Exchange::Response(response) => response,
            Exchange::TimedOut => {
                warn!(timeout_secs, "invocation timed out, discarding driver");
                self.session = None;
                return Err(LoaderError::Runtime(format!(
                    "timed out after {timeout_secs}s"
                )));
            }
            Exchange::Oversized(truncated) => {
                warn!(truncated, "response exceeded output limit, discarding driver");
                self.session = None;
                return Err(LoaderError::Runtime(format!(
                    "response exceeded output limit of {} bytes",
                    self.config.output_limit_bytes
                )));
            }
            Exchange::Exited(output) => {
                warn!(exit_code = ?output.status.code(), "driver exited without a response");
                self.session = None;
                return Err(LoaderError::Runtime(output.failure_detail()));
            }
        };

        match response {
            InvokeResponse::Ok(result) => codec::decode(&result, &spec.return_type).map_err(|err| {
                LoaderError::Runtime(format!(
                    "invalid return value for {}: {err}",
                    spec.return_type
                ))
            }),
            InvokeResponse::Error(message) => Err(LoaderError::Runtime(message)),
        }
    }
}

/// Send one request line and wait for the first stdout line that parses as a
/// response. Skipped lines are kept as the stdout of an exited driver.
fn exchange(
    driver: &mut LineSession,
    request: &str,
    deadline: Instant,
) -> anyhow::Result<Exchange> {
    if let Err(err) = driver.send_line(request) {
        // The driver already exited; its stderr explains why.
        debug!(error = %format!("{err:#}"), "driver stdin closed");
    }
    let mut skipped = Vec::new();
    loop {
        match driver.recv_line(deadline) {
            SessionRead::Line { truncated, .. } if truncated > 0 => {
                return Ok(Exchange::Oversized(truncated));
            }
            SessionRead::Line { text, .. } => {
                match serde_json::from_str::<InvokeResponse>(&text) {
                    Ok(response) => return Ok(Exchange::Response(response)),
                    Err(_) if text.is_empty() => {}
                    Err(_) => skipped.push(text),
                }
            }
            SessionRead::TimedOut => return Ok(Exchange::TimedOut),
            SessionRead::Closed => {
                let mut output = driver.finish()?;
                output.stdout = skipped.join("\n").into_bytes();
                return Ok(Exchange::Exited(output));
            }
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), LoaderError> {
    fs::write(path, contents)
        .map_err(|err| LoaderError::Io(format!("write {}: {err}", path.display())))
}

fn last_line(text: &str) -> Option<String> {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
