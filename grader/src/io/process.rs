//! Child processes for candidate commands.
//!
//! [`run_command_with_timeout`] runs a command to completion with a timeout,
//! bounded output and an optional stdin feed. [`LineSession`] keeps a child
//! alive and trades one line of stdin for lines of stdout, each read bounded by
//! a deadline.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Per-command budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLimits {
    pub timeout: Duration,
    /// Bytes of stdout/stderr kept in memory; the rest is drained and counted.
    pub output_limit_bytes: usize,
}

/// Captured result of a finished (or killed) command.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Best single-line explanation of a failed command: trimmed stderr,
    /// else trimmed stdout, else the exit status.
    pub fn failure_detail(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stdout = String::from_utf8_lossy(&self.stdout);
        let mut detail = if !stderr.trim().is_empty() {
            stderr.trim().to_string()
        } else if !stdout.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            match self.status.code() {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            }
        };
        if self.stderr_truncated > 0 {
            detail.push_str(&format!(" [stderr truncated {} bytes]", self.stderr_truncated));
        }
        detail
    }
}

/// Run `cmd` to completion or until `limits.timeout`, feeding `stdin` if given.
///
/// stdin is written and stdout/stderr are drained on their own threads so a
/// chatty child cannot deadlock against a full pipe.
#[instrument(skip_all, fields(timeout_secs = limits.timeout.as_secs(), output_limit_bytes = limits.output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    stdin: Option<Vec<u8>>,
    limits: CommandLimits,
) -> Result<CommandOutput> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!(program = ?cmd.get_program(), "spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let stdin_handle = match stdin {
        Some(input) => {
            let mut pipe = child
                .stdin
                .take()
                .ok_or_else(|| anyhow!("stdin was not piped"))?;
            // A child that exits without reading produces a broken pipe; the
            // exit status reports that case.
            Some(thread::spawn(move || {
                let _ = pipe.write_all(&input);
            }))
        }
        None => None,
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let limit = limits.output_limit_bytes;
    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, limit));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, limit));

    let mut timed_out = false;
    let status = match child.wait_timeout(limits.timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = limits.timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    if let Some(handle) = stdin_handle
        && handle.join().is_err()
    {
        warn!("stdin writer thread panicked");
    }
    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    handle
        .join()
        .unwrap_or_else(|_| Err(anyhow!("output reader thread panicked")))
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let keep = n.min(limit.saturating_sub(buf.len()));
        buf.extend_from_slice(&chunk[..keep]);
        truncated += n - keep;
    }

    Ok((buf, truncated))
}

/// One read from a [`LineSession`].
#[derive(Debug, PartialEq, Eq)]
pub enum SessionRead {
    /// A stdout line without its terminator. `truncated` counts the bytes
    /// dropped past the output limit.
    Line { text: String, truncated: usize },
    TimedOut,
    /// stdout reached end of file; the child has exited or is exiting.
    Closed,
}

/// A long-lived child driven one stdin line at a time.
///
/// stdout is split into lines on a reader thread; stderr is collected up to the
/// output limit for [`LineSession::finish`]. Dropping the session kills the
/// child.
pub struct LineSession {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<(String, usize)>,
    stderr: Arc<Mutex<(Vec<u8>, usize)>>,
    stderr_reader: Option<thread::JoinHandle<()>>,
    limits: CommandLimits,
}

impl LineSession {
    #[instrument(skip_all, fields(timeout_secs = limits.timeout.as_secs()))]
    pub fn spawn(mut cmd: Command, limits: CommandLimits) -> Result<Self> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!(program = ?cmd.get_program(), "spawning session process");
        let mut child = cmd.spawn().context("spawn command")?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("stderr was not piped"))?;

        let limit = limits.output_limit_bytes;
        let (sender, lines) = mpsc::channel();
        thread::spawn(move || forward_lines(stdout, limit, &sender));
        let collected = Arc::new(Mutex::new((Vec::new(), 0usize)));
        let sink = Arc::clone(&collected);
        let stderr_reader = thread::spawn(move || collect_limited(stderr, limit, &sink));

        Ok(Self {
            child,
            stdin: Some(stdin),
            lines,
            stderr: collected,
            stderr_reader: Some(stderr_reader),
            limits,
        })
    }

    /// Write `line` and a newline to the child's stdin.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("session stdin is closed"))?;
        writeln!(stdin, "{line}")
            .and_then(|()| stdin.flush())
            .context("write to session stdin")
    }

    /// Next stdout line, waiting no later than `deadline`.
    pub fn recv_line(&self, deadline: Instant) -> SessionRead {
        let wait = deadline.saturating_duration_since(Instant::now());
        match self.lines.recv_timeout(wait) {
            Ok((text, truncated)) => SessionRead::Line { text, truncated },
            Err(RecvTimeoutError::Timeout) => SessionRead::TimedOut,
            Err(RecvTimeoutError::Disconnected) => SessionRead::Closed,
        }
    }

    /// Close stdin and wait for the child to exit, killing it if it outlives
    /// the timeout. The output carries the collected stderr and no stdout.
    pub fn finish(&mut self) -> Result<CommandOutput> {
        drop(self.stdin.take());
        let mut timed_out = false;
        let status = match self
            .child
            .wait_timeout(self.limits.timeout)
            .context("wait for session")?
        {
            Some(status) => status,
            None => {
                warn!("session did not exit, killing");
                timed_out = true;
                self.child.kill().context("kill session")?;
                self.child.wait().context("wait session after kill")?
            }
        };
        if let Some(handle) = self.stderr_reader.take()
            && handle.join().is_err()
        {
            warn!("stderr reader thread panicked");
        }
        let (stderr, stderr_truncated) = self
            .stderr
            .lock()
            .map(|collected| (*collected).clone())
            .map_err(|_| anyhow!("stderr buffer poisoned"))?;
        debug!(exit_code = ?status.code(), timed_out, "session finished");
        Ok(CommandOutput {
            status,
            stdout: Vec::new(),
            stderr,
            stdout_truncated: 0,
            stderr_truncated,
            timed_out,
        })
    }
}

impl Drop for LineSession {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if matches!(self.child.try_wait(), Ok(None)) {
            debug!("killing session process");
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

fn forward_lines<R: Read>(reader: R, limit: usize, sender: &Sender<(String, usize)>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "session stdout read failed");
                break;
            }
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        let truncated = buf.len().saturating_sub(limit);
        buf.truncate(limit);
        let text = String::from_utf8_lossy(&buf).trim_end().to_string();
        if sender.send((text, truncated)).is_err() {
            break;
        }
    }
}

fn collect_limited<R: Read>(mut reader: R, limit: usize, sink: &Mutex<(Vec<u8>, usize)>) {
    let mut chunk = [0u8; 8192];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        let Ok(mut collected) = sink.lock() else {
            break;
        };
        let (buf, truncated) = &mut *collected;
        let keep = n.min(limit.saturating_sub(buf.len()));
        buf.extend_from_slice(&chunk[..keep]);
        *truncated += n - keep;
    }
}
