//! Process execution engine
//!
//! Runs one command to completion under a [`ToolContext`]. Stdout and stderr
//! are drained by dedicated tasks from the moment the child is spawned, so a
//! chatty child never blocks on a full pipe and everything written before an
//! interruption is still returned to the caller.

use super::tool::ExternalToolError;
use crate::tools::ToolContext;
use std::fmt;
use std::io;
use std::ops::Range;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long drains may keep reading once the child is gone. A descendant
/// that inherited the pipes can hold them open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

const READ_CHUNK: usize = 8 * 1024;

/// Why a run did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The deadline elapsed first
    TimedOut,
    /// The caller fired the cancellation token first
    Canceled,
    /// The child exited on its own with a non-success status
    NonzeroExit,
}

impl ExecOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecOutcome::TimedOut => "command timed out",
            ExecOutcome::Canceled => "command canceled",
            ExecOutcome::NonzeroExit => "command failed",
        }
    }
}

impl fmt::Display for ExecOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run that timed out, was canceled, or exited unsuccessfully.
///
/// Carries whatever the child wrote before it stopped. `status` is `None`
/// only when the handle had already fired and nothing was spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    pub kind: ExecOutcome,
    pub stdout: String,
    pub stderr: String,
    pub status: Option<ExitStatus>,
}

impl ExecutionError {
    fn not_started(kind: ExecOutcome) -> Self {
        Self {
            kind,
            stdout: String::new(),
            stderr: String::new(),
            status: None,
        }
    }

    /// Exit code, if the child exited normally
    pub fn code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }

    /// Multi-line report with both captured streams
    pub fn detail(&self) -> String {
        const RULE: &str = "-------------------------------------------------------------\n";
        let mut s = format!("{self}\n{RULE}");
        push_stream(&mut s, "Stdout", "<No Stdout>", &self.stdout, RULE);
        s.push_str(RULE);
        push_stream(&mut s, "Stderr", "<No Stderr>", &self.stderr, RULE);
        s.push_str(RULE);
        s
    }
}

fn push_stream(s: &mut String, label: &str, empty: &str, body: &str, rule: &str) {
    if body.is_empty() {
        s.push_str(empty);
        s.push('\n');
    } else {
        s.push_str(label);
        s.push_str(":\n");
        s.push_str(rule);
        s.push_str(body);
        s.push('\n');
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{}: {}", self.kind, status)?,
            None => write!(f, "{}: not started", self.kind)?,
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, ": {stderr}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutionError {}

/// Everything needed to start one child process
#[derive(Debug)]
pub(crate) struct Invocation<'a> {
    pub tool: &'a str,
    pub command: &'a Path,
    pub args: &'a [String],
    pub stdin: Option<&'a [u8]>,
    pub combine_output: bool,
}

/// Bytes read from one stream, with the arrival time of every read
#[derive(Debug, Default)]
struct Capture {
    bytes: Vec<u8>,
    chunks: Vec<(Instant, Range<usize>)>,
}

impl Capture {
    fn push(&mut self, data: &[u8]) {
        let start = self.bytes.len();
        self.bytes.extend_from_slice(data);
        self.chunks.push((Instant::now(), start..self.bytes.len()));
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

enum Finish {
    Exited(io::Result<ExitStatus>),
    Interrupted(ExecOutcome),
}

/// Run `inv` to completion under `ctx`.
///
/// On success returns stdout, or both streams interleaved in arrival order
/// when `combine_output` is set.
///
/// An interrupt kills the direct child only. Processes it forked or put in
/// the background keep running; their hold on the output pipes is bounded
/// by [`DRAIN_GRACE`].
pub(crate) async fn run(
    inv: Invocation<'_>,
    ctx: &ToolContext,
) -> Result<String, ExternalToolError> {
    if let Some(kind) = already_fired(ctx) {
        debug!(tool = inv.tool, outcome = %kind, "handle fired before spawn");
        return Err(ExecutionError::not_started(kind).into());
    }

    let mut command = Command::new(inv.command);
    command
        .args(inv.args)
        .stdin(if inv.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let mut child = command.spawn().map_err(|source| ExternalToolError::Spawn {
        command: inv.command.to_path_buf(),
        source,
    })?;
    let pid = child.id();
    debug!(
        tool = inv.tool,
        command = %inv.command.display(),
        pid,
        args = ?inv.args,
        "spawned command"
    );

    let stop = CancellationToken::new();
    let stdout_task = child
        .stdout
        .take()
        .map(|pipe| tokio::spawn(drain(pipe, stop.clone())));
    let stderr_task = child
        .stderr
        .take()
        .map(|pipe| tokio::spawn(drain(pipe, stop.clone())));
    let feeder = match (child.stdin.take(), inv.stdin) {
        (Some(pipe), Some(data)) => Some(tokio::spawn(feed(pipe, data.to_vec()))),
        _ => None,
    };

    let finish = tokio::select! {
        biased;
        _ = ctx.cancellation.cancelled() => Finish::Interrupted(ExecOutcome::Canceled),
        _ = deadline_reached(ctx.deadline) => Finish::Interrupted(ExecOutcome::TimedOut),
        status = child.wait() => Finish::Exited(status),
    };

    let (status, interrupted) = match finish {
        Finish::Exited(status) => (status, None),
        Finish::Interrupted(kind) => {
            if let Err(e) = child.start_kill() {
                debug!(tool = inv.tool, pid, error = %e, "kill after interrupt failed");
            }
            (child.wait().await, Some(kind))
        }
    };

    let watchdog = tokio::spawn({
        let stop = stop.clone();
        async move {
            tokio::time::sleep(DRAIN_GRACE).await;
            stop.cancel();
        }
    });
    let stdout = join_drain(stdout_task).await;
    let stderr = join_drain(stderr_task).await;
    watchdog.abort();
    if let Some(feeder) = feeder {
        feeder.abort();
    }

    let status = status?;
    let (stdout, stderr) = (stdout?, stderr?);
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let kind = match interrupted {
        Some(kind) => {
            warn!(
                tool = inv.tool,
                pid,
                outcome = %kind,
                %status,
                elapsed_ms,
                "command interrupted"
            );
            kind
        }
        None if !status.success() => {
            let kind = ExecOutcome::NonzeroExit;
            debug!(tool = inv.tool, pid, outcome = %kind, %status, elapsed_ms, "command exited");
            kind
        }
        None => {
            debug!(tool = inv.tool, pid, outcome = "success", elapsed_ms, "command exited");
            return Ok(if inv.combine_output {
                interleave(&stdout, &stderr)
            } else {
                stdout.into_string()
            });
        }
    };

    Err(ExecutionError {
        kind,
        stdout: stdout.into_string(),
        stderr: stderr.into_string(),
        status: Some(status),
    }
    .into())
}

/// Cancellation wins over an elapsed deadline
fn already_fired(ctx: &ToolContext) -> Option<ExecOutcome> {
    if ctx.is_cancelled() {
        Some(ExecOutcome::Canceled)
    } else if ctx.deadline_passed() {
        Some(ExecOutcome::TimedOut)
    } else {
        None
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn drain<R>(mut reader: R, stop: CancellationToken) -> io::Result<Capture>
where
    R: AsyncRead + Unpin,
{
    let mut capture = Capture::default();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            read = reader.read(&mut buf) => read?,
        };
        if n == 0 {
            break;
        }
        capture.push(&buf[..n]);
    }
    Ok(capture)
}

async fn join_drain(
    task: Option<tokio::task::JoinHandle<io::Result<Capture>>>,
) -> io::Result<Capture> {
    match task {
        Some(task) => task.await.map_err(io::Error::other)?,
        None => Ok(Capture::default()),
    }
}

async fn feed(mut pipe: tokio::process::ChildStdin, data: Vec<u8>) {
    // A child that exits without reading its input closes the pipe early.
    match pipe.write_all(&data).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
        Err(e) => debug!(error = %e, "writing command input failed"),
    }
}

/// Merge two captures by read timestamp; stdout goes first on ties.
fn interleave(stdout: &Capture, stderr: &Capture) -> String {
    let mut merged = Vec::with_capacity(stdout.bytes.len() + stderr.bytes.len());
    let mut out = stdout.chunks.iter().peekable();
    let mut err = stderr.chunks.iter().peekable();

    loop {
        let take_out = match (out.peek(), err.peek()) {
            (Some((a, _)), Some((b, _))) => a <= b,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        if take_out {
            if let Some((_, range)) = out.next() {
                merged.extend_from_slice(&stdout.bytes[range.clone()]);
            }
        } else if let Some((_, range)) = err.next() {
            merged.extend_from_slice(&stderr.bytes[range.clone()]);
        }
    }

    String::from_utf8_lossy(&merged).into_owned()
}
