//! Subprocess execution seam.
//!
//! Everything devctl does ends in exactly one call to
//! [`CommandExecutor::execute`]. The production implementation spawns the
//! program with an argument vector (never through a shell), merges stdout
//! and stderr, and enforces an optional timeout. Tests swap in a scripted
//! executor to observe invocations without spawning anything.

use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{DevctlError, Result};

/// Exit code reported when the program could not be spawned at all.
pub const EXIT_SPAWN_FAILED: i32 = 127;

/// Exit code reported when the process ended without one (signal, timeout).
pub const EXIT_NO_CODE: i32 = -1;

const MAX_OUTPUT: usize = 64 * 1024;

/// How long to keep reading after a timed-out child was killed.
const KILL_GRACE: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// One external program call: argv plus optional file redirections.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment for the child. Values are never logged.
    pub env: Vec<(String, String)>,
    pub stdin_file: Option<PathBuf>,
    pub stdout_file: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin_file = Some(path.into());
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_file = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Human-readable rendering for diagnostics. Environment values are omitted.
    pub fn command_line(&self) -> String {
        let mut line = self.argv().join(" ");
        if let Some(p) = &self.stdin_file {
            line.push_str(&format!(" < {}", p.display()));
        }
        if let Some(p) = &self.stdout_file {
            line.push_str(&format!(" > {}", p.display()));
        }
        line
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env_keys)
            .field("stdin_file", &self.stdin_file)
            .field("stdout_file", &self.stdout_file)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CommandResult
// ---------------------------------------------------------------------------

/// Normalized outcome of one invocation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub success: bool,
    pub exit_code: i32,
    /// stdout and stderr interleaved in the order chunks arrived, trimmed,
    /// capped at 64 KiB (tail kept). The two pipes are read separately, so
    /// ordering is exact only at chunk granularity. On timeout, whatever the
    /// child wrote before the kill comes first and the last line is the
    /// timeout notice.
    pub output: String,
    /// Diagnostics only; never serialized into responses.
    #[serde(skip)]
    pub command_line: String,
    pub timed_out: bool,
    /// Leading output was dropped by the 64 KiB cap.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    pub duration_ms: u64,
}

impl CommandResult {
    pub fn exited(exit_code: i32, output: impl Into<String>, command_line: impl Into<String>) -> Self {
        Self {
            success: exit_code == 0,
            exit_code,
            output: output.into(),
            command_line: command_line.into(),
            timed_out: false,
            truncated: false,
            duration_ms: 0,
        }
    }

    pub fn timed_out(timeout: Duration, command_line: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: EXIT_NO_CODE,
            output: format!("timed out after {}s", timeout.as_secs()),
            command_line: command_line.into(),
            timed_out: true,
            truncated: false,
            duration_ms: timeout.as_millis() as u64,
        }
    }

    /// Attach captured output. A timeout notice already in `output` stays
    /// as the last line.
    pub fn with_output(mut self, captured: Captured) -> Self {
        self.output = match (self.timed_out, captured.text.is_empty()) {
            (false, _) => captured.text,
            (true, true) => self.output,
            (true, false) => format!("{}\n{}", captured.text, self.output),
        };
        self.truncated = captured.truncated;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    /// Convert an unsuccessful result into the matching error.
    pub fn into_result(self) -> Result<Self> {
        if self.timed_out {
            return Err(DevctlError::TimedOut {
                seconds: self.duration_ms / 1000,
            });
        }
        if !self.success {
            return Err(DevctlError::SubprocessFailed {
                exit_code: self.exit_code,
                output: self.output,
            });
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// CommandExecutor
// ---------------------------------------------------------------------------

pub trait CommandExecutor: Send + Sync {
    fn execute(&self, invocation: &Invocation) -> CommandResult;
}

/// Spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn execute(&self, invocation: &Invocation) -> CommandResult {
        let start = Instant::now();
        run(invocation).with_duration(start.elapsed())
    }
}

fn spawn_failure(invocation: &Invocation, reason: String) -> CommandResult {
    CommandResult::exited(EXIT_SPAWN_FAILED, reason, invocation.command_line())
}

/// Reader threads collect output while a waiter thread with
/// `mpsc::recv_timeout` enforces the timeout.
fn run(invocation: &Invocation) -> CommandResult {
    let command_line = invocation.command_line();
    tracing::debug!(command = %command_line, "spawning");

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args);
    for (key, value) in &invocation.env {
        cmd.env(key, value);
    }

    match &invocation.stdin_file {
        Some(path) => match File::open(path) {
            Ok(f) => {
                cmd.stdin(Stdio::from(f));
            }
            Err(e) => {
                return spawn_failure(invocation, format!("cannot open {}: {e}", path.display()))
            }
        },
        None => {
            cmd.stdin(Stdio::null());
        }
    }

    match &invocation.stdout_file {
        Some(path) => match OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
        {
            Ok(f) => {
                cmd.stdout(Stdio::from(f));
            }
            Err(e) => {
                return spawn_failure(invocation, format!("cannot open {}: {e}", path.display()))
            }
        },
        None => {
            cmd.stdout(Stdio::piped());
        }
    }
    cmd.stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            return spawn_failure(
                invocation,
                format!("failed to spawn '{}': {e}", invocation.program),
            )
        }
    };

    let child_pid = child.id();
    let mut sources: Vec<Box<dyn Read + Send>> = Vec::new();
    if let Some(out) = child.stdout.take() {
        sources.push(Box::new(out));
    }
    if let Some(err) = child.stderr.take() {
        sources.push(Box::new(err));
    }
    let collector = OutputCollector::start(sources);

    let wait_result = match invocation.timeout {
        None => child.wait(),
        Some(timeout) => {
            // The child moves to the waiter thread; on timeout we kill by PID.
            let (tx, rx) = mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(child.wait());
            });

            match rx.recv_timeout(timeout) {
                Ok(result) => result,
                Err(_) => {
                    kill_process(child_pid);
                    tracing::warn!(command = %command_line, secs = timeout.as_secs(), "command timed out");
                    let partial = collector.finish(Some(KILL_GRACE));
                    return CommandResult::timed_out(timeout, command_line).with_output(partial);
                }
            }
        }
    };

    let captured = collector.finish(None);

    let status = match wait_result {
        Ok(s) => s,
        Err(e) => {
            return CommandResult::exited(EXIT_NO_CODE, format!("wait failed: {e}"), command_line)
        }
    };

    let exit_code = status.code().unwrap_or(EXIT_NO_CODE);
    CommandResult::exited(exit_code, String::new(), command_line).with_output(captured)
}

/// Child output after trimming and the tail cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub text: String,
    pub truncated: bool,
}

impl Captured {
    /// Trim and keep at most `MAX_OUTPUT` bytes from the end.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.len() <= MAX_OUTPUT {
            return Self {
                text: trimmed.to_string(),
                truncated: false,
            };
        }
        let mut cut = trimmed.len() - MAX_OUTPUT;
        while !trimmed.is_char_boundary(cut) {
            cut += 1;
        }
        Self {
            text: trimmed[cut..].to_string(),
            truncated: true,
        }
    }
}

/// One reader thread per pipe, all appending to a shared buffer as chunks
/// arrive. Reading on dedicated threads keeps a chatty child from blocking
/// on a full pipe.
struct OutputCollector {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<()>,
    readers: usize,
}

impl OutputCollector {
    fn start(sources: Vec<Box<dyn Read + Send>>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let readers = sources.len();
        for mut source in sources {
            let buffer = Arc::clone(&buffer);
            let tx = tx.clone();
            std::thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match source.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => buffer
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend_from_slice(&chunk[..n]),
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
                let _ = tx.send(());
            });
        }
        Self {
            buffer,
            done,
            readers,
        }
    }

    /// Wait for every pipe to close, or at most `grace` when the child was
    /// killed (a grandchild may still hold a pipe open), then take what
    /// was read.
    fn finish(self, grace: Option<Duration>) -> Captured {
        let deadline = grace.map(|g| Instant::now() + g);
        for _ in 0..self.readers {
            let closed = match deadline {
                None => self.done.recv().is_ok(),
                Some(d) => self
                    .done
                    .recv_timeout(d.saturating_duration_since(Instant::now()))
                    .is_ok(),
            };
            if !closed {
                break;
            }
        }
        let bytes = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        Captured::from_raw(&String::from_utf8_lossy(&bytes))
    }
}

/// Terminate a process by PID using SIGKILL. Best-effort.
fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

// ---------------------------------------------------------------------------
// Scripted executor (tests)
// ---------------------------------------------------------------------------

#[cfg(any(test, feature = "test-support"))]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Canned reply for one invocation.
    #[derive(Debug, Clone, Default)]
    pub struct Reply {
        pub exit_code: i32,
        pub output: String,
        pub timed_out: bool,
        /// Written to `stdout_file` when the invocation redirects stdout.
        pub stdout_contents: Option<String>,
    }

    impl Reply {
        pub fn ok(output: impl Into<String>) -> Self {
            Self {
                output: output.into(),
                ..Self::default()
            }
        }

        pub fn fail(exit_code: i32, output: impl Into<String>) -> Self {
            Self {
                exit_code,
                output: output.into(),
                ..Self::default()
            }
        }

        pub fn timeout() -> Self {
            Self {
                exit_code: EXIT_NO_CODE,
                timed_out: true,
                ..Self::default()
            }
        }

        pub fn dump(contents: impl Into<String>) -> Self {
            Self {
                stdout_contents: Some(contents.into()),
                ..Self::default()
            }
        }
    }

    /// Records every invocation and answers from a queue of replies.
    /// An empty queue answers with exit code 0 and no output.
    #[derive(Debug, Default)]
    pub struct ScriptedExecutor {
        replies: Mutex<VecDeque<Reply>>,
        calls: Mutex<Vec<Invocation>>,
    }

    impl ScriptedExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn push(&self, reply: Reply) {
            self.replies.lock().unwrap().push_back(reply);
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl CommandExecutor for ScriptedExecutor {
        fn execute(&self, invocation: &Invocation) -> CommandResult {
            self.calls.lock().unwrap().push(invocation.clone());
            let reply = self.replies.lock().unwrap().pop_front().unwrap_or_default();

            if let (Some(path), Some(contents)) = (&invocation.stdout_file, &reply.stdout_contents) {
                std::fs::write(path, contents).unwrap();
            }

            let captured = Captured::from_raw(&reply.output);
            if reply.timed_out {
                let timeout = invocation.timeout.unwrap_or(Duration::from_secs(30));
                return CommandResult::timed_out(timeout, invocation.command_line())
                    .with_output(captured);
            }
            CommandResult::exited(reply.exit_code, String::new(), invocation.command_line())
                .with_output(captured)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
