//! One external tool plus the single pipe this process talks to it through.
//!
//! The pipeline is created unopened and spawns its subprocess on `start`,
//! which the first read or write calls implicitly. Reads and writes block
//! the calling thread; back-pressure comes from the OS pipe buffer.
//!
//! When a [`CancellationToken`] is attached, the started subprocess is
//! registered with it and gets killed when the token fires. A read blocked
//! at that moment returns whatever it had filled (end-of-stream), and the
//! pipeline reports `Cancelled` from then on.

use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use audio_pipe_core::models::error::PipeError;
use audio_pipe_core::models::state::{CloseReason, StreamState};
use audio_pipe_core::session::cancellation::{CancellationToken, HookId};

const WAIT_POLL: Duration = Duration::from_millis(10);

/// Which standard stream of the subprocess is piped to us. The other two
/// are connected to the null device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeEnd {
    /// We write, the tool reads its standard input.
    Stdin,
    /// We read the tool's standard output.
    Stdout,
    /// We read the tool's diagnostic stream.
    Stderr,
}

pub struct ProcessPipeline {
    tool: String,
    args: Vec<String>,
    end: PipeEnd,
    state: StreamState,
    child: Option<Arc<Mutex<Child>>>,
    output: Option<Box<dyn Read + Send>>,
    input: Option<ChildStdin>,
    token: Option<CancellationToken>,
    hook: Option<HookId>,
    killed: Arc<AtomicBool>,
}

impl ProcessPipeline {
    /// Describe a pipeline without spawning anything.
    pub fn new<I, S>(tool: &str, args: I, end: PipeEnd) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool: tool.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            end,
            state: StreamState::Configured,
            child: None,
            output: None,
            input: None,
            token: None,
            hook: None,
            killed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// `new` followed by `start`.
    pub fn open<I, S>(tool: &str, args: I, end: PipeEnd) -> Result<Self, PipeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pipeline = Self::new(tool, args, end);
        pipeline.start()?;
        Ok(pipeline)
    }

    /// Kill the subprocess when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// True once the attached token killed the subprocess.
    pub fn was_cancelled(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// Spawn the subprocess. Does nothing when already streaming.
    pub fn start(&mut self) -> Result<(), PipeError> {
        match self.state {
            StreamState::Streaming => return Ok(()),
            StreamState::Closed(CloseReason::Cancelled) => return Err(PipeError::Cancelled),
            StreamState::Closed(_) => return Err(PipeError::Closed),
            StreamState::Configured => {}
        }
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            self.state.close(CloseReason::Cancelled);
            return Err(PipeError::Cancelled);
        }

        let mut command = Command::new(&self.tool);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        match self.end {
            PipeEnd::Stdin => command.stdin(Stdio::piped()),
            PipeEnd::Stdout => command.stdout(Stdio::piped()),
            PipeEnd::Stderr => command.stderr(Stdio::piped()),
        };

        log::debug!("spawning {} {}", self.tool, self.args.join(" "));
        let mut child = command.spawn().map_err(|e| {
            log::error!("failed to start {}: {}", self.tool, e);
            PipeError::tool_unavailable(&self.tool)
        })?;

        match self.end {
            PipeEnd::Stdin => self.input = child.stdin.take(),
            PipeEnd::Stdout => {
                self.output = child.stdout.take().map(|out| Box::new(out) as Box<dyn Read + Send>)
            }
            PipeEnd::Stderr => {
                self.output = child.stderr.take().map(|err| Box::new(err) as Box<dyn Read + Send>)
            }
        }

        let child = Arc::new(Mutex::new(child));
        if let Some(token) = &self.token {
            let hook_child = Arc::clone(&child);
            let killed = Arc::clone(&self.killed);
            let tool = self.tool.clone();
            self.hook = token.register(move || {
                killed.store(true, Ordering::SeqCst);
                if let Err(e) = hook_child.lock().kill() {
                    log::warn!("failed to kill {}: {}", tool, e);
                }
            });
        }
        self.child = Some(child);
        self.state = StreamState::Streaming;
        Ok(())
    }

    /// Read until `buf` is full or the pipe reaches end-of-stream.
    ///
    /// Returns the number of bytes filled; anything less than `buf.len()`
    /// means the tool closed its end.
    pub fn read_full(&mut self, buf: &mut [u8]) -> Result<usize, PipeError> {
        self.start()?;
        let Some(reader) = self.output.as_mut() else {
            return Err(PipeError::PipeFailure(format!("{} has no readable pipe", self.tool)));
        };

        let mut filled = 0;
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.state.close(CloseReason::Failed);
                    return Err(PipeError::PipeFailure(format!("failed to read from {}: {}", self.tool, e)));
                }
            }
        }
        Ok(filled)
    }

    /// Drain the pipe to end-of-stream.
    pub fn read_to_string(&mut self) -> Result<String, PipeError> {
        self.start()?;
        let Some(reader) = self.output.as_mut() else {
            return Err(PipeError::PipeFailure(format!("{} has no readable pipe", self.tool)));
        };

        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| PipeError::PipeFailure(format!("failed to read from {}: {}", self.tool, e)))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Write every byte of `bytes`, blocking while the pipe is full.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), PipeError> {
        self.start()?;
        let Some(writer) = self.input.as_mut() else {
            return Err(PipeError::PipeFailure(format!("{} has no writable pipe", self.tool)));
        };

        if let Err(e) = writer.write_all(bytes).and_then(|()| writer.flush()) {
            if self.killed.load(Ordering::SeqCst) {
                self.state.close(CloseReason::Cancelled);
                return Err(PipeError::Cancelled);
            }
            self.state.close(CloseReason::Failed);
            return Err(PipeError::PipeFailure(format!("failed to write to {}: {}", self.tool, e)));
        }
        Ok(())
    }

    /// Close our pipe end and wait for the subprocess to exit.
    ///
    /// Returns `None` when nothing was running. Closing early is fine: the
    /// tool sees end-of-input or a broken pipe and shuts down on its own.
    pub fn close(&mut self) -> Result<Option<ExitStatus>, PipeError> {
        self.input = None;
        self.output = None;

        let Some(child) = self.child.take() else {
            self.state.close(CloseReason::Requested);
            return Ok(None);
        };

        let status = wait(&child);
        if let (Some(token), Some(hook)) = (&self.token, self.hook.take()) {
            token.unregister(hook);
        }

        let reason = if self.was_cancelled() {
            CloseReason::Cancelled
        } else if self.state == StreamState::Closed(CloseReason::Failed) {
            CloseReason::Failed
        } else {
            CloseReason::Requested
        };
        self.state.close(reason);

        let status =
            status.map_err(|e| PipeError::PipeFailure(format!("failed to wait for {}: {}", self.tool, e)))?;
        log::debug!("{} exited with {}", self.tool, status);
        Ok(Some(status))
    }

    /// Kill the subprocess, then reap it.
    pub fn kill(&mut self) -> Result<Option<ExitStatus>, PipeError> {
        if let Some(child) = &self.child {
            if let Err(e) = child.lock().kill() {
                log::warn!("failed to kill {}: {}", self.tool, e);
            }
        }
        self.close()
    }
}

// The lock is released between polls so a cancellation hook can kill the
// child while we wait.
fn wait(child: &Mutex<Child>) -> io::Result<ExitStatus> {
    loop {
        if let Some(status) = child.lock().try_wait()? {
            return Ok(status);
        }
        thread::sleep(WAIT_POLL);
    }
}

impl Drop for ProcessPipeline {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.close() {
                log::error!("failed to close {}: {}", self.tool, e);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, end: PipeEnd) -> ProcessPipeline {
        ProcessPipeline::new("sh", ["-c", script], end)
    }

    #[test]
    fn short_read_signals_end_of_stream() {
        let mut pipeline = sh("printf abcdef", PipeEnd::Stdout);
        assert_eq!(pipeline.state(), StreamState::Configured);

        let mut buf = [0u8; 4];
        assert_eq!(pipeline.read_full(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert!(pipeline.state().is_streaming());

        assert_eq!(pipeline.read_full(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(pipeline.read_full(&mut buf).unwrap(), 0);

        let status = pipeline.close().unwrap().unwrap();
        assert!(status.success());
        assert_eq!(pipeline.state(), StreamState::Closed(CloseReason::Requested));
        assert_eq!(pipeline.read_full(&mut buf), Err(PipeError::Closed));
    }

    #[test]
    fn read_spans_multiple_chunks() {
        let mut pipeline = sh("printf ab; sleep 0.05; printf cd", PipeEnd::Stdout);
        let mut buf = [0u8; 4];
        assert_eq!(pipeline.read_full(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn writes_reach_the_tool() {
        let path = std::env::temp_dir().join(format!("audio-pipe-pipeline-{}.bin", std::process::id()));
        let script = format!("cat > '{}'", path.display());
        let mut pipeline = sh(&script, PipeEnd::Stdin);

        pipeline.write_all(b"hello ").unwrap();
        pipeline.write_all(b"pipe").unwrap();
        assert!(pipeline.close().unwrap().unwrap().success());

        assert_eq!(std::fs::read(&path).unwrap(), b"hello pipe");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn diagnostic_stream_is_readable() {
        let mut pipeline = sh("echo out; echo 'Stream #0:0: Audio' >&2", PipeEnd::Stderr);
        assert_eq!(pipeline.read_to_string().unwrap(), "Stream #0:0: Audio\n");
        pipeline.close().unwrap();
    }

    #[test]
    fn exit_status_is_reported() {
        let mut pipeline = ProcessPipeline::open("sh", ["-c", "exit 3"], PipeEnd::Stdout).unwrap();
        let status = pipeline.close().unwrap().unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn writing_to_exited_tool_fails() {
        let mut pipeline = sh("exit 0", PipeEnd::Stdin);
        let result = pipeline.write_all(&vec![0u8; 1 << 20]);
        assert!(matches!(result, Err(PipeError::PipeFailure(_))));
        assert_eq!(pipeline.state(), StreamState::Closed(CloseReason::Failed));
    }

    #[test]
    fn missing_tool_fails_to_start() {
        let mut pipeline = ProcessPipeline::new("audio-pipe-no-such-tool", Vec::<String>::new(), PipeEnd::Stdout);
        assert_eq!(
            pipeline.start(),
            Err(PipeError::tool_unavailable("audio-pipe-no-such-tool"))
        );
    }

    #[test]
    fn close_before_start_is_a_no_op() {
        let mut pipeline = sh("printf x", PipeEnd::Stdout);
        assert_eq!(pipeline.close().unwrap(), None);
        assert_eq!(pipeline.start(), Err(PipeError::Closed));
    }

    #[test]
    fn cancellation_unblocks_a_read() {
        let token = CancellationToken::new();
        let mut pipeline = ProcessPipeline::new("sleep", ["5"], PipeEnd::Stdout).with_cancellation(token.clone());
        pipeline.start().unwrap();
        assert_eq!(token.pending_hooks(), 1);

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            token.cancel();
        });

        let mut buf = [0u8; 16];
        assert_eq!(pipeline.read_full(&mut buf).unwrap(), 0);
        canceller.join().unwrap();

        assert!(pipeline.was_cancelled());
        pipeline.close().unwrap();
        assert_eq!(pipeline.state(), StreamState::Closed(CloseReason::Cancelled));
        assert_eq!(pipeline.read_full(&mut buf), Err(PipeError::Cancelled));
    }

    #[test]
    fn cancelled_token_prevents_start() {
        let token = CancellationToken::new();
        token.cancel();
        let mut pipeline = sh("printf x", PipeEnd::Stdout).with_cancellation(token);
        assert_eq!(pipeline.start(), Err(PipeError::Cancelled));
    }

    #[test]
    fn close_releases_the_hook() {
        let token = CancellationToken::new();
        let mut pipeline = sh("printf x", PipeEnd::Stdout).with_cancellation(token.clone());
        pipeline.start().unwrap();
        pipeline.close().unwrap();
        assert_eq!(token.pending_hooks(), 0);
    }

    #[test]
    fn kill_stops_a_long_running_tool() {
        let mut pipeline = ProcessPipeline::open("sleep", ["5"], PipeEnd::Stdout).unwrap();
        let status = pipeline.kill().unwrap().unwrap();
        assert!(!status.success());
        assert_eq!(pipeline.state(), StreamState::Closed(CloseReason::Requested));
    }
}
