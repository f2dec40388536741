// src/exec/runner.rs

//! Single command execution with output forwarding and cancellation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{ComposerError, Result};
use crate::logging::{LogSink, StreamKind};

/// Everything needed to start one child: parsed words, working directory,
/// combined environment.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    pub dir: PathBuf,
    pub env: BTreeMap<String, String>,
}

/// Where a child's output goes: the shared sink, this process's padded
/// name prefix, and its optional trim pattern.
#[derive(Debug, Clone)]
pub struct OutputContext {
    pub sink: Arc<LogSink>,
    pub prefix: String,
    pub trim: Option<Regex>,
}

/// Run one execution generation to completion.
///
/// Standard input is passed through; stdout and stderr are piped and
/// forwarded line-by-line through the trim transform into the sink. The
/// call resolves when the child exits on its own, or when `cancel` fires,
/// in which case the child is killed and the result is
/// [`ComposerError::Canceled`].
pub async fn run_command(
    spec: CommandSpec,
    cancel: CancellationToken,
    output: OutputContext,
) -> Result<()> {
    debug!(command = %spec.argv.join(" "), dir = %spec.dir.display(), "starting command");

    let mut cmd = Command::new(&spec.argv[0]);
    cmd.args(&spec.argv[1..])
        .current_dir(&spec.dir)
        .envs(&spec.env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning '{}'", spec.argv[0]))?;

    let stdout = child
        .stdout
        .take()
        .map(|stream| forward_stream(stream, StreamKind::Stdout, output.clone()));
    let stderr = child
        .stderr
        .take()
        .map(|stream| forward_stream(stream, StreamKind::Stderr, output.clone()));

    let status = tokio::select! {
        status = child.wait() => {
            status.with_context(|| format!("waiting for '{}'", spec.argv[0]))?
        }
        _ = cancel.cancelled() => {
            if let Err(err) = child.kill().await {
                warn!(error = %err, "failed to kill child on cancellation");
            }
            drain(stdout, stderr).await;
            return Err(ComposerError::Canceled);
        }
    };

    // Streams end at EOF once the child is gone; drain so no output is lost.
    drain(stdout, stderr).await;

    if status.success() {
        Ok(())
    } else if cancel.is_cancelled() {
        Err(ComposerError::Canceled)
    } else {
        Err(ComposerError::ExitStatus(status.code().unwrap_or(-1)))
    }
}

fn forward_stream(
    stream: impl AsyncRead + Unpin + Send + 'static,
    kind: StreamKind,
    output: OutputContext,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();

        while let Ok(Some(line)) = lines.next_line().await {
            output
                .sink
                .write_line(&output.prefix, kind, output.trim.as_ref(), &line);
        }
    })
}

async fn drain(stdout: Option<JoinHandle<()>>, stderr: Option<JoinHandle<()>>) {
    if let Some(handle) = stdout {
        let _ = handle.await;
    }
    if let Some(handle) = stderr {
        let _ = handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn spec(argv: &[&str]) -> CommandSpec {
        CommandSpec {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            dir: std::env::temp_dir(),
            env: std::env::vars().collect(),
        }
    }

    fn output(buf: &SharedBuf) -> OutputContext {
        OutputContext {
            sink: Arc::new(LogSink::from_writer(Box::new(buf.clone()))),
            prefix: "test".to_string(),
            trim: None,
        }
    }

    #[tokio::test]
    async fn successful_command_returns_ok() {
        let buf = SharedBuf::default();
        let res = run_command(spec(&["true"]), CancellationToken::new(), output(&buf)).await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn failing_command_reports_exit_status() {
        let buf = SharedBuf::default();
        let res = run_command(
            spec(&["sh", "-c", "exit 3"]),
            CancellationToken::new(),
            output(&buf),
        )
        .await;
        assert!(matches!(res, Err(ComposerError::ExitStatus(3))));
    }

    #[tokio::test]
    async fn output_is_forwarded_with_prefix() {
        let buf = SharedBuf::default();
        let res = run_command(
            spec(&["sh", "-c", "echo one && echo two 1>&2"]),
            CancellationToken::new(),
            output(&buf),
        )
        .await;
        assert!(res.is_ok());

        let contents = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(contents.contains("one"));
        assert!(contents.contains("two"));
        assert!(contents.contains("test"));
    }

    #[tokio::test]
    async fn cancellation_kills_the_child() {
        let buf = SharedBuf::default();
        let cancel = CancellationToken::new();
        let canceler = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceler.cancel();
        });

        let started = std::time::Instant::now();
        let res = run_command(spec(&["sleep", "30"]), cancel, output(&buf)).await;
        assert!(matches!(res, Err(ComposerError::Canceled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_binary_is_an_error() {
        let buf = SharedBuf::default();
        let res = run_command(
            spec(&["composer-no-such-binary-xyz"]),
            CancellationToken::new(),
            output(&buf),
        )
        .await;
        assert!(res.is_err());
    }
}
