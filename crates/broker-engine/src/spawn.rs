//! Supervision of one helper child process.
//!
//! A `HelperSpawn` owns exactly one child for its whole life: it is created
//! by `launch`, streams complete lines from both pipes in read order,
//! reports the exit code exactly once after both pipes reach EOF, and is
//! then disposable. Kill requests are forwarded to the supervisor task,
//! which signals the child; completion still arrives through the ordinary
//! exit path.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Which pipe a helper line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamKind {
    Output,
    Error,
}

/// Message delivered by the supervisor task. `Exited` is always last.
#[derive(Debug)]
pub(crate) enum HelperMessage {
    Line { stream: StreamKind, line: String },
    Exited { code: i32 },
}

/// Handle to a supervised helper child.
pub(crate) struct HelperSpawn {
    kill_tx: mpsc::UnboundedSender<()>,
}

impl HelperSpawn {
    /// Spawn the helper and start the supervisor task. Messages are
    /// delivered to `events` in read order, terminated by one `Exited`.
    pub(crate) fn launch(
        mut command: Command,
        events: mpsc::UnboundedSender<HelperMessage>,
    ) -> std::io::Result<Self> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn()?;
        let stdout = child.stdout.take().ok_or_else(|| {
            std::io::Error::other("helper child has no stdout pipe")
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            std::io::Error::other("helper child has no stderr pipe")
        })?;

        let (kill_tx, kill_rx) = mpsc::unbounded_channel();
        tokio::spawn(supervise(child, stdout, stderr, kill_rx, events));
        Ok(Self { kill_tx })
    }

    /// Request termination of the child. Idempotent; a no-op once the child
    /// has exited.
    pub(crate) fn kill(&self) {
        let _ = self.kill_tx.send(());
    }
}

async fn supervise(
    mut child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    mut kill_rx: mpsc::UnboundedReceiver<()>,
    events: mpsc::UnboundedSender<HelperMessage>,
) {
    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();
    let mut out_done = false;
    let mut err_done = false;

    // Drain both pipes to EOF; a partial final line is yielded without its
    // terminator by the line reader, so nothing is lost.
    while !(out_done && err_done) {
        tokio::select! {
            res = out_lines.next_line(), if !out_done => match res {
                Ok(Some(line)) => {
                    let _ = events.send(HelperMessage::Line {
                        stream: StreamKind::Output,
                        line,
                    });
                }
                Ok(None) => out_done = true,
                Err(err) => {
                    warn!("helper stdout read failed: {err}");
                    out_done = true;
                }
            },
            res = err_lines.next_line(), if !err_done => match res {
                Ok(Some(line)) => {
                    let _ = events.send(HelperMessage::Line {
                        stream: StreamKind::Error,
                        line,
                    });
                }
                Ok(None) => err_done = true,
                Err(err) => {
                    warn!("helper stderr read failed: {err}");
                    err_done = true;
                }
            },
            Some(()) = kill_rx.recv() => {
                debug!("killing helper child");
                let _ = child.start_kill();
            }
        }
    }

    let code = loop {
        tokio::select! {
            res = child.wait() => match res {
                // A signal death has no exit code; report it as non-zero.
                Ok(status) => break status.code().unwrap_or(-1),
                Err(err) => {
                    warn!("helper wait failed: {err}");
                    break -1;
                }
            },
            Some(()) = kill_rx.recv() => {
                debug!("killing helper child");
                let _ = child.start_kill();
            }
        }
    };

    debug!("helper exited with code {code}");
    let _ = events.send(HelperMessage::Exited { code });
}
