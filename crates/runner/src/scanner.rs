//! Deadline-bounded line scanning over live output
//!
//! An [`ActionContext`] carries the cancellation token and deadline an action
//! runs under. [`OutputScanner`] reads lines from any async reader and stops
//! with a typed [`ScanError`] once the context expires, so callers can tell a
//! timed-out read apart from a broken stream.

use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("context canceled")]
    Cancelled,

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Cancellation scope of a running action
#[derive(Debug, Clone)]
pub struct ActionContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for ActionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionContext {
    /// Unbounded root context
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Child context expiring after `timeout` or at the parent deadline,
    /// whichever comes first. Cancelling the parent cancels the child.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            token: self.token.child_token(),
            deadline: Some(match self.deadline {
                Some(parent) if parent < deadline => parent,
                _ => deadline,
            }),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the context is cancelled or past its deadline.
    pub async fn done(&self) -> ScanError {
        tokio::select! {
            _ = self.token.cancelled() => ScanError::Cancelled,
            _ = sleep_until(self.deadline) => ScanError::DeadlineExceeded,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Line reader bound to an action context
///
/// Lines are split on `\n` as raw bytes and decoded lossily, so output that
/// is not valid UTF-8 still scans line by line.
pub struct OutputScanner<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    ctx: ActionContext,
}

impl<R: AsyncRead + Unpin> OutputScanner<R> {
    pub fn new(reader: R, ctx: ActionContext) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            ctx,
        }
    }

    /// Next line without its terminator, `None` at end of stream.
    ///
    /// Data that is already buffered wins over an expired deadline.
    pub async fn next_line(&mut self) -> Result<Option<String>, ScanError> {
        // Bytes of a line interrupted by the context stay in `buf`.
        let read = tokio::select! {
            biased;
            read = self.reader.read_until(b'\n', &mut self.buf) => read?,
            reason = self.ctx.done() => return Err(reason),
        };
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        let mut line = self.buf.as_slice();
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest.strip_suffix(b"\r").unwrap_or(rest);
        }
        let line = String::from_utf8_lossy(line).into_owned();
        self.buf.clear();
        Ok(Some(line))
    }
}
