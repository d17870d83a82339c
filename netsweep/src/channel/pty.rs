//! PTY channel abstraction for interactive sessions.

use std::io::Write;
use std::time::Duration;

use log::{trace, warn};
use memchr::memchr;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};

/// Sink that receives every raw byte read from the device.
pub type SessionSink = Box<dyn Write + Send>;

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Upper bound for a single read operation.
    pub timeout: Duration,

    /// Search depth for pattern matching.
    pub search_depth: usize,

    /// Line terminator appended to every input.
    pub return_char: &'static str,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            search_depth: 1000,
            return_char: "\n",
        }
    }
}

/// High-level PTY channel for interactive device sessions.
///
/// Wraps a russh session channel with a shell attached and provides
/// pattern-based reads with timeout handling. Raw output is optionally
/// teed into a session log before ANSI stripping.
pub struct PtyChannel {
    channel: Channel<Msg>,

    config: PtyConfig,

    /// Pattern buffer for accumulating output.
    buffer: PatternBuffer,

    session_log: Option<SessionSink>,
}

impl PtyChannel {
    /// Create a new PTY channel over an already opened shell channel.
    pub fn new(channel: Channel<Msg>, config: PtyConfig, session_log: Option<SessionSink>) -> Self {
        Self {
            channel,
            buffer: PatternBuffer::new(config.search_depth),
            config,
            session_log,
        }
    }

    /// Send a line of input followed by the return character.
    pub async fn send(&mut self, input: &str) -> Result<()> {
        let line = format!("{}{}", input, self.config.return_char);
        self.write_raw(line.as_bytes()).await
    }

    /// Write bytes without a trailing return (pager keys).
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.channel
            .data(data)
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    /// Read until the last line of output matches `pattern`.
    ///
    /// Returns everything read so far (ANSI-stripped) and clears the buffer.
    /// Fails with `PatternTimeout` once the configured timeout elapses.
    pub async fn read_until(&mut self, pattern: &Regex) -> Result<Vec<u8>> {
        self.read_until_inner(pattern, false).await
    }

    /// Like [`read_until`](Self::read_until) but ignores matches until the
    /// echo of the sent line has been terminated by a newline.
    ///
    /// Keeps a command such as `show run | include #` from matching its own
    /// echo as a prompt.
    pub async fn read_after_input(&mut self, pattern: &Regex) -> Result<Vec<u8>> {
        self.read_until_inner(pattern, true).await
    }

    async fn read_until_inner(
        &mut self,
        pattern: &Regex,
        require_newline: bool,
    ) -> Result<Vec<u8>> {
        let timeout = self.config.timeout;
        let deadline = Instant::now() + timeout;

        loop {
            let ready = !require_newline || memchr(b'\n', self.buffer.as_slice()).is_some();
            if ready && !self.buffer.is_empty() && self.buffer.last_line_matches(pattern) {
                return Ok(self.buffer.take());
            }

            let chunk = self.read_chunk(deadline, timeout).await?;
            trace!(
                "read {} bytes, buffer {} bytes",
                chunk.len(),
                self.buffer.len()
            );
            self.tee(&chunk);
            self.buffer.extend(&chunk);
        }
    }

    /// Wait for the next data message or fail at the deadline.
    async fn read_chunk(&mut self, deadline: Instant, timeout: Duration) -> Result<Vec<u8>> {
        loop {
            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| ChannelError::PatternTimeout(timeout))?;

            match msg {
                Some(ChannelMsg::Data { data }) => return Ok(data.to_vec()),
                Some(ChannelMsg::ExtendedData { data, .. }) => return Ok(data.to_vec()),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(ChannelError::Closed.into());
                }
                Some(_) => continue,
            }
        }
    }

    fn tee(&mut self, data: &[u8]) {
        let failed = match self.session_log.as_mut() {
            Some(log) => log.write_all(data).err(),
            None => None,
        };
        if let Some(e) = failed {
            warn!("session log write failed, disabling it: {}", e);
            self.session_log = None;
        }
    }

    /// Signal EOF, close the channel and flush the session log.
    pub async fn close(mut self) -> Result<()> {
        if let Some(log) = self.session_log.as_mut() {
            let _ = log.flush();
        }
        self.channel.eof().await.map_err(ChannelError::Ssh)?;
        self.channel.close().await.map_err(ChannelError::Ssh)?;
        Ok(())
    }
}
