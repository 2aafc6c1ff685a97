//! Link and transaction engine
//!
//! A [`Link`] owns one open modem stream. [`Link::transact`] writes a single
//! command line and accumulates the reply until a terminal token shows up,
//! the deadline passes, or the cancellation token fires.
//!
//! Reads are bounded by the poll interval and whatever is available is read
//! in one go. Read errors and end-of-stream are retried until the deadline:
//! USB modems emit spurious errors while they re-enumerate.

use std::fmt;
use std::time::Duration;

use at_protocol::response::find_terminator;
use at_protocol::EncodeCommand;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::ModemError;

/// One open modem stream
pub struct Link<T> {
    port: String,
    baud_rate: u32,
    io: T,
    buffer: Vec<u8>,
    poll_interval: Duration,
}

impl<T> Link<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an open stream
    pub fn new(port: impl Into<String>, baud_rate: u32, io: T, poll_interval: Duration) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            io,
            buffer: vec![0u8; 1024],
            poll_interval,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Write raw bytes and flush
    pub async fn write(&mut self, data: &[u8]) -> Result<(), ModemError> {
        trace!("{} <- {:02X?}", self.port, data);
        self.io
            .write_all(data)
            .await
            .map_err(|e| ModemError::WriteFailure {
                reason: e.to_string(),
            })?;
        self.io.flush().await.map_err(|e| ModemError::WriteFailure {
            reason: e.to_string(),
        })
    }

    /// Send one command line and wait for a terminal token
    ///
    /// Returns everything received up to and including the token.
    pub async fn transact<C>(
        &mut self,
        command: &C,
        tokens: &[&str],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, ModemError>
    where
        C: EncodeCommand + fmt::Display + ?Sized,
    {
        let label = command.to_string();
        if cancel.is_cancelled() {
            return Err(ModemError::Cancelled {
                command: label,
                partial: String::new(),
            });
        }

        debug!("{} <- {}", self.port, label);
        self.write(&command.encode()).await?;

        self.collect(&label, tokens, timeout, cancel).await
    }

    /// Wait for a terminal token without writing anything first
    ///
    /// `label` names the wait in errors.
    pub async fn collect(
        &mut self,
        label: &str,
        tokens: &[&str],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, ModemError> {
        let deadline = Instant::now() + timeout;
        let mut received: Vec<u8> = Vec::new();

        loop {
            {
                let text = String::from_utf8_lossy(&received);
                if let Some(token) = find_terminator(&text, tokens) {
                    debug!("{} -> {:?} (matched {:?})", self.port, text, token);
                    return Ok(text.into_owned());
                }
            }

            let now = Instant::now();
            if now >= deadline {
                debug!("{} timed out waiting for {:?}", label, tokens);
                return Err(ModemError::Timeout {
                    command: label.to_string(),
                    after_ms: timeout.as_millis() as u64,
                    partial: String::from_utf8_lossy(&received).into_owned(),
                });
            }
            let wait = self.poll_interval.min(deadline - now);

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("{} cancelled", label);
                    return Err(ModemError::Cancelled {
                        command: label.to_string(),
                        partial: String::from_utf8_lossy(&received).into_owned(),
                    });
                }

                result = tokio::time::timeout(wait, self.io.read(&mut self.buffer)) => {
                    match result {
                        Ok(Ok(n)) if n > 0 => {
                            trace!("{} -> {:02X?}", self.port, &self.buffer[..n]);
                            received.extend_from_slice(&self.buffer[..n]);
                        }
                        Ok(Ok(_)) => {
                            // End of stream, wait out the poll interval before retrying
                            tokio::time::sleep(wait).await;
                        }
                        Ok(Err(e)) => {
                            trace!("Read error on {}: {}", self.port, e);
                            tokio::time::sleep(wait).await;
                        }
                        Err(_) => {} // Timeout, poll again
                    }
                }
            }
        }
    }

    /// Shut the stream down
    pub async fn close(mut self) {
        debug!("Closing {}", self.port);
        let _ = self.io.shutdown().await;
    }
}
