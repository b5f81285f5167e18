//! One-shot request/response session over a transport stream

use crate::transport::traits::{TransportConnector, TransportStream};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Duration, Instant};
use tracing::{debug, warn};

/// Size of a single read from the transport
const READ_CHUNK: usize = 1024;

/// Errors that end a session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Write to transport failed: {0}")]
    Write(#[source] io::Error),

    #[error("Write to output failed: {0}")]
    Sink(#[source] io::Error),
}

/// Owns the transport stream for the lifetime of one command
pub struct Session<S: TransportStream> {
    stream: S,
}

impl<S: TransportStream> Session<S> {
    /// Wrap an already-open stream
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Open a session through a connector
    pub async fn open<C>(connector: &C) -> anyhow::Result<Self>
    where
        C: TransportConnector<Stream = S>,
    {
        let stream = connector.open().await?;
        debug!("session open on {}", connector.endpoint());
        Ok(Self::new(stream))
    }

    /// Write all bytes to the stream
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        self.stream.write_all(bytes).await.map_err(SessionError::Write)?;
        self.stream.flush().await.map_err(SessionError::Write)?;
        debug!("sent {} bytes", bytes.len());
        Ok(())
    }

    /// Write all bytes, then copy the reply into `sink` until the stream
    /// ends or `timeout` has passed since the write completed.
    ///
    /// Returns the number of reply bytes forwarded. A deadline that passes
    /// without any reply is not an error.
    pub async fn send_and_await<W>(
        &mut self,
        bytes: &[u8],
        timeout: Duration,
        sink: &mut W,
    ) -> Result<usize, SessionError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.send(bytes).await?;

        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; READ_CHUNK];
        let mut forwarded = 0;

        loop {
            match timeout_at(deadline, self.stream.read(&mut buf)).await {
                Err(_) => {
                    debug!("reply window of {:?} elapsed after {} bytes", timeout, forwarded);
                    break;
                }
                Ok(Ok(0)) => {
                    debug!("transport closed after {} reply bytes", forwarded);
                    break;
                }
                Ok(Ok(n)) => {
                    sink.write_all(&buf[..n]).await.map_err(SessionError::Sink)?;
                    sink.flush().await.map_err(SessionError::Sink)?;
                    forwarded += n;
                }
                Ok(Err(e)) => {
                    warn!("Read from transport failed: {}", e);
                    break;
                }
            }
        }

        Ok(forwarded)
    }

    /// Close the stream gracefully
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.stream.close().await
    }
}
