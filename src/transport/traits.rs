//! Link abstraction between the command layer and the actuator bus

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// An open duplex byte stream to an actuator controller
#[async_trait]
pub trait TransportStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// Flush pending output and release the link
    async fn close(&mut self) -> Result<()> {
        self.flush().await?;
        self.shutdown().await?;
        Ok(())
    }
}

/// Opens a configured link to the bus
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// The stream type this connector produces
    type Stream: TransportStream;

    /// Open the endpoint with its line settings applied
    async fn open(&self) -> Result<Self::Stream>;

    /// Device path or other endpoint identifier, for diagnostics
    fn endpoint(&self) -> &str;
}

#[cfg(test)]
impl TransportStream for tokio::io::DuplexStream {}
