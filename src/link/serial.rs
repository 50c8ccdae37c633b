//! Serial Link (C2): half-duplex byte transport over RS-485. Clears
//! stale input, writes and flushes atomically, then reads the 4-byte
//! header before the LEN+2 tail so a frame is never read partially.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::debug;

use super::Link;

const HEADER_LEN: usize = 4;
const CRC_LEN: usize = 2;
pub const DEFAULT_TIMEOUT_MS: u64 = 200;

pub struct SerialLink {
    port: SerialStream,
    timeout: Duration,
}

impl SerialLink {
    pub fn open(path: &str, baud_rate: u32) -> std::io::Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .open_native_async()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Ok(SerialLink {
            port,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn read_exact_within(&mut self, len: usize) -> Option<Vec<u8>> {
        let mut buf = vec![0u8; len];
        match tokio::time::timeout(self.timeout, self.port.read_exact(&mut buf)).await {
            Ok(Ok(_)) => Some(buf),
            Ok(Err(e)) => {
                debug!(error = %e, "serial read error");
                None
            }
            Err(_) => {
                debug!("serial read deadline exceeded");
                None
            }
        }
    }
}

#[async_trait]
impl Link for SerialLink {
    async fn send(&mut self, data: &[u8]) -> std::io::Result<()> {
        // Discard stale input belonging to a prior exchange before
        // writing: input-flush -> write -> output-flush.
        self.port.clear(tokio_serial::ClearBuffer::Input).ok();
        self.port.write_all(data).await?;
        self.port.flush().await?;
        Ok(())
    }

    async fn receive(&mut self) -> Vec<u8> {
        let Some(header) = self.read_exact_within(HEADER_LEN).await else {
            return Vec::new();
        };
        let payload_len = header[3] as usize;
        let Some(tail) = self.read_exact_within(payload_len + CRC_LEN).await else {
            return Vec::new();
        };

        let mut frame = header;
        frame.extend_from_slice(&tail);
        frame
    }

    async fn close(&mut self) {
        // Dropping the `SerialStream` releases the file descriptor;
        // nothing further is needed, but the method exists so callers
        // (the Supervisor) always have an explicit close point.
    }
}
