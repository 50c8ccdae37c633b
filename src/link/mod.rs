//! Link capability: an abstraction over a byte transport (serial
//! half-duplex or UDP datagram). Serial and Datagram variants
//! implement it; tests substitute a scripted variant. The Poll Engine
//! and Push Listener are generic over these traits so neither cares
//! which transport backs it.

pub mod datagram;
pub mod serial;

/// Scripted test doubles for `Link`/`DatagramLink`. Not gated behind
/// `#[cfg(test)]` so integration tests (compiled as a separate crate)
/// can use them too.
pub mod scripted;

use async_trait::async_trait;

/// A half-duplex, frame-aware byte transport (C2's contract).
#[async_trait]
pub trait Link: Send {
    /// Atomic transmission: discard buffered input, write all bytes,
    /// flush to the wire before returning.
    async fn send(&mut self, data: &[u8]) -> std::io::Result<()>;

    /// Frame-aware read with the link's configured deadline. Returns
    /// an empty `Vec` on any timeout or short read; never a partial
    /// frame.
    async fn receive(&mut self) -> Vec<u8>;

    /// Idempotent release of the OS resource.
    async fn close(&mut self);
}

/// A bound datagram transport (C3's contract).
#[async_trait]
pub trait DatagramLink: Send {
    /// Blocks up to `timeout_s` for a single datagram; returns the
    /// payload on success, empty on timeout or any socket error.
    async fn recv(&mut self, timeout_s: f64) -> Vec<u8>;

    /// Idempotent release of the OS resource.
    async fn close(&mut self);
}
