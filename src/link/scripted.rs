//! A scripted [`Link`]/[`DatagramLink`] double used by unit and
//! integration tests to stand in for real serial/UDP transports
//! without touching hardware or sockets.

use async_trait::async_trait;
use std::collections::VecDeque;

use super::{DatagramLink, Link};

/// Replays a fixed queue of replies, one per `send`/`recv` call; an
/// empty queue (or an explicit empty entry) simulates a timeout.
pub struct ScriptedLink {
    pub sent: Vec<Vec<u8>>,
    replies: VecDeque<Vec<u8>>,
}

impl ScriptedLink {
    pub fn new(replies: Vec<Vec<u8>>) -> Self {
        ScriptedLink {
            sent: Vec::new(),
            replies: replies.into(),
        }
    }
}

#[async_trait]
impl Link for ScriptedLink {
    async fn send(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.sent.push(data.to_vec());
        Ok(())
    }

    async fn receive(&mut self) -> Vec<u8> {
        self.replies.pop_front().unwrap_or_default()
    }

    async fn close(&mut self) {}
}

pub struct ScriptedDatagramLink {
    datagrams: VecDeque<Vec<u8>>,
}

impl ScriptedDatagramLink {
    pub fn new(datagrams: Vec<Vec<u8>>) -> Self {
        ScriptedDatagramLink {
            datagrams: datagrams.into(),
        }
    }
}

#[async_trait]
impl DatagramLink for ScriptedDatagramLink {
    async fn recv(&mut self, _timeout_s: f64) -> Vec<u8> {
        self.datagrams.pop_front().unwrap_or_default()
    }

    async fn close(&mut self) {}
}
