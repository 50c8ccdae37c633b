//! Poll Engine (C5): drives a half-duplex request/reply dialogue
//! across all configured devices over a [`Link`]. Each device goes
//! through encode -> send -> receive -> decode -> validate
//! addr/cmd/len -> parse, sequentially, with exactly one commit per
//! cycle.

use tracing::{debug, info};

use crate::codec::{self, REPLY_PAYLOAD_LEN};
use crate::error::StoreError;
use crate::link::Link;
use crate::model::{Command, Reading};
use crate::store::Store;

pub struct PollEngine<L: Link> {
    link: L,
    devices: Vec<u8>,
}

impl<L: Link> PollEngine<L> {
    pub fn new(link: L, devices: Vec<u8>) -> Self {
        PollEngine { link, devices }
    }

    /// Polls a single device. Every error condition -- timeout, bad
    /// frame, wrong respondent, wrong command, wrong payload length --
    /// collapses to `None`; details go to the debug log. No retries:
    /// the next cycle tries again.
    pub async fn poll(&mut self, addr: u8) -> Option<Reading> {
        let frame = codec::encode_poll(addr).ok()?;
        if self.link.send(&frame).await.is_err() {
            debug!(addr, "send failed polling device");
            return None;
        }

        let raw = self.link.receive().await;
        if raw.is_empty() {
            debug!(addr, "timeout polling device");
            return None;
        }

        let decoded = match codec::decode_frame(&raw) {
            Ok(f) => f,
            Err(e) => {
                debug!(addr, error = %e, "bad frame from device");
                return None;
            }
        };

        if decoded.addr != addr {
            debug!(
                addr,
                got = decoded.addr,
                "addr mismatch: wrong respondent on shared bus"
            );
            return None;
        }

        if decoded.cmd != Command::Reply {
            debug!(addr, cmd = ?decoded.cmd, "unexpected cmd from device");
            return None;
        }

        if decoded.payload.len() != REPLY_PAYLOAD_LEN {
            debug!(addr, len = decoded.payload.len(), "bad payload length from device");
            return None;
        }

        let channels = match codec::parse_reply(decoded.payload) {
            Ok(c) => c,
            Err(e) => {
                debug!(addr, error = %e, "bad reply payload from device");
                return None;
            }
        };

        let reading = Reading::new(addr, channels);
        info!(
            addr,
            t0 = %reading.fmt_channel(0),
            t1 = %reading.fmt_channel(1),
            t2 = %reading.fmt_channel(2),
            t3 = %reading.fmt_channel(3),
            "device responded"
        );
        Some(reading)
    }

    /// Polls all configured devices, sequentially (the bus is shared
    /// and half-duplex -- never in parallel), inserting each
    /// successful reading and committing exactly once at the end of
    /// the cycle.
    pub async fn poll_all(&mut self, store: &mut Store) -> Result<Vec<Reading>, StoreError> {
        let mut results = Vec::new();
        let devices = self.devices.clone();

        for addr in devices {
            if let Some(reading) = self.poll(addr).await {
                store.insert(reading.addr, &reading.channels).await?;
                results.push(reading);
            }
        }

        store.commit().await?;
        Ok(results)
    }

    /// Number of configured devices, for cycle-summary logging.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub async fn close(&mut self) {
        self.link.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_reply_payload;
    use crate::link::scripted::ScriptedLink;
    use crate::model::Sample;

    fn reply_frame(addr: u8, channels: [Sample; 4]) -> Vec<u8> {
        let payload = encode_reply_payload(channels);
        codec::encode_frame(addr, Command::REPLY, &payload).unwrap()
    }

    #[tokio::test]
    async fn s4_cycle_of_two_inserts_both_in_order() {
        let link = ScriptedLink::new(vec![
            reply_frame(1, [Sample::Present(10), Sample::Absent, Sample::Absent, Sample::Absent]),
            reply_frame(2, [Sample::Present(20), Sample::Absent, Sample::Absent, Sample::Absent]),
        ]);
        let mut engine = PollEngine::new(link, vec![1, 2]);
        let mut store = Store::open(":memory:").await.unwrap();

        let results = engine.poll_all(&mut store).await.unwrap();
        assert_eq!(results.len(), 2);

        let rows = store.fetch(10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].addr, 1); // oldest id first when reversed
        assert_eq!(rows[0].addr, 2);
    }

    #[tokio::test]
    async fn s5_partial_cycle_on_timeout() {
        let link = ScriptedLink::new(vec![
            reply_frame(1, [Sample::Present(10), Sample::Absent, Sample::Absent, Sample::Absent]),
            Vec::new(), // timeout for device 2
        ]);
        let mut engine = PollEngine::new(link, vec![1, 2]);
        let mut store = Store::open(":memory:").await.unwrap();

        let results = engine.poll_all(&mut store).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].addr, 1);

        let rows = store.fetch(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].addr, 1);
    }

    #[tokio::test]
    async fn s7_poll_filtering_on_addr_mismatch() {
        let link = ScriptedLink::new(vec![reply_frame(
            2,
            [Sample::Present(10), Sample::Absent, Sample::Absent, Sample::Absent],
        )]);
        let mut engine = PollEngine::new(link, vec![1]);
        let mut store = Store::open(":memory:").await.unwrap();

        let results = engine.poll_all(&mut store).await.unwrap();
        assert!(results.is_empty());
        assert!(store.fetch(10).await.unwrap().is_empty());
    }
}
