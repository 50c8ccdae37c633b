//! Push Listener (C6): single-frame receive-and-store loop over a
//! [`DatagramLink`]. Decode, validate cmd/payload length, parse,
//! insert, commit -- one frame at a time, with no outer cycle
//! boundary the way the Poll Engine has.

use tracing::{debug, info};

use crate::codec::{self, REPLY_PAYLOAD_LEN};
use crate::error::StoreError;
use crate::link::DatagramLink;
use crate::model::{Command, Reading};
use crate::store::Store;

pub struct PushListener<D: DatagramLink> {
    link: D,
}

impl<D: DatagramLink> PushListener<D> {
    pub fn new(link: D) -> Self {
        PushListener { link }
    }

    /// Receives and processes one pushed frame. Returns `None` on
    /// timeout or any validation failure; the listener does not know a
    /// fixed device set, so any address in 1..=247 is acceptable.
    pub async fn receive(
        &mut self,
        timeout_s: f64,
        store: &mut Store,
    ) -> Result<Option<Reading>, StoreError> {
        let raw = self.link.recv(timeout_s).await;
        if raw.is_empty() {
            return Ok(None);
        }

        let decoded = match codec::decode_frame(&raw) {
            Ok(f) => f,
            Err(e) => {
                debug!(error = %e, "bad pushed frame");
                return Ok(None);
            }
        };

        if decoded.cmd != Command::Reply {
            debug!(cmd = ?decoded.cmd, "unexpected cmd in pushed frame");
            return Ok(None);
        }

        if decoded.payload.len() != REPLY_PAYLOAD_LEN {
            debug!(len = decoded.payload.len(), "bad payload length in pushed frame");
            return Ok(None);
        }

        let channels = match codec::parse_reply(decoded.payload) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "bad pushed reply payload");
                return Ok(None);
            }
        };

        let reading = Reading::new(decoded.addr, channels);
        info!(
            addr = decoded.addr,
            t0 = %reading.fmt_channel(0),
            t1 = %reading.fmt_channel(1),
            t2 = %reading.fmt_channel(2),
            t3 = %reading.fmt_channel(3),
            "device pushed reading"
        );

        store.insert(reading.addr, &reading.channels).await?;
        store.commit().await?;

        Ok(Some(reading))
    }

    pub async fn close(&mut self) {
        self.link.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_reply_payload;
    use crate::link::scripted::ScriptedDatagramLink;
    use crate::model::{Command, Sample};

    #[tokio::test]
    async fn s6_push_path_success() {
        let payload = encode_reply_payload([
            Sample::Present(250),
            Sample::Present(255),
            Sample::Present(0),
            Sample::Present(-100),
        ]);
        let frame = codec::encode_frame(5, Command::REPLY, &payload).unwrap();

        let link = ScriptedDatagramLink::new(vec![frame]);
        let mut listener = PushListener::new(link);
        let mut store = Store::open(":memory:").await.unwrap();

        let reading = listener.receive(1.0, &mut store).await.unwrap().unwrap();
        assert_eq!(reading.addr, 5);

        let rows = store.fetch(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].temps, [Some(250), Some(255), Some(0), Some(-100)]);
    }

    #[tokio::test]
    async fn s6_push_path_tampered_crc_is_dropped() {
        let payload = encode_reply_payload([Sample::Present(1), Sample::Absent, Sample::Absent, Sample::Absent]);
        let mut frame = codec::encode_frame(5, Command::REPLY, &payload).unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;

        let link = ScriptedDatagramLink::new(vec![frame]);
        let mut listener = PushListener::new(link);
        let mut store = Store::open(":memory:").await.unwrap();

        let reading = listener.receive(1.0, &mut store).await.unwrap();
        assert!(reading.is_none());
        assert!(store.fetch(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn s8_push_idempotency_of_errors() {
        let link = ScriptedDatagramLink::new(vec![vec![0xFFu8; 3]]); // garbage, too short
        let mut listener = PushListener::new(link);
        let mut store = Store::open(":memory:").await.unwrap();

        let before = store.fetch(10).await.unwrap().len();
        let reading = listener.receive(1.0, &mut store).await.unwrap();
        assert!(reading.is_none());
        assert_eq!(store.fetch(10).await.unwrap().len(), before);
    }
}
