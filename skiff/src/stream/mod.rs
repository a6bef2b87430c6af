//! Primitives to frame, seal and open packets over a [`Pipe`] stream.

use futures::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, FutureExt};
use futures_time::{future::FutureExt as _, time::Duration};

use crate::{wire::Message, Pipe, Result};

mod transport;
pub use transport::{Transport, TransportPair, MAX_PACKET_SIZE};

#[doc(no_inline)]
pub use crate::wire::Packet;

/// Re-key after 2^28 packets in either direction,
/// as recommended per the RFC.
const REKEY_THRESHOLD: u32 = 0x10000000;

/// A wrapper around a [`Pipe`] to interface with the SSH binary
/// packet protocol.
pub struct Stream<S> {
    inner: S,
    timeout: Duration,

    /// The pair of transports computed from the key exchange.
    transport: TransportPair,

    /// The session identifier derived from the first key exchange.
    session: Option<Vec<u8>>,

    /// Sequence number for the `tx` side.
    txseq: u32,

    /// Sequence number for the `rx` side.
    rxseq: u32,

    /// A buffer for the `peek` method.
    buffer: Option<Packet>,
}

impl<S> Stream<S>
where
    S: Pipe,
{
    pub(crate) fn new(stream: S, timeout: Duration) -> Self {
        Self {
            inner: stream,
            timeout,
            transport: Default::default(),
            session: None,
            txseq: 0,
            rxseq: 0,
            buffer: None,
        }
    }

    /// Whether a key exchange is due on this stream,
    /// either because none happened yet or because the sequence
    /// numbers approach their wrapping point.
    pub fn rekeyable(&self) -> bool {
        self.session.is_none() || self.txseq > REKEY_THRESHOLD || self.rxseq > REKEY_THRESHOLD
    }

    /// Install the transports derived from a completed key exchange;
    /// packets sealed or opened from now on use the new keys.
    pub(crate) fn with_transport(&mut self, transport: TransportPair) {
        self.transport = transport;
    }

    /// Record the session identifier on the first exchange,
    /// and return the canonical one.
    pub(crate) fn with_session(&mut self, hash: &[u8]) -> &[u8] {
        self.session.get_or_insert_with(|| hash.to_vec())
    }

    /// The session identifier, once the first key exchange completed.
    pub fn session_id(&self) -> Option<&[u8]> {
        self.session.as_deref()
    }

    pub(crate) async fn fill_buf(&mut self) -> Result<()> {
        self.inner.fill_buf().await?;

        Ok(())
    }

    /// Poll the stream to detect whether data is immediately readable.
    pub(crate) async fn is_readable(&mut self) -> Result<bool> {
        futures::select_biased! {
            buf = self.inner.fill_buf().fuse() => {
                buf?;

                Ok(true)
            }
            _ = futures::future::ready(()).fuse() => {
                Ok(false)
            }
        }
    }

    /// Receive and open a _packet_ from the peer without removing it
    /// from the queue.
    pub async fn peek(&mut self) -> Result<&Packet> {
        let packet = self.recv().await?;

        Ok(self.buffer.insert(packet))
    }

    /// Receive and open a _packet_ from the peer.
    pub async fn recv(&mut self) -> Result<Packet> {
        if let Some(packet) = self.buffer.take() {
            return Ok(packet);
        }

        let mut first = vec![0u8; self.transport.rx.initial_read()];
        self.inner
            .read_exact(&mut first)
            .timeout(self.timeout)
            .await??;

        let mut rest = vec![0u8; self.transport.rx.remaining(&first)?];
        self.inner
            .read_exact(&mut rest)
            .timeout(self.timeout)
            .await??;

        let payload = self.transport.rx.open(&first, &rest, self.rxseq)?;
        let packet = Packet { payload };

        tracing::trace!(
            "<~- #{}: ^{:#x} ({} bytes)",
            self.rxseq,
            packet.code().unwrap_or_default(),
            packet.payload.len(),
        );

        self.rxseq = self.rxseq.wrapping_add(1);

        Ok(packet)
    }

    /// Seal and send a [`Message`] to the peer.
    pub async fn send(&mut self, message: &impl Message) -> Result<()> {
        self.send_payload(&Packet::new(message).payload).await
    }

    /// Seal and send an already-encoded payload to the peer.
    pub(crate) async fn send_payload(&mut self, payload: &[u8]) -> Result<()> {
        let wire = self.transport.tx.seal(payload, self.txseq)?;

        self.inner
            .write_all(&wire)
            .timeout(self.timeout)
            .await??;
        self.inner.flush().await?;

        tracing::trace!(
            "-~> #{}: ^{:#x} ({} bytes)",
            self.txseq,
            payload.first().copied().unwrap_or_default(),
            payload.len(),
        );

        self.txseq = self.txseq.wrapping_add(1);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::trans::{Ignore, NewKeys};

    fn stream() -> Stream<futures::io::Cursor<Vec<u8>>> {
        Stream::new(
            futures::io::Cursor::new(Vec::new()),
            std::time::Duration::from_secs(1).into(),
        )
    }

    #[async_std::test]
    async fn sequence_numbers_climb_once_per_packet() {
        let mut stream = stream();

        for _ in 0..3 {
            stream.send(&NewKeys).await.unwrap();
        }
        assert_eq!(stream.txseq, 3);

        stream.inner.set_position(0);

        for _ in 0..3 {
            assert!(stream.recv().await.unwrap().to::<NewKeys>().is_ok());
        }
        assert_eq!(stream.rxseq, 3);
    }

    #[async_std::test]
    async fn peek_does_not_consume() {
        let mut stream = stream();

        let message = Ignore {
            data: b"to be peeked".to_vec(),
        };
        stream.send(&message).await.unwrap();
        stream.inner.set_position(0);

        assert!(stream.peek().await.unwrap().to::<Ignore>().is_ok());
        assert_eq!(stream.recv().await.unwrap().to::<Ignore>().unwrap(), message);
        assert_eq!(stream.rxseq, 1);
    }

    #[async_std::test]
    async fn a_fresh_stream_wants_keys() {
        let stream = stream();

        assert!(stream.rekeyable());
    }
}
