//! Session [`Side`]s; only the [`Client`] side is provided.

use futures::Future;
use futures_time::time::Duration;

use crate::{
    stream::{Stream, TransportPair},
    wire::{
        id::Id,
        trans::{KexInit, NewKeys},
        Packet,
    },
    Pipe, Result,
};

pub mod client;
use client::Client;

mod private {
    use crate::algorithm::Exchange;

    pub trait Sealed {}

    impl<X: Exchange> Sealed for super::Client<X> {}
}

/// The byte-exact artifacts of an `SSH_MSG_KEXINIT` exchange, kept
/// around because the exchange hash covers the payloads as sent.
#[derive(Debug)]
pub struct KexInits<'x> {
    /// Our `SSH_MSG_KEXINIT` message.
    pub own: &'x KexInit,

    /// Our message's payload, byte-exact as sent.
    pub own_payload: &'x [u8],

    /// The peer's `SSH_MSG_KEXINIT` message.
    pub peer: &'x KexInit,

    /// The peer's payload, byte-exact as received.
    pub peer_payload: &'x [u8],
}

/// A side of the SSH protocol.
pub trait Side: private::Sealed + Send + Sync + Unpin + 'static {
    /// Get the [`Id`] for this session.
    fn id(&self) -> &Id;

    /// Get the _timeout_ for this session.
    fn timeout(&self) -> Duration;

    /// Generate a fresh [`KexInit`] message from the config.
    fn kexinit(&self) -> KexInit;

    /// Negotiate the algorithms and run the key exchange,
    /// producing the transports to install at the `SSH_MSG_NEWKEYS`
    /// boundary.
    fn exchange(
        &self,
        stream: &mut Stream<impl Pipe>,
        kexinits: KexInits<'_>,
        peer_id: &Id,
    ) -> impl Future<Output = Result<TransportPair>> + Send;

    /// Observation hook invoked once a key exchange installed new keys.
    fn keyed(&self, session_id: &[u8]) {
        let _ = session_id;
    }

    /// Perform the key-exchange procedure from this side.
    fn kex(
        &self,
        stream: &mut Stream<impl Pipe>,
        peer_id: &Id,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            tracing::debug!("Starting key-exchange procedure");

            let kexinit = self.kexinit();
            let own = Packet::new(&kexinit);
            stream.send_payload(&own.payload).await?;

            let peer = stream.recv().await?;
            let peerkexinit = peer.to::<KexInit>()?;

            let transport = self
                .exchange(
                    stream,
                    KexInits {
                        own: &kexinit,
                        own_payload: &own.payload,
                        peer: &peerkexinit,
                        peer_payload: &peer.payload,
                    },
                    peer_id,
                )
                .await?;

            stream.send(&NewKeys).await?;
            stream.recv().await?.to::<NewKeys>()?;

            tracing::debug!(
                "Key exchange success, negociated transports:\nrx: {:?}\ntx: {:?}",
                transport.rx,
                transport.tx,
            );

            stream.with_transport(transport);

            if let Some(session_id) = stream.session_id() {
                self.keyed(session_id);
            }

            Ok(())
        }
    }
}
