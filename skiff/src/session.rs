use futures::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use futures_time::future::FutureExt;

use crate::{
    error::{DisconnectedBy, DisconnectedError, Error, Result},
    side::Side,
    stream::Stream,
    wire::{
        id::Id,
        trans::{
            Debug, Disconnect, DisconnectReason, Ignore, KexInit, ServiceAccept, ServiceRequest,
            Unimplemented,
        },
        Message, Packet,
    },
};

/// A trait alias for something _pipe-alike_, implementing [`AsyncBufRead`] and [`AsyncWrite`].
pub trait Pipe: AsyncBufRead + AsyncWrite + Unpin + Send + Sync + 'static {}
impl<T: AsyncBufRead + AsyncWrite + Unpin + Send + Sync + 'static> Pipe for T {}

/// A session wrapping a `stream` to handle **key-exchange** and
/// **`SSH-TRANS`** layer messages.
pub struct Session<IO: Pipe, S: Side> {
    stream: Result<Stream<IO>, DisconnectedError>,
    config: S,

    peer_id: Id,
}

impl<IO, S> Session<IO, S>
where
    IO: Pipe,
    S: Side,
{
    /// Create a new [`Session`] from a [`Pipe`] stream,
    /// and some configuration.
    ///
    /// This performs the identification exchange: our banner is
    /// written out and the peer's is read back, verbatim copies of
    /// both being kept for the exchange-hash computation.
    pub async fn new(mut stream: IO, config: S) -> Result<Self> {
        config.id().to_async_writer(&mut stream).await?;
        stream.flush().await?;

        let peer_id = Id::from_async_reader(&mut stream)
            .timeout(config.timeout())
            .await??;

        if !peer_id.is_v2() {
            return Err(Error::UnsupportedVersion);
        }

        let stream = Stream::new(stream, config.timeout());

        tracing::debug!("Session started with peer `{peer_id}`");

        Ok(Self {
            stream: Ok(stream),
            config,
            peer_id,
        })
    }

    /// Access the [`Id`] of the connected peer.
    pub fn peer_id(&self) -> &Id {
        &self.peer_id
    }

    /// Access the session identifier, the exchange hash of the first
    /// key exchange, immutable afterwards.
    pub fn session_id(&self) -> Option<&[u8]> {
        self.stream.as_ref().ok().and_then(Stream::session_id)
    }

    /// Waits until the [`Session`] becomes readable,
    /// mainly to be used with [`Session::recv`] in [`futures::select`],
    /// since the `recv` method is **not cancel-safe**.
    pub async fn readable(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().map_err(|err| err.clone())?;

        stream.fill_buf().await
    }

    /// Receive a _packet_ from the connected peer.
    ///
    /// Transport-layer housekeeping never surfaces here: `ignore`,
    /// `debug` and `unimplemented` messages are absorbed, and an
    /// inbound `SSH_MSG_KEXINIT` triggers the key-exchange procedure
    /// before the next packet is fetched.
    ///
    /// # Cancel safety
    /// This method is **not cancel-safe**, if used within a [`futures::select`] call,
    /// some data may be partially received.
    pub async fn recv(&mut self) -> Result<Packet> {
        loop {
            let stream = self.stream.as_mut().map_err(|err| err.clone())?;

            let kex_due = stream.rekeyable()
                || match stream
                    .peek()
                    .await
                    .map(|packet| packet.to::<KexInit>().is_ok())
                {
                    Ok(is_kexinit) => is_kexinit,
                    Err(err) => return Err(self.failed(err).await),
                };

            if kex_due {
                if let Err(err) = self.config.kex(stream, &self.peer_id).await {
                    return Err(self.failed(err).await);
                }

                continue;
            }

            let packet = match stream.recv().await {
                Ok(packet) => packet,
                Err(err) => return Err(self.failed(err).await),
            };

            if let Ok(Disconnect {
                reason,
                description,
                ..
            }) = packet.to()
            {
                tracing::warn!("Peer disconnected with `{reason:?}`: {description}");

                self.stream = Err(DisconnectedError {
                    by: DisconnectedBy::Them,
                    reason,
                    description,
                });
            } else if let Ok(Ignore { data }) = packet.to() {
                tracing::debug!("Received an 'ignore' message with length {}", data.len());
            } else if let Ok(Unimplemented { seq }) = packet.to() {
                tracing::debug!("Received an 'unimplemented' message about packet #{seq}");
            } else if let Ok(Debug { message, .. }) = packet.to() {
                tracing::debug!("Received a 'debug' message: {message}");
            } else {
                break Ok(packet);
            }
        }
    }

    /// Send a [`Message`] to the connected peer.
    ///
    /// A key exchange becoming due, or a pending inbound
    /// `SSH_MSG_KEXINIT`, is serviced before the message goes out.
    pub async fn send(&mut self, message: &impl Message) -> Result<()> {
        let stream = self.stream.as_mut().map_err(|err| err.clone())?;

        if stream.rekeyable()
            || (stream.is_readable().await? && stream.peek().await?.to::<KexInit>().is_ok())
        {
            if let Err(err) = self.config.kex(stream, &self.peer_id).await {
                return Err(self.failed(err).await);
            }
        }

        let stream = self.stream.as_mut().map_err(|err| err.clone())?;
        match stream.send(message).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.failed(err).await),
        }
    }

    /// Initiate a key exchange right away, installing fresh keys on
    /// both directions; sequence numbers are not reset.
    pub async fn rekey(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().map_err(|err| err.clone())?;

        if let Err(err) = self.config.kex(stream, &self.peer_id).await {
            return Err(self.failed(err).await);
        }

        Ok(())
    }

    /// Send a _disconnect message_ to the peer and shutdown the session.
    pub async fn disconnect(
        &mut self,
        reason: DisconnectReason,
        description: impl Into<String>,
    ) -> DisconnectedError {
        let description = description.into();

        if let Ok(stream) = self.stream.as_mut() {
            let message = Disconnect {
                reason,
                description: description.clone(),
                language: Default::default(),
            };

            // Best-effort: the peer may be gone already.
            let _ = stream.send(&message).await;
        }

        let err = DisconnectedError {
            by: DisconnectedBy::Us,
            reason,
            description,
        };
        self.stream = Err(err.clone());

        err
    }

    /// Request a _service_ from the peer, and await its acceptance.
    pub async fn request(&mut self, service_name: &str) -> Result<()> {
        self.send(&ServiceRequest {
            service_name: service_name.into(),
        })
        .await?;

        let packet = self.recv().await?;
        match packet.to::<ServiceAccept>() {
            Ok(accept) if accept.service_name == service_name => Ok(()),
            Ok(_) => Err(self
                .disconnect(
                    DisconnectReason::ServiceNotAvailable,
                    "Accepted service is unknown",
                )
                .await
                .into()),
            Err(_) => Err(self
                .disconnect(
                    DisconnectReason::ProtocolError,
                    "Unexpected message outside of a service response",
                )
                .await
                .into()),
        }
    }

    /// Report `err` to the peer as a disconnect when the protocol
    /// calls for one, then surface it.
    async fn failed(&mut self, err: Error) -> Error {
        if let Some(reason) = err.disconnect_reason() {
            let _ = self.disconnect(reason, err.to_string()).await;
        }

        err
    }
}
