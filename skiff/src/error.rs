//! Collection of error handling types and aliases.

use thiserror::Error;

use crate::wire::{self, trans::DisconnectReason};

/// The disconnection side for [`DisconnectedError`].
#[derive(Debug, Clone)]
pub enum DisconnectedBy {
    /// The session has been disconnected by _us_.
    Us,

    /// The session has been disconnected by _them_.
    Them,
}

/// The error type describing disconnect.
#[must_use]
#[derive(Debug, Error, Clone)]
#[error("The session has been disconnected by {by:?} for {reason:?}: {description}")]
pub struct DisconnectedError {
    /// Side that sent the disconnect message.
    pub by: DisconnectedBy,

    /// Reason for disconnect.
    pub reason: DisconnectReason,

    /// Description of the disconnect reason.
    pub description: String,
}

/// The error types that can occur when manipulating this crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// I/O Error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wire (de)-serialization error, identification line included.
    #[error(transparent)]
    Wire(#[from] wire::Error),

    /// Packet integrity error, MAC or AEAD tag.
    #[error(transparent)]
    Integrity(#[from] digest::MacError),

    /// The peer identified with an incompatible protocol version.
    #[error("Peer speaks an SSH protocol version other than 2.0")]
    UnsupportedVersion,

    /// No common kex algorithm found between both sides.
    #[error("Unable to negociate a common kex algorithm")]
    NoCommonKex,

    /// No common host-key algorithm found between both sides.
    #[error("Unable to negociate a common host key algorithm")]
    NoCommonKey,

    /// No common cipher algorithm found between both sides.
    #[error("Unable to negociate a common encryption algorithm")]
    NoCommonCipher,

    /// No common hmac algorithm found between both sides.
    #[error("Unable to negociate a common HMAC algorithm")]
    NoCommonHmac,

    /// No common compression algorithm found between both sides.
    #[error("Unable to negociate a common compression algorithm")]
    NoCommonCompression,

    /// Protocol error in the key-exchange.
    #[error("Error in the key-exchange algorithm")]
    KexError,

    /// The peer's host key was rejected by the verifier.
    #[error("The peer's host key has been rejected")]
    UntrustedKey,

    /// Error while encrypting or decrypting messages.
    #[error("The cipher ended up in an error")]
    Cipher,

    /// A packet length field outside of the protocol bounds.
    #[error("Peer announced an unreasonable packet length of {0} bytes")]
    PacketSize(usize),

    /// A packet framed with an impossible padding length.
    #[error("Peer framed a packet with an invalid padding of {0} bytes")]
    Padding(usize),

    /// The message received was unexpected in the current context.
    #[error("Peer sent a message that made no sense in the current context")]
    UnexpectedMessage,

    /// The session has been disconnected.
    #[error(transparent)]
    Disconnected(#[from] DisconnectedError),
}

impl Error {
    /// The disconnect reason we announce to the peer before
    /// surfacing this error, if the protocol calls for one.
    pub(crate) fn disconnect_reason(&self) -> Option<DisconnectReason> {
        match self {
            Self::Wire(_) | Self::PacketSize(_) | Self::Padding(_) | Self::UnexpectedMessage => {
                Some(DisconnectReason::ProtocolError)
            }
            Self::Integrity(_) | Self::Cipher => Some(DisconnectReason::MacError),
            Self::UnsupportedVersion => Some(DisconnectReason::ProtocolVersionNotSupported),
            Self::NoCommonKex
            | Self::NoCommonKey
            | Self::NoCommonCipher
            | Self::NoCommonHmac
            | Self::NoCommonCompression
            | Self::KexError => Some(DisconnectReason::KeyExchangeFailed),
            Self::UntrustedKey => Some(DisconnectReason::HostKeyNotVerifiable),
            Self::Io(_) | Self::Disconnected(_) => None,
        }
    }
}

/// A handy [`std::result::Result`] type alias bounding the [`enum@Error`] struct as `E`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
