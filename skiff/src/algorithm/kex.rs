use futures::Future;
use secrecy::SecretBox;

use crate::{
    stream::Stream,
    wire::{id::Id, trans::KexInit},
    Error, Pipe, Result,
};

use super::{CipherKind, Hmac};

pub fn negociate<'k>(clientkex: &'k KexInit, serverkex: &KexInit) -> Result<(&'k str, &'k str)> {
    Ok((
        clientkex
            .kex_algorithms
            .preferred_in(&serverkex.kex_algorithms)
            .ok_or(Error::NoCommonKex)?,
        clientkex
            .server_host_key_algorithms
            .preferred_in(&serverkex.server_host_key_algorithms)
            .ok_or(Error::NoCommonKey)?,
    ))
}

/// The key and IV sizes a key-exchange runner must derive
/// for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySizes {
    /// Size of the cipher IV material.
    pub iv: usize,

    /// Size of the cipher key material.
    pub key: usize,

    /// Size of the MAC key material.
    pub mac: usize,
}

impl KeySizes {
    pub(crate) fn new(cipher: &CipherKind, hmac: &Hmac) -> Self {
        Self {
            iv: cipher.iv_size(),
            key: cipher.key_size(),
            mac: hmac.key_size(),
        }
    }
}

/// Keying material for one direction, as derived by the
/// key-exchange runner.
#[derive(Debug)]
pub struct KeyMaterial {
    /// Cipher _initialization vector_.
    pub iv: SecretBox<Vec<u8>>,

    /// Cipher _key_.
    pub key: SecretBox<Vec<u8>>,

    /// MAC _key_.
    pub mac: SecretBox<Vec<u8>>,
}

/// The outcome of a key exchange: the exchange hash and the six
/// keying materials, client-to-server and server-to-client.
///
/// The hash of the first exchange of a session becomes its immutable
/// _session identifier_.
#[derive(Debug)]
pub struct Secrets {
    /// The exchange hash `H`.
    pub hash: Vec<u8>,

    /// Client-to-server keying material.
    pub client: KeyMaterial,

    /// Server-to-client keying material.
    pub server: KeyMaterial,
}

/// Everything a key-exchange runner needs besides the stream itself.
pub struct KexContext<'k> {
    /// The negotiated key-exchange algorithm name.
    pub kex_algorithm: &'k str,

    /// The negotiated server host-key algorithm name.
    pub host_key_algorithm: &'k str,

    /// The client's identification, byte-exact as exchanged.
    pub v_c: &'k Id,

    /// The server's identification, byte-exact as exchanged.
    pub v_s: &'k Id,

    /// The client's `SSH_MSG_KEXINIT` payload, byte-exact as exchanged.
    pub i_c: &'k [u8],

    /// The server's `SSH_MSG_KEXINIT` payload, byte-exact as exchanged.
    pub i_s: &'k [u8],

    /// The session identifier, set when this exchange is a re-key.
    pub session_id: Option<&'k [u8]>,

    /// The verifier deciding whether the server's host key is trusted.
    pub verifier: &'k dyn HostKeyVerifier,

    /// Sizes of the client-to-server material to derive.
    pub client_sizes: KeySizes,

    /// Sizes of the server-to-client material to derive.
    pub server_sizes: KeySizes,
}

/// A key-exchange runner: performs the negotiated key agreement over
/// the stream and derives the per-direction keying material.
///
/// The runner owns the key-agreement mathematics and the signature
/// verification over the exchange hash; the transport only consumes
/// the resulting [`Secrets`].
pub trait Exchange: Send + Sync {
    /// Run the exchange to completion, between this side's
    /// `SSH_MSG_KEXINIT` and the `SSH_MSG_NEWKEYS` boundary.
    fn run(
        &self,
        stream: &mut Stream<impl Pipe>,
        context: KexContext<'_>,
    ) -> impl Future<Output = Result<Secrets>> + Send;
}

impl std::fmt::Debug for KexContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KexContext")
            .field("kex_algorithm", &self.kex_algorithm)
            .field("host_key_algorithm", &self.host_key_algorithm)
            .field("v_c", &self.v_c)
            .field("v_s", &self.v_s)
            .field("client_sizes", &self.client_sizes)
            .field("server_sizes", &self.server_sizes)
            .finish_non_exhaustive()
    }
}

/// A party deciding whether to trust a host key; implementations are
/// expected to carry the identity of the host they vouch for.
pub trait HostKeyVerifier: Send + Sync {
    /// Whether the encoded public `key` is trusted for this host.
    fn verify(&self, key: &[u8]) -> bool;
}

/// A [`HostKeyVerifier`] trusting any key it is shown.
///
/// This leaves the connection open to man-in-the-middle attacks and
/// belongs in tests and tooling only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAnyKey;

impl HostKeyVerifier for AcceptAnyKey {
    fn verify(&self, _key: &[u8]) -> bool {
        true
    }
}
