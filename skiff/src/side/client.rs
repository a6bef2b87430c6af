//! Client-[`Side`] implementation of the _session_.

use std::{sync::Arc, time::Duration};

use futures_time::time::Duration as Timeout;
use rand::RngCore;

use super::{KexInits, Side};
use crate::{
    algorithm::{
        self, AcceptAnyKey, CipherKind, Exchange, Hmac, HostKeyVerifier, KexContext, KeySizes,
    },
    stream::{Stream, Transport, TransportPair},
    wire::{id::Id, trans::KexInit, NameList},
    Error, Pipe, Result,
};

/// An observation-only callback handed the session identifier once a
/// key exchange completes; it cannot reach the stream and therefore
/// cannot interfere with the handshake.
pub type KeyedHook = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// A _client_-side session configuration.
#[derive(Clone)]
pub struct Client<X> {
    /// [`Id`] for this _client_ session.
    pub id: Id,

    /// Timeout for sending and receiving packets.
    pub timeout: Duration,

    /// The algorithms enabled for this _client_ session.
    pub algorithms: Algorithms,

    /// The key-exchange runner performing the key agreement.
    pub exchange: X,

    /// The verifier deciding whether the server's host key is trusted.
    pub verifier: Arc<dyn HostKeyVerifier>,

    /// Observation hook invoked after each completed key exchange.
    pub on_keyed: Option<KeyedHook>,
}

impl<X: Exchange + Default> Default for Client<X> {
    fn default() -> Self {
        Self {
            id: Id::v2(
                concat!(
                    env!("CARGO_PKG_NAME"),
                    "@client:",
                    env!("CARGO_PKG_VERSION")
                ),
                None::<&str>,
            ),
            timeout: Duration::from_secs(120),
            algorithms: Default::default(),
            exchange: Default::default(),
            verifier: Arc::new(AcceptAnyKey),
            on_keyed: None,
        }
    }
}

impl<X> std::fmt::Debug for Client<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .field("algorithms", &self.algorithms)
            .finish_non_exhaustive()
    }
}

/// Algorithms for a _client_-side session, each list in preference
/// order.
#[derive(Debug, Clone)]
pub struct Algorithms {
    /// Enabled algorithms for _key-exchange_.
    pub kexs: Vec<String>,

    /// Enabled algorithms for _server key signature_.
    pub keys: Vec<String>,

    /// Enabled algorithms for _encryption & decryption_.
    pub ciphers: Vec<CipherKind>,

    /// Enabled algorithms for _hmac_.
    pub macs: Vec<Hmac>,
}

impl Default for Algorithms {
    fn default() -> Self {
        Self {
            kexs: vec![
                "curve25519-sha256".into(),
                "curve25519-sha256@libssh.org".into(),
            ],
            keys: vec![
                "ssh-ed25519".into(),
                "ecdsa-sha2-nistp256".into(),
                "rsa-sha2-512".into(),
                "rsa-sha2-256".into(),
            ],
            ciphers: vec![
                CipherKind::Aes128Gcm,
                CipherKind::Aes128Ctr,
                CipherKind::Aes128Cbc,
            ],
            macs: vec![Hmac::HmacSha256, Hmac::HmacSha512, Hmac::HmacSha1],
        }
    }
}

impl<X> Side for Client<X>
where
    X: Exchange + Unpin + 'static,
{
    fn id(&self) -> &Id {
        &self.id
    }

    fn timeout(&self) -> Timeout {
        self.timeout.into()
    }

    fn kexinit(&self) -> KexInit {
        let mut cookie = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut cookie);

        KexInit {
            cookie,
            kex_algorithms: NameList::new(&self.algorithms.kexs),
            server_host_key_algorithms: NameList::new(&self.algorithms.keys),
            encryption_algorithms_client_to_server: NameList::new(
                self.algorithms.ciphers.iter().map(|cipher| cipher.as_ref()),
            ),
            encryption_algorithms_server_to_client: NameList::new(
                self.algorithms.ciphers.iter().map(|cipher| cipher.as_ref()),
            ),
            mac_algorithms_client_to_server: NameList::new(
                self.algorithms.macs.iter().map(|mac| mac.as_ref()),
            ),
            mac_algorithms_server_to_client: NameList::new(
                self.algorithms.macs.iter().map(|mac| mac.as_ref()),
            ),
            compression_algorithms_client_to_server: NameList::new(["none"]),
            compression_algorithms_server_to_client: NameList::new(["none"]),
            languages_client_to_server: Default::default(),
            languages_server_to_client: Default::default(),
            first_kex_packet_follows: false,
        }
    }

    async fn exchange(
        &self,
        stream: &mut Stream<impl Pipe>,
        kexinits: KexInits<'_>,
        peer_id: &Id,
    ) -> Result<TransportPair> {
        let (kex_algorithm, host_key_algorithm) =
            algorithm::kex::negociate(kexinits.own, kexinits.peer)?;
        let (cipher_tx, cipher_rx) = algorithm::negociate_cipher(kexinits.own, kexinits.peer)?;
        let (hmac_tx, hmac_rx) = algorithm::negociate_hmac(kexinits.own, kexinits.peer)?;

        // Only `none` is carried, but the slots are mandatory.
        for (ours, theirs) in [
            (
                &kexinits.own.compression_algorithms_client_to_server,
                &kexinits.peer.compression_algorithms_client_to_server,
            ),
            (
                &kexinits.own.compression_algorithms_server_to_client,
                &kexinits.peer.compression_algorithms_server_to_client,
            ),
        ] {
            ours.preferred_in(theirs).ok_or(Error::NoCommonCompression)?;
        }

        tracing::debug!(
            "Negociated algorithms: kex: {kex_algorithm}, key: {host_key_algorithm}, \
             tx: {cipher_tx:?}+{hmac_tx:?}, rx: {cipher_rx:?}+{hmac_rx:?}",
        );

        // The peer piped a guessed kex packet after its KEXINIT; when
        // the guess missed the negotiated choice it must be discarded,
        // per RFC 4253 §7.
        if kexinits.peer.first_kex_packet_follows
            && (kexinits.peer.kex_algorithms.first() != Some(kex_algorithm)
                || kexinits.peer.server_host_key_algorithms.first() != Some(host_key_algorithm))
        {
            let _ = stream.recv().await?;

            tracing::debug!("Discarded the peer's wrongly-guessed first kex packet");
        }

        let session = stream.session_id().map(<[u8]>::to_vec);
        let secrets = self
            .exchange
            .run(
                stream,
                KexContext {
                    kex_algorithm,
                    host_key_algorithm,
                    v_c: self.id(),
                    v_s: peer_id,
                    i_c: kexinits.own_payload,
                    i_s: kexinits.peer_payload,
                    session_id: session.as_deref(),
                    verifier: &*self.verifier,
                    client_sizes: KeySizes::new(&cipher_tx, &hmac_tx),
                    server_sizes: KeySizes::new(&cipher_rx, &hmac_rx),
                },
            )
            .await?;

        stream.with_session(&secrets.hash);

        Ok(TransportPair {
            tx: Transport::activate(&cipher_tx, hmac_tx, secrets.client)?,
            rx: Transport::activate(&cipher_rx, hmac_rx, secrets.server)?,
        })
    }

    fn keyed(&self, session_id: &[u8]) {
        if let Some(hook) = &self.on_keyed {
            hook(session_id);
        }
    }
}
