use secrecy::{ExposeSecret, SecretBox};

use crate::{
    algorithm::{Cipher, CipherKind, Hmac, KeyMaterial},
    wire, Error, Result,
};

/// The packet length all implementations must be able to accept,
/// and above which we refuse to allocate, per RFC 4253 §6.1.
pub const MAX_PACKET_SIZE: usize = 35000;

/// The smallest `packet_length` a well-formed frame can announce:
/// the padding-length byte plus the four-byte padding floor.
const MIN_PACKET_SIZE: usize = 5;

/// The pair of uplink and downlink transports derived from a
/// key exchange.
#[derive(Debug, Default)]
pub struct TransportPair {
    /// The transport sealing our outbound packets.
    pub tx: Transport,

    /// The transport opening the peer's packets.
    pub rx: Transport,
}

/// One direction of the packet protocol: a cipher instance, the MAC
/// primitive and its key.
#[derive(Debug)]
pub struct Transport {
    /// The active cipher instance.
    pub cipher: Cipher,

    /// The active MAC algorithm.
    pub hmac: Hmac,

    mac_key: SecretBox<Vec<u8>>,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            cipher: Cipher::None,
            hmac: Hmac::None,
            mac_key: SecretBox::new(Box::default()),
        }
    }
}

impl Transport {
    /// Activate a [`Transport`] from the negotiated algorithms and one
    /// direction's keying material.
    pub(crate) fn activate(
        cipher: &CipherKind,
        hmac: Hmac,
        material: KeyMaterial,
    ) -> Result<Self> {
        Ok(Self {
            cipher: cipher.activate(&material.key, &material.iv)?,
            // An AEAD cipher authenticates packets itself, the
            // negotiated MAC never makes it to the wire.
            hmac: if cipher.has_tag() { Hmac::None } else { hmac },
            mac_key: material.mac,
        })
    }

    /// The number of bytes to read off the wire before
    /// [`Transport::remaining`] can size the rest of the packet.
    pub fn initial_read(&self) -> usize {
        self.cipher.initial_read()
    }

    /// The number of bytes remaining on the wire after `first`,
    /// MAC or AEAD tag included.
    pub fn remaining(&self, first: &[u8]) -> Result<usize> {
        let packet_length = self.cipher.packet_length(first);

        if !(MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&packet_length) {
            return Err(Error::PacketSize(packet_length));
        }

        (std::mem::size_of::<u32>() + packet_length + self.cipher.tag_size() + self.hmac.size())
            .checked_sub(first.len())
            .ok_or(Error::PacketSize(packet_length))
    }

    /// Frame, authenticate and encrypt `payload` into the bytes put on
    /// the wire for packet number `seq`.
    pub fn seal(&mut self, payload: &[u8], seq: u32) -> Result<Vec<u8>> {
        let padding = self.cipher.kind().padding(payload.len()) as usize;

        let mut frame =
            Vec::with_capacity(4 + 1 + payload.len() + padding + self.hmac.size() + 16);
        wire::put_u32(&mut frame, (1 + payload.len() + padding) as u32);
        wire::put_u8(&mut frame, padding as u8);
        wire::put_raw(&mut frame, payload);
        frame.resize(frame.len() + padding, 0);

        // Encrypt-and-MAC: the MAC covers the sequence number and the
        // cleartext frame, and trails the ciphertext.
        let mac = self.hmac.sign(seq, &frame, self.mac_key.expose_secret())?;

        self.cipher.encrypt(&mut frame)?;
        frame.extend_from_slice(&mac);

        Ok(frame)
    }

    /// Decrypt and verify an inbound packet, read off the wire as
    /// `first` then `rest`, and return its cleartext payload.
    pub fn open(&mut self, first: &[u8], rest: &[u8], seq: u32) -> Result<Vec<u8>> {
        let mut raw = Vec::with_capacity(first.len() + rest.len());
        raw.extend_from_slice(first);
        raw.extend_from_slice(rest);

        let mac = raw.split_off(
            raw.len()
                .checked_sub(self.hmac.size())
                .ok_or(Error::PacketSize(raw.len()))?,
        );

        self.cipher.decrypt(&mut raw)?;
        self.hmac
            .verify(seq, &raw, self.mac_key.expose_secret(), &mac)?;

        let mut decoder = wire::Decoder::new(&raw);
        let packet_length = decoder.u32()? as usize;
        let padding_length = decoder.u8()? as usize;

        if padding_length < 4 {
            return Err(Error::Padding(padding_length));
        }

        let payload = decoder
            .take(
                packet_length
                    .checked_sub(padding_length + 1)
                    .ok_or(Error::Padding(padding_length))?,
            )?
            .to_vec();

        decoder.take(padding_length)?;
        decoder.finish()?;

        Ok(payload)
    }
}
