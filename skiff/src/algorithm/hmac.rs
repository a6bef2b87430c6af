use digest::OutputSizeUser;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use strum::{AsRefStr, EnumString};

use crate::{wire::trans::KexInit, Error, Result};

pub fn negociate(clientkex: &KexInit, serverkex: &KexInit) -> Result<(Hmac, Hmac)> {
    Ok((
        clientkex
            .mac_algorithms_client_to_server
            .preferred_in(&serverkex.mac_algorithms_client_to_server)
            .ok_or(Error::NoCommonHmac)?
            .parse()
            .map_err(|_| Error::NoCommonHmac)?,
        clientkex
            .mac_algorithms_server_to_client
            .preferred_in(&serverkex.mac_algorithms_server_to_client)
            .ok_or(Error::NoCommonHmac)?
            .parse()
            .map_err(|_| Error::NoCommonHmac)?,
    ))
}

/// SSH hmac algorithms.
///
/// The MAC is computed over the sequence number and the cleartext
/// packet, and appended after the ciphertext.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Hmac {
    /// HMAC with sha-2-512 digest.
    #[strum(serialize = "hmac-sha2-512")]
    HmacSha512,

    /// HMAC with sha-2-256 digest.
    #[strum(serialize = "hmac-sha2-256")]
    HmacSha256,

    /// HMAC with sha-1 digest.
    HmacSha1,

    /// No HMAC algorithm.
    #[default]
    None,
}

impl Hmac {
    pub(crate) fn verify(
        &self,
        seq: u32,
        buf: &[u8],
        key: &[u8],
        mac: &[u8],
    ) -> Result<(), digest::MacError> {
        fn verify<D: digest::Mac + digest::KeyInit>(
            seq: u32,
            buf: &[u8],
            key: &[u8],
            mac: &[u8],
        ) -> Result<(), digest::MacError> {
            <D as digest::Mac>::new_from_slice(key)
                .map_err(|_| digest::MacError)?
                .chain_update(seq.to_be_bytes())
                .chain_update(buf)
                .verify_slice(mac)
        }

        match self {
            Self::HmacSha512 => verify::<hmac::Hmac<Sha512>>(seq, buf, key, mac),
            Self::HmacSha256 => verify::<hmac::Hmac<Sha256>>(seq, buf, key, mac),
            Self::HmacSha1 => verify::<hmac::Hmac<Sha1>>(seq, buf, key, mac),
            Self::None => Ok(()),
        }
    }

    pub(crate) fn sign(&self, seq: u32, buf: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        fn sign<D: digest::Mac + digest::KeyInit>(
            seq: u32,
            buf: &[u8],
            key: &[u8],
        ) -> Result<Vec<u8>> {
            Ok(<D as digest::Mac>::new_from_slice(key)
                .map_err(|_| Error::Cipher)?
                .chain_update(seq.to_be_bytes())
                .chain_update(buf)
                .finalize()
                .into_bytes()
                .to_vec())
        }

        match self {
            Self::HmacSha512 => sign::<hmac::Hmac<Sha512>>(seq, buf, key),
            Self::HmacSha256 => sign::<hmac::Hmac<Sha256>>(seq, buf, key),
            Self::HmacSha1 => sign::<hmac::Hmac<Sha1>>(seq, buf, key),
            Self::None => Ok(Vec::new()),
        }
    }

    /// The size of the MAC tail appended to each packet.
    pub fn size(&self) -> usize {
        match self {
            Self::HmacSha512 => Sha512::output_size(),
            Self::HmacSha256 => Sha256::output_size(),
            Self::HmacSha1 => Sha1::output_size(),
            Self::None => 0,
        }
    }

    /// The size of the key material consumed by the MAC.
    pub fn key_size(&self) -> usize {
        self.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_verify_and_bind_the_sequence_number() {
        let key = [0x5C; 32];
        let buf = b"\x00\x00\x00\x0c\x06ping\x00\x00\x00\x00\x00\x00";

        let mac = Hmac::HmacSha256.sign(7, buf, &key).unwrap();
        assert_eq!(mac.len(), Hmac::HmacSha256.size());

        assert!(Hmac::HmacSha256.verify(7, buf, &key, &mac).is_ok());
        assert!(Hmac::HmacSha256.verify(8, buf, &key, &mac).is_err());
        assert!(Hmac::HmacSha256.verify(7, b"other", &key, &mac).is_err());
    }

    #[test]
    fn none_is_empty() {
        assert_eq!(Hmac::None.size(), 0);
        assert!(Hmac::None.sign(0, b"", &[]).unwrap().is_empty());
    }

    #[test]
    fn names_parse() {
        assert_eq!(
            "hmac-sha2-256".parse::<Hmac>().unwrap(),
            Hmac::HmacSha256
        );
        assert_eq!(Hmac::HmacSha1.as_ref(), "hmac-sha1");
    }
}
