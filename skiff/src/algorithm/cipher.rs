use aes::cipher::{consts::U16, generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes_gcm::{aead::AeadInPlace, Aes128Gcm, Tag};
use secrecy::{ExposeSecret, SecretBox};
use strum::{AsRefStr, EnumString};

use crate::{
    wire::trans::KexInit,
    Error, Result,
};

/// A single AES block.
type Block = GenericArray<u8, U16>;

/// The length of the AEAD authentication tag, in bytes.
const TAG_SIZE: usize = 16;

pub fn negociate(clientkex: &KexInit, serverkex: &KexInit) -> Result<(CipherKind, CipherKind)> {
    Ok((
        clientkex
            .encryption_algorithms_client_to_server
            .preferred_in(&serverkex.encryption_algorithms_client_to_server)
            .ok_or(Error::NoCommonCipher)?
            .parse()
            .map_err(|_| Error::NoCommonCipher)?,
        clientkex
            .encryption_algorithms_server_to_client
            .preferred_in(&serverkex.encryption_algorithms_server_to_client)
            .ok_or(Error::NoCommonCipher)?
            .parse()
            .map_err(|_| Error::NoCommonCipher)?,
    ))
}

/// SSH cipher algorithms.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum CipherKind {
    /// AES-128 in Galois/Counter Mode (GCM), with the length field as
    /// cleartext additional authenticated data.
    #[strum(serialize = "aes128-gcm@openssh.com")]
    Aes128Gcm,

    /// AES-128 in counter (CTR) mode.
    Aes128Ctr,

    /// AES-128 in cipher block chaining (CBC) mode.
    Aes128Cbc,

    /// No cipher algorithm.
    #[default]
    None,
}

impl CipherKind {
    /// The cipher's block size, which is also its alignment rule.
    pub fn block_size(&self) -> usize {
        match self {
            Self::None => 8,
            Self::Aes128Cbc | Self::Aes128Ctr | Self::Aes128Gcm => 16,
        }
    }

    /// The size of the key material consumed on activation.
    pub fn key_size(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Aes128Cbc | Self::Aes128Ctr | Self::Aes128Gcm => 16,
        }
    }

    /// The size of the IV material consumed on activation.
    pub fn iv_size(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Aes128Cbc | Self::Aes128Ctr => 16,
            Self::Aes128Gcm => 12,
        }
    }

    /// Whether the cipher authenticates packets itself,
    /// making the separate MAC irrelevant.
    pub fn has_tag(&self) -> bool {
        matches!(self, Self::Aes128Gcm)
    }

    /// Compute the padding length for a payload of `payload` bytes.
    ///
    /// The framed length is brought to a multiple of the alignment with
    /// at least four bytes of padding; in GCM the four length bytes are
    /// left out of the aligned region since they travel as cleartext.
    pub fn padding(&self, payload: usize) -> u8 {
        const MIN_PAD_SIZE: usize = 4;
        const MIN_ALIGN: usize = 8;

        let align = self.block_size().max(MIN_ALIGN);

        let size = if self.has_tag() {
            std::mem::size_of::<u8>() + payload
        } else {
            std::mem::size_of::<u32>() + std::mem::size_of::<u8>() + payload
        };
        let padding = align - size % align;

        if padding < MIN_PAD_SIZE {
            (padding + align) as u8
        } else {
            padding as u8
        }
    }

    /// Instantiate the cipher from the derived key material.
    pub fn activate(&self, key: &SecretBox<Vec<u8>>, iv: &SecretBox<Vec<u8>>) -> Result<Cipher> {
        let (key, iv) = (key.expose_secret(), iv.expose_secret());

        if key.len() < self.key_size() || iv.len() < self.iv_size() {
            return Err(Error::Cipher);
        }

        Ok(match self {
            Self::None => Cipher::None,
            Self::Aes128Cbc => Cipher::Cbc {
                aes: aes::Aes128::new_from_slice(&key[..16]).map_err(|_| Error::Cipher)?,
                iv: Block::clone_from_slice(&iv[..16]),
            },
            Self::Aes128Ctr => Cipher::Ctr {
                aes: aes::Aes128::new_from_slice(&key[..16]).map_err(|_| Error::Cipher)?,
                counter: Block::clone_from_slice(&iv[..16]),
            },
            Self::Aes128Gcm => Cipher::Gcm {
                aead: Aes128Gcm::new_from_slice(&key[..16]).map_err(|_| Error::Cipher)?,
                fixed: [iv[0], iv[1], iv[2], iv[3]],
                invocation: u64::from_be_bytes([
                    iv[4], iv[5], iv[6], iv[7], iv[8], iv[9], iv[10], iv[11],
                ]),
            },
        })
    }
}

/// An activated cipher carrying its evolving per-direction state.
///
/// Instances are replaced, never reset, at the `SSH_MSG_NEWKEYS`
/// boundary; the variants hold exactly the state their mode evolves
/// from packet to packet.
pub enum Cipher {
    /// No encryption, the identity on packets.
    None,

    /// AES-128-CBC; the IV for a packet is the last ciphertext block
    /// of the previous one.
    Cbc {
        /// The AES-128 block cipher under the derived key.
        aes: aes::Aes128,

        /// The chaining IV.
        iv: Block,
    },

    /// AES-128-CTR; the counter advances by one per keystream block.
    Ctr {
        /// The AES-128 block cipher under the derived key.
        aes: aes::Aes128,

        /// The counter block, a 128-bit big-endian integer.
        counter: Block,
    },

    /// AES-128-GCM with the `@openssh.com` nonce schedule.
    Gcm {
        /// The AEAD instance under the derived key.
        aead: Aes128Gcm,

        /// The fixed nonce prefix from the derived IV.
        fixed: [u8; 4],

        /// The invocation counter, incremented once per packet.
        invocation: u64,
    },
}

impl Cipher {
    /// The [`CipherKind`] of this instance.
    pub fn kind(&self) -> CipherKind {
        match self {
            Self::None => CipherKind::None,
            Self::Cbc { .. } => CipherKind::Aes128Cbc,
            Self::Ctr { .. } => CipherKind::Aes128Ctr,
            Self::Gcm { .. } => CipherKind::Aes128Gcm,
        }
    }

    /// The cipher's block size.
    pub fn block_size(&self) -> usize {
        self.kind().block_size()
    }

    /// Whether the cipher authenticates packets itself.
    pub fn has_tag(&self) -> bool {
        self.kind().has_tag()
    }

    /// The number of bytes to read from the stream before the packet
    /// length can be recovered.
    pub fn initial_read(&self) -> usize {
        match self {
            // The length field travels in cleartext before the
            // authenticated body.
            Self::Gcm { .. } => 4,
            _ => self.block_size(),
        }
    }

    /// The size of the authentication tag appended to each packet.
    pub fn tag_size(&self) -> usize {
        if self.has_tag() {
            TAG_SIZE
        } else {
            0
        }
    }

    /// Recover the `packet_length` field from the `initial_read` bytes
    /// of an inbound packet.
    ///
    /// Cipher state is left untouched, the upcoming [`Cipher::decrypt`]
    /// processes the whole packet; the caller bounds-checks the
    /// returned length before trusting it.
    pub fn packet_length(&self, first: &[u8]) -> usize {
        debug_assert_eq!(first.len(), self.initial_read());

        match self {
            Self::None | Self::Gcm { .. } => read_length(first),
            Self::Cbc { aes, iv } => {
                let mut block = Block::clone_from_slice(first);
                aes.decrypt_block(&mut block);
                xor_in(&mut block, iv);

                read_length(&block)
            }
            Self::Ctr { aes, counter } => {
                let mut keystream = *counter;
                aes.encrypt_block(&mut keystream);

                let mut length = [0u8; 4];
                for (byte, (cipher, key)) in length.iter_mut().zip(first.iter().zip(&keystream)) {
                    *byte = cipher ^ key;
                }

                read_length(&length)
            }
        }
    }

    /// Encrypt a fully-framed cleartext packet in place, appending the
    /// authentication tag where the mode carries one.
    pub fn encrypt(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::None => Ok(()),
            Self::Cbc { aes, iv } => {
                if buf.len() % 16 != 0 {
                    return Err(Error::Cipher);
                }

                for chunk in buf.chunks_exact_mut(16) {
                    let mut block = Block::clone_from_slice(chunk);
                    xor_in(&mut block, iv);
                    aes.encrypt_block(&mut block);

                    chunk.copy_from_slice(&block);
                    *iv = block;
                }

                Ok(())
            }
            Self::Ctr { aes, counter } => {
                ctr_apply(aes, counter, buf);

                Ok(())
            }
            Self::Gcm {
                aead,
                fixed,
                invocation,
            } => {
                if buf.len() < 4 {
                    return Err(Error::Cipher);
                }

                let nonce = nonce(fixed, *invocation);
                let (aad, body) = buf.split_at_mut(4);

                let tag = aead
                    .encrypt_in_place_detached(GenericArray::from_slice(&nonce), aad, body)
                    .map_err(|_| Error::Cipher)?;
                *invocation = invocation.wrapping_add(1);

                buf.extend_from_slice(&tag);

                Ok(())
            }
        }
    }

    /// Decrypt a packet in place, verifying and stripping the
    /// authentication tag where the mode carries one.
    pub fn decrypt(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::None => Ok(()),
            Self::Cbc { aes, iv } => {
                if buf.len() % 16 != 0 {
                    return Err(Error::Cipher);
                }

                for chunk in buf.chunks_exact_mut(16) {
                    let cipher = Block::clone_from_slice(chunk);

                    let mut block = cipher;
                    aes.decrypt_block(&mut block);
                    xor_in(&mut block, iv);

                    chunk.copy_from_slice(&block);
                    *iv = cipher;
                }

                Ok(())
            }
            Self::Ctr { aes, counter } => {
                ctr_apply(aes, counter, buf);

                Ok(())
            }
            Self::Gcm {
                aead,
                fixed,
                invocation,
            } => {
                let body_end = buf
                    .len()
                    .checked_sub(TAG_SIZE)
                    .filter(|end| *end >= 4)
                    .ok_or(Error::Cipher)?;

                let nonce = nonce(fixed, *invocation);
                let tag = Tag::clone_from_slice(&buf[body_end..]);
                let (aad, body) = buf[..body_end].split_at_mut(4);

                aead.decrypt_in_place_detached(GenericArray::from_slice(&nonce), aad, body, &tag)
                    .map_err(|_| digest::MacError)?;
                *invocation = invocation.wrapping_add(1);

                buf.truncate(body_end);

                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher")
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

/// The 12-byte GCM nonce for one invocation.
fn nonce(fixed: &[u8; 4], invocation: u64) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[..4].copy_from_slice(fixed);
    nonce[4..].copy_from_slice(&invocation.to_be_bytes());

    nonce
}

/// The big-endian `uint32` packet length at the head of a block.
fn read_length(block: &[u8]) -> usize {
    u32::from_be_bytes([block[0], block[1], block[2], block[3]]) as usize
}

fn xor_in(block: &mut Block, other: &Block) {
    for (byte, with) in block.iter_mut().zip(other) {
        *byte ^= with;
    }
}

/// XOR the AES-CTR keystream over `buf`, advancing the counter by one
/// per block, partial trailing blocks included.
fn ctr_apply(aes: &aes::Aes128, counter: &mut Block, buf: &mut [u8]) {
    for chunk in buf.chunks_mut(16) {
        let mut keystream = *counter;
        aes.encrypt_block(&mut keystream);

        for (byte, key) in chunk.iter_mut().zip(&keystream) {
            *byte ^= key;
        }

        bump(counter);
    }
}

/// Increment the counter block as a 128-bit big-endian integer.
fn bump(counter: &mut Block) {
    for byte in counter.iter_mut().rev() {
        *byte = byte.wrapping_add(1);

        if *byte != 0 {
            break;
        }
    }
}
