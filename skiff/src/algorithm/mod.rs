//! Supported algorithms for **encryption**, **integrity** and the
//! negotiation seams toward the external **key-exchange** runner.

mod cipher;
pub use cipher::{Cipher, CipherKind};
pub(crate) use cipher::negociate as negociate_cipher;

mod hmac;
pub use hmac::Hmac;
pub(crate) use hmac::negociate as negociate_hmac;

pub(crate) mod kex;
pub use kex::{AcceptAnyKey, Exchange, HostKeyVerifier, KexContext, KeyMaterial, KeySizes, Secrets};
