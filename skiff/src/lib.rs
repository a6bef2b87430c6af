#![doc = concat!(
    "[![crates.io](https://img.shields.io/crates/v/", env!("CARGO_PKG_NAME"), ")](https://crates.io/crates/", env!("CARGO_PKG_NAME"), ")",
    " ",
    "[![docs.rs](https://img.shields.io/docsrs/", env!("CARGO_PKG_NAME"), ")](https://docs.rs/", env!("CARGO_PKG_NAME"), ")",
    " ",
    "![license](https://img.shields.io/crates/l/", env!("CARGO_PKG_NAME"), ")"
)]
#![doc = ""]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! The crate covers the `SSH-TRANS` layer of RFC 4253: the
//! identification exchange, the binary packet protocol under the
//! `none`, `aes128-cbc`, `aes128-ctr` and `aes128-gcm@openssh.com`
//! ciphers, `SSH_MSG_KEXINIT` negotiation and the client-side session
//! driver up to service requests.
//!
//! The key-agreement mathematics and key parsing live behind the
//! [`algorithm::Exchange`], [`algorithm::HostKeyVerifier`] and
//! (in `skiff-auth`) `Signer` seams, on purpose.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    clippy::unwrap_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo,
    clippy::undocumented_unsafe_blocks
)]
#![forbid(unsafe_code)]

mod error;
pub use error::{DisconnectedBy, DisconnectedError, Error, Result};

pub mod algorithm;
pub mod side;
pub mod stream;
pub mod wire;

mod session;
pub use session::{Pipe, Session};
