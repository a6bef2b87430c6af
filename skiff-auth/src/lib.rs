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
//! The driver walks the `ssh-userauth` service as a client: the
//! ordered public-key candidates are tried first, then the password
//! provider if one is configured, a single time.

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

use thiserror::Error;

pub mod client;

mod signer;
pub use signer::{PasswordProvider, Signer};

/// The name of the authentication service in the SSH protocol.
pub const SERVICE_NAME: &str = "ssh-userauth";

/// The name of the service requested once authenticated.
pub const CONNECTION_SERVICE: &str = "ssh-connection";

/// The error types that can occur during user authentication.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// An error at the transport layer.
    #[error(transparent)]
    Session(#[from] skiff::Error),

    /// A credential failed to produce its key material or signature.
    #[error(transparent)]
    Signature(#[from] signature::Error),

    /// Every configured method was tried and rejected.
    #[error("could not log in: all authentication methods were rejected")]
    CouldNotLogIn,

    /// The peer declared it accepts no further authentication methods.
    #[error("the peer accepts no further authentication methods")]
    NoMoreMethods,

    /// Authentication was attempted before the first key exchange.
    #[error("user authentication requires a completed key exchange")]
    MissingSessionId,
}

/// A handy [`std::result::Result`] type alias bounding the [`enum@Error`] struct as `E`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
