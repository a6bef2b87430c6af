//! The credential seams consumed by the [`client`](crate::client) driver.

/// A public-key credential: a named algorithm, an encoded public key,
/// and the ability to sign a session-bound byte string.
///
/// The signing mathematics stay behind this seam; the driver only
/// splices the produced bytes into `SSH_MSG_USERAUTH_REQUEST`.
pub trait Signer: Send + Sync {
    /// The public-key algorithm name, e.g. `ssh-ed25519`.
    fn algorithm(&self) -> String;

    /// The wire-encoded public key blob.
    fn public_key(&self) -> Result<Vec<u8>, signature::Error>;

    /// Sign `data`, returning the raw signature bytes.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, signature::Error>;
}

impl Signer for ssh_key::PrivateKey {
    fn algorithm(&self) -> String {
        self.algorithm().to_string()
    }

    fn public_key(&self) -> Result<Vec<u8>, signature::Error> {
        self.public_key()
            .to_bytes()
            .map_err(signature::Error::from_source)
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, signature::Error> {
        use signature::Signer as _;

        let signature: ssh_key::Signature = self.try_sign(data)?;

        Ok(signature.as_bytes().to_vec())
    }
}

/// A party producing the password for the `password` method,
/// consulted a single time if the public-key candidates run out.
pub trait PasswordProvider: Send + Sync {
    /// Produce the password.
    fn password(&self) -> String;
}

impl PasswordProvider for String {
    fn password(&self) -> String {
        self.clone()
    }
}

impl PasswordProvider for &'static str {
    fn password(&self) -> String {
        (*self).to_owned()
    }
}
