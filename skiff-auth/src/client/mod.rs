//! Client-side authentication mechanics.

use skiff::{
    side::Side,
    wire::{self, trans::DisconnectReason, userauth, Message},
    Pipe, Session,
};

use crate::{Error, PasswordProvider, Result, Signer, CONNECTION_SERVICE, SERVICE_NAME};

/// An observation-only callback invoked with the user name once the
/// peer accepted the authentication.
pub type AuthenticatedHook = Box<dyn Fn(&str) + Send + Sync>;

/// The outcome of a single authentication attempt.
enum Outcome {
    Accepted,
    Rejected,
}

/// The authentication driver for client-side sessions.
///
/// Candidates are tried strictly in the order they were registered:
/// every public key first, then the password provider, once.
#[derive(Default)]
pub struct Auth {
    username: String,

    keys: Vec<Box<dyn Signer>>,
    password: Option<Box<dyn PasswordProvider>>,

    on_authenticated: Option<AuthenticatedHook>,
}

impl Auth {
    /// Create an [`Auth`] driver for the provided _username_.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    /// Register a public-key credential; candidates are tried in
    /// registration order.
    pub fn key(mut self, signer: impl Signer + 'static) -> Self {
        self.keys.push(Box::new(signer));

        self
    }

    /// Register the password fallback, consulted a single time after
    /// the public-key candidates ran out.
    pub fn password(mut self, provider: impl PasswordProvider + 'static) -> Self {
        self.password = Some(Box::new(provider));

        self
    }

    /// Register an observation hook fired on authentication success.
    pub fn on_authenticated(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_authenticated = Some(Box::new(hook));

        self
    }

    /// Drive the `ssh-userauth` service to completion.
    ///
    /// On success the session is authenticated and ready to be handed
    /// to the connection layer; on [`Error::CouldNotLogIn`] every
    /// configured method was rejected and the session is still open.
    pub async fn authenticate<IO, S>(self, session: &mut Session<IO, S>) -> Result<()>
    where
        IO: Pipe,
        S: Side,
    {
        session.request(SERVICE_NAME).await?;

        let session_id = session
            .session_id()
            .ok_or(Error::MissingSessionId)?
            .to_vec();

        tracing::debug!(
            "Starting the `{SERVICE_NAME}` procedure for user `{}`",
            self.username
        );

        for signer in &self.keys {
            if let Outcome::Accepted = self.publickey(session, &session_id, &**signer).await? {
                self.accepted();

                return Ok(());
            }
        }

        if let Some(provider) = &self.password {
            tracing::debug!("Public-key candidates exhausted, falling back to `password`");

            session
                .send(&userauth::Request {
                    username: self.username.clone(),
                    service_name: CONNECTION_SERVICE.into(),
                    method: userauth::Method::Password {
                        password: provider.password(),
                    },
                })
                .await?;

            if let Outcome::Accepted = self.outcome(session).await? {
                self.accepted();

                return Ok(());
            }
        }

        Err(Error::CouldNotLogIn)
    }

    /// Attempt the `publickey` method with one candidate.
    async fn publickey<IO, S>(
        &self,
        session: &mut Session<IO, S>,
        session_id: &[u8],
        signer: &dyn Signer,
    ) -> Result<Outcome>
    where
        IO: Pipe,
        S: Side,
    {
        let algorithm = signer.algorithm();
        let blob = signer.public_key()?;

        // The signature covers the session identifier and the exact
        // request fields, binding it to this session, per RFC 4252 §7.
        let mut buffer = Vec::new();
        wire::put_string(&mut buffer, session_id);
        wire::put_u8(&mut buffer, userauth::Request::CODE);
        wire::put_string(&mut buffer, self.username.as_bytes());
        wire::put_string(&mut buffer, CONNECTION_SERVICE.as_bytes());
        wire::put_string(&mut buffer, b"publickey");
        wire::put_boolean(&mut buffer, true);
        wire::put_string(&mut buffer, algorithm.as_bytes());
        wire::put_string(&mut buffer, &blob);

        let raw = signer.sign(&buffer)?;

        let mut signature = Vec::new();
        wire::put_string(&mut signature, algorithm.as_bytes());
        wire::put_string(&mut signature, &raw);

        tracing::debug!("Attempting `publickey` authentication with `{algorithm}`");

        session
            .send(&userauth::Request {
                username: self.username.clone(),
                service_name: CONNECTION_SERVICE.into(),
                method: userauth::Method::Publickey {
                    algorithm,
                    blob,
                    signature: Some(signature),
                },
            })
            .await?;

        self.outcome(session).await
    }

    /// Await the peer's verdict on the outstanding attempt.
    async fn outcome<IO, S>(&self, session: &mut Session<IO, S>) -> Result<Outcome>
    where
        IO: Pipe,
        S: Side,
    {
        loop {
            let packet = session.recv().await?;

            if packet.to::<userauth::Success>().is_ok() {
                return Ok(Outcome::Accepted);
            }

            if let Ok(userauth::Failure {
                continue_with,
                partial_success,
            }) = packet.to()
            {
                if continue_with.is_empty() && !partial_success {
                    let _ = session
                        .disconnect(
                            DisconnectReason::NoMoreAuthMethodsAvailable,
                            "Authentication methods exhausted for the current session",
                        )
                        .await;

                    return Err(Error::NoMoreMethods);
                }

                tracing::debug!("Attempt rejected, may continue with `{continue_with}`");

                return Ok(Outcome::Rejected);
            }

            if let Ok(userauth::Banner { message, .. }) = packet.to() {
                tracing::info!("Peer banner: {}", message.trim_end());

                continue;
            }

            let _ = session
                .disconnect(
                    DisconnectReason::ProtocolError,
                    "Unexpected message in the context of the `ssh-userauth` service",
                )
                .await;

            return Err(Error::Session(skiff::Error::UnexpectedMessage));
        }
    }

    fn accepted(&self) {
        tracing::debug!("Authentication succeeded for user `{}`", self.username);

        if let Some(hook) = &self.on_authenticated {
            hook(&self.username);
        }
    }
}
