//! Messages involved in the SSH's **authentication** (`SSH-USERAUTH`) part of the protocol,
//! as defined in [RFC 4252](https://datatracker.ietf.org/doc/html/rfc4252).

use super::{put_boolean, put_string, Decode, Decoder, Encode, Error, Message, NameList};

/// The `SSH_MSG_USERAUTH_REQUEST` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4252#section-5>.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The user name to authenticate as.
    pub username: String,

    /// The service to start after authentication, `ssh-connection`.
    pub service_name: String,

    /// The authentication method and its payload.
    pub method: Method,
}

impl Message for Request {
    const CODE: u8 = 50;
}

impl Encode for Request {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_string(buf, self.username.as_bytes());
        put_string(buf, self.service_name.as_bytes());
        self.method.encode(buf);
    }
}

impl Decode for Request {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self {
            username: decoder.utf8()?,
            service_name: decoder.utf8()?,
            method: Method::decode(decoder)?,
        })
    }
}

/// An authentication method inside a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Method {
    /// The `none` method, probing for available methods.
    None,

    /// The `publickey` method,
    /// see <https://datatracker.ietf.org/doc/html/rfc4252#section-7>.
    Publickey {
        /// The public-key algorithm name.
        algorithm: String,

        /// The encoded public-key blob.
        blob: Vec<u8>,

        /// The signature over the session-bound request,
        /// absent when merely querying whether the key is acceptable.
        signature: Option<Vec<u8>>,
    },

    /// The `password` method,
    /// see <https://datatracker.ietf.org/doc/html/rfc4252#section-8>.
    Password {
        /// The password, in ISO-10646 UTF-8.
        password: String,
    },
}

impl Method {
    /// The method name carried on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Publickey { .. } => "publickey",
            Self::Password { .. } => "password",
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        put_string(buf, self.name().as_bytes());

        match self {
            Self::None => (),
            Self::Publickey {
                algorithm,
                blob,
                signature,
            } => {
                put_boolean(buf, signature.is_some());
                put_string(buf, algorithm.as_bytes());
                put_string(buf, blob);

                if let Some(signature) = signature {
                    put_string(buf, signature);
                }
            }
            Self::Password { password } => {
                put_boolean(buf, false);
                put_string(buf, password.as_bytes());
            }
        }
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        let name = decoder.utf8()?;

        match &*name {
            "none" => Ok(Self::None),
            "publickey" => {
                let signed = decoder.boolean()?;
                let algorithm = decoder.utf8()?;
                let blob = decoder.string()?.to_vec();
                let signature = if signed {
                    Some(decoder.string()?.to_vec())
                } else {
                    None
                };

                Ok(Self::Publickey {
                    algorithm,
                    blob,
                    signature,
                })
            }
            "password" => {
                let change = decoder.boolean()?;
                let password = decoder.utf8()?;

                // A change-request form carries the new password next.
                if change {
                    decoder.string()?;
                }

                Ok(Self::Password { password })
            }
            _ => Err(Error::UnknownMethod),
        }
    }
}

/// The `SSH_MSG_USERAUTH_FAILURE` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4252#section-5.1>.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// The methods that may productively continue the exchange.
    pub continue_with: NameList,

    /// Whether the rejected request was nonetheless partially successful.
    pub partial_success: bool,
}

impl Message for Failure {
    const CODE: u8 = 51;
}

impl Encode for Failure {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.continue_with.encode(buf);
        put_boolean(buf, self.partial_success);
    }
}

impl Decode for Failure {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self {
            continue_with: decoder.name_list()?,
            partial_success: decoder.boolean()?,
        })
    }
}

/// The `SSH_MSG_USERAUTH_SUCCESS` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4252#section-5.1>.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Success;

impl Message for Success {
    const CODE: u8 = 52;
}

impl Encode for Success {
    fn encode(&self, _buf: &mut Vec<u8>) {}
}

impl Decode for Success {
    fn decode(_decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self)
    }
}

/// The `SSH_MSG_USERAUTH_BANNER` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4252#section-5.4>.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// The banner text to display before authentication.
    pub message: String,

    /// Language tag.
    pub language: String,
}

impl Message for Banner {
    const CODE: u8 = 53;
}

impl Encode for Banner {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_string(buf, self.message.as_bytes());
        put_string(buf, self.language.as_bytes());
    }
}

impl Decode for Banner {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self {
            message: decoder.utf8()?,
            language: decoder.utf8()?,
        })
    }
}
