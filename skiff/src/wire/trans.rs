//! Messages involved in the SSH's **transport** (`SSH-TRANS`) part of the protocol,
//! as defined in [RFC 4253](https://datatracker.ietf.org/doc/html/rfc4253).

use super::{put_boolean, put_raw, put_string, put_u32, Decode, Decoder, Encode, Error, Message, NameList};

/// The `SSH_MSG_DISCONNECT` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-11.1>.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    /// Reason for disconnection.
    pub reason: DisconnectReason,

    /// Description of the reason for disconnection.
    pub description: String,

    /// Language tag.
    pub language: String,
}

impl Message for Disconnect {
    const CODE: u8 = 1;
}

impl Encode for Disconnect {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.reason.code());
        put_string(buf, self.description.as_bytes());
        put_string(buf, self.language.as_bytes());
    }
}

impl Decode for Disconnect {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self {
            reason: DisconnectReason::from_code(decoder.u32()?),
            description: decoder.utf8()?,
            language: decoder.utf8()?,
        })
    }
}

/// The `reason` for disconnect in the `SSH_MSG_DISCONNECT` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DisconnectReason {
    /// `SSH_DISCONNECT_HOST_NOT_ALLOWED_TO_CONNECT`.
    HostNotAllowedToConnect,

    /// `SSH_DISCONNECT_PROTOCOL_ERROR`.
    ProtocolError,

    /// `SSH_DISCONNECT_KEY_EXCHANGE_FAILED`.
    KeyExchangeFailed,

    /// `SSH_DISCONNECT_RESERVED`.
    Reserved,

    /// `SSH_DISCONNECT_MAC_ERROR`.
    MacError,

    /// `SSH_DISCONNECT_COMPRESSION_ERROR`.
    CompressionError,

    /// `SSH_DISCONNECT_SERVICE_NOT_AVAILABLE`.
    ServiceNotAvailable,

    /// `SSH_DISCONNECT_PROTOCOL_VERSION_NOT_SUPPORTED`.
    ProtocolVersionNotSupported,

    /// `SSH_DISCONNECT_HOST_KEY_NOT_VERIFIABLE`.
    HostKeyNotVerifiable,

    /// `SSH_DISCONNECT_CONNECTION_LOST`.
    ConnectionLost,

    /// `SSH_DISCONNECT_BY_APPLICATION`.
    ByApplication,

    /// `SSH_DISCONNECT_TOO_MANY_CONNECTIONS`.
    TooManyConnections,

    /// `SSH_DISCONNECT_AUTH_CANCELLED_BY_USER`.
    AuthCancelledByUser,

    /// `SSH_DISCONNECT_NO_MORE_AUTH_METHODS_AVAILABLE`.
    NoMoreAuthMethodsAvailable,

    /// `SSH_DISCONNECT_ILLEGAL_USER_NAME`.
    IllegalUserName,

    /// Any other disconnect reason, may be non-standard.
    ///
    /// The 'reason' values in the range of `0xFE000000`
    /// through `0xFFFFFFFF` are reserved for PRIVATE USE.
    Other(u32),
}

impl DisconnectReason {
    /// The `uint32` reason code carried on the wire.
    pub fn code(&self) -> u32 {
        match self {
            Self::HostNotAllowedToConnect => 1,
            Self::ProtocolError => 2,
            Self::KeyExchangeFailed => 3,
            Self::Reserved => 4,
            Self::MacError => 5,
            Self::CompressionError => 6,
            Self::ServiceNotAvailable => 7,
            Self::ProtocolVersionNotSupported => 8,
            Self::HostKeyNotVerifiable => 9,
            Self::ConnectionLost => 10,
            Self::ByApplication => 11,
            Self::TooManyConnections => 12,
            Self::AuthCancelledByUser => 13,
            Self::NoMoreAuthMethodsAvailable => 14,
            Self::IllegalUserName => 15,
            Self::Other(code) => *code,
        }
    }

    /// The [`DisconnectReason`] for a `uint32` reason code.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::HostNotAllowedToConnect,
            2 => Self::ProtocolError,
            3 => Self::KeyExchangeFailed,
            4 => Self::Reserved,
            5 => Self::MacError,
            6 => Self::CompressionError,
            7 => Self::ServiceNotAvailable,
            8 => Self::ProtocolVersionNotSupported,
            9 => Self::HostKeyNotVerifiable,
            10 => Self::ConnectionLost,
            11 => Self::ByApplication,
            12 => Self::TooManyConnections,
            13 => Self::AuthCancelledByUser,
            14 => Self::NoMoreAuthMethodsAvailable,
            15 => Self::IllegalUserName,
            other => Self::Other(other),
        }
    }
}

/// The `SSH_MSG_IGNORE` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-11.2>.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Ignore {
    /// A random blob of data to ignore.
    pub data: Vec<u8>,
}

impl Message for Ignore {
    const CODE: u8 = 2;
}

impl Encode for Ignore {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_string(buf, &self.data);
    }
}

impl Decode for Ignore {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self {
            data: decoder.string()?.to_vec(),
        })
    }
}

/// The `SSH_MSG_UNIMPLEMENTED` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-11.4>.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unimplemented {
    /// Packet sequence number of the rejected message.
    pub seq: u32,
}

impl Message for Unimplemented {
    const CODE: u8 = 3;
}

impl Encode for Unimplemented {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_u32(buf, self.seq);
    }
}

impl Decode for Unimplemented {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self {
            seq: decoder.u32()?,
        })
    }
}

/// The `SSH_MSG_DEBUG` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-11.3>.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Debug {
    /// Whether the debug data should be forcefully displayed.
    pub always_display: bool,

    /// The debug message.
    pub message: String,

    /// Language tag.
    pub language: String,
}

impl Message for Debug {
    const CODE: u8 = 4;
}

impl Encode for Debug {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_boolean(buf, self.always_display);
        put_string(buf, self.message.as_bytes());
        put_string(buf, self.language.as_bytes());
    }
}

impl Decode for Debug {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self {
            always_display: decoder.boolean()?,
            message: decoder.utf8()?,
            language: decoder.utf8()?,
        })
    }
}

/// The `SSH_MSG_SERVICE_REQUEST` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-10>.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    /// The service name to request.
    pub service_name: String,
}

impl Message for ServiceRequest {
    const CODE: u8 = 5;
}

impl Encode for ServiceRequest {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_string(buf, self.service_name.as_bytes());
    }
}

impl Decode for ServiceRequest {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self {
            service_name: decoder.utf8()?,
        })
    }
}

/// The `SSH_MSG_SERVICE_ACCEPT` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-10>.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccept {
    /// Service name accepted to be requested.
    pub service_name: String,
}

impl Message for ServiceAccept {
    const CODE: u8 = 6;
}

impl Encode for ServiceAccept {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_string(buf, self.service_name.as_bytes());
    }
}

impl Decode for ServiceAccept {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self {
            service_name: decoder.utf8()?,
        })
    }
}

/// The `SSH_MSG_KEXINIT` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-7.1>.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KexInit {
    /// The kex-init cookie, 16 freshly random bytes per message.
    pub cookie: [u8; 16],

    /// Kex algorithms.
    pub kex_algorithms: NameList,

    /// Server host-key algorithms.
    pub server_host_key_algorithms: NameList,

    /// Client -> server encryption algorithms.
    pub encryption_algorithms_client_to_server: NameList,

    /// Server -> client encryption algorithms.
    pub encryption_algorithms_server_to_client: NameList,

    /// Client -> server MAC algorithms.
    pub mac_algorithms_client_to_server: NameList,

    /// Server -> client MAC algorithms.
    pub mac_algorithms_server_to_client: NameList,

    /// Client -> server compression algorithms.
    pub compression_algorithms_client_to_server: NameList,

    /// Server -> client compression algorithms.
    pub compression_algorithms_server_to_client: NameList,

    /// Client -> server languages.
    pub languages_client_to_server: NameList,

    /// Server -> client languages.
    pub languages_server_to_client: NameList,

    /// Whether the first kex packet follows.
    pub first_kex_packet_follows: bool,
}

impl Message for KexInit {
    const CODE: u8 = 20;
}

impl Encode for KexInit {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_raw(buf, &self.cookie);
        self.kex_algorithms.encode(buf);
        self.server_host_key_algorithms.encode(buf);
        self.encryption_algorithms_client_to_server.encode(buf);
        self.encryption_algorithms_server_to_client.encode(buf);
        self.mac_algorithms_client_to_server.encode(buf);
        self.mac_algorithms_server_to_client.encode(buf);
        self.compression_algorithms_client_to_server.encode(buf);
        self.compression_algorithms_server_to_client.encode(buf);
        self.languages_client_to_server.encode(buf);
        self.languages_server_to_client.encode(buf);
        put_boolean(buf, self.first_kex_packet_follows);
        put_u32(buf, 0); // reserved
    }
}

impl Decode for KexInit {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        let message = Self {
            cookie: decoder.array()?,
            kex_algorithms: decoder.name_list()?,
            server_host_key_algorithms: decoder.name_list()?,
            encryption_algorithms_client_to_server: decoder.name_list()?,
            encryption_algorithms_server_to_client: decoder.name_list()?,
            mac_algorithms_client_to_server: decoder.name_list()?,
            mac_algorithms_server_to_client: decoder.name_list()?,
            compression_algorithms_client_to_server: decoder.name_list()?,
            compression_algorithms_server_to_client: decoder.name_list()?,
            languages_client_to_server: decoder.name_list()?,
            languages_server_to_client: decoder.name_list()?,
            first_kex_packet_follows: decoder.boolean()?,
        };

        // The reserved field is read and ignored, as mandated.
        decoder.u32()?;

        Ok(message)
    }
}

/// The `SSH_MSG_NEWKEYS` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-7.3>.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NewKeys;

impl Message for NewKeys {
    const CODE: u8 = 21;
}

impl Encode for NewKeys {
    fn encode(&self, _buf: &mut Vec<u8>) {}
}

impl Decode for NewKeys {
    fn decode(_decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self)
    }
}
