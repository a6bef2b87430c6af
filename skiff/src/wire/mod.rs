//! Primitives and message types of the SSH wire format,
//! as defined in [RFC 4251](https://datatracker.ietf.org/doc/html/rfc4251).
//!
//! Every encoder is a pure append to a byte buffer and every decoder a
//! cursor over a byte slice; there is no hidden serialization state.

use thiserror::Error;

pub mod id;
pub mod trans;
pub mod userauth;

/// The error type for wire encoding and decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The payload ended before the field was complete.
    #[error("payload ended unexpectedly")]
    Truncated,

    /// The payload carried bytes after the last field of the message.
    #[error("trailing bytes after the message body")]
    Trailing,

    /// The payload did not carry the expected message code.
    #[error("expected message code {expected}, found {found}")]
    UnexpectedMessage {
        /// The message code the caller asked for.
        expected: u8,

        /// The message code found in the payload.
        found: u8,
    },

    /// A text field was not valid UTF-8.
    #[error("text field is not valid UTF-8")]
    BadUtf8,

    /// A name-list carried bytes outside of printable US-ASCII.
    #[error("name-list is not printable US-ASCII")]
    BadAscii,

    /// An authentication request carried an unknown method name.
    #[error("unknown authentication method")]
    UnknownMethod,

    /// The identification line was malformed.
    #[error("malformed identification line")]
    BadId,

    /// The peer sent too much data before its identification line.
    #[error("too much data before the identification line")]
    IdOverflow,
}

/// Append a `byte` to the buffer.
pub fn put_u8(buf: &mut Vec<u8>, value: u8) {
    buf.push(value);
}

/// Append a big-endian `uint32` to the buffer.
pub fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Append a `boolean` to the buffer, `1` for true and `0` for false.
pub fn put_boolean(buf: &mut Vec<u8>, value: bool) {
    buf.push(u8::from(value));
}

/// Append raw bytes to the buffer, without a length prefix.
pub fn put_raw(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(bytes);
}

/// Append a `string` to the buffer: a big-endian `uint32` length
/// followed by the bytes.
pub fn put_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

/// A cursor decoding wire primitives from a byte slice.
#[derive(Debug)]
pub struct Decoder<'b> {
    buf: &'b [u8],
}

impl<'b> Decoder<'b> {
    /// Create a [`Decoder`] over the provided bytes.
    pub fn new(buf: &'b [u8]) -> Self {
        Self { buf }
    }

    /// Whether all the bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume and return the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'b [u8], Error> {
        if self.buf.len() < n {
            return Err(Error::Truncated);
        }

        let (taken, rest) = self.buf.split_at(n);
        self.buf = rest;

        Ok(taken)
    }

    /// Decode a `byte`.
    pub fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    /// Decode a big-endian `uint32`.
    pub fn u32(&mut self) -> Result<u32, Error> {
        let bytes = self.take(4)?;

        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Decode a `boolean`; any non-zero byte reads as true.
    pub fn boolean(&mut self) -> Result<bool, Error> {
        Ok(self.u8()? != 0)
    }

    /// Decode a fixed-size byte array.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);

        Ok(array)
    }

    /// Decode a length-prefixed `string` as raw bytes.
    pub fn string(&mut self) -> Result<&'b [u8], Error> {
        let len = self.u32()? as usize;

        self.take(len)
    }

    /// Decode a length-prefixed `string` as UTF-8 text.
    pub fn utf8(&mut self) -> Result<String, Error> {
        std::str::from_utf8(self.string()?)
            .map(str::to_owned)
            .map_err(|_| Error::BadUtf8)
    }

    /// Decode a `name-list`.
    pub fn name_list(&mut self) -> Result<NameList, Error> {
        NameList::decode(self)
    }

    /// Assert that the whole payload has been consumed.
    pub fn finish(&self) -> Result<(), Error> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(Error::Trailing)
        }
    }
}

/// A comma-separated list of US-ASCII names,
/// length-prefixed on the wire; order expresses preference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameList(pub Vec<String>);

impl NameList {
    /// Create a [`NameList`] from an iterator of names.
    pub fn new<I, T>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self(names.into_iter().map(|name| name.as_ref().into()).collect())
    }

    /// The first of our names that also appears in `other`,
    /// i.e. the negotiated choice when `self` is the client's list.
    pub fn preferred_in<'s>(&'s self, other: &Self) -> Option<&'s str> {
        self.0
            .iter()
            .map(String::as_str)
            .find(|name| other.contains(name))
    }

    /// Whether the list contains `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|own| own == name)
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first name of the list, the sender's preferred choice.
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Append the `name-list` to the buffer.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        put_string(buf, self.0.join(",").as_bytes());
    }

    /// Decode a `name-list` from the cursor.
    pub fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error> {
        let bytes = decoder.string()?;

        if bytes.is_empty() {
            return Ok(Self::default());
        }
        if !bytes.iter().all(|byte| byte.is_ascii_graphic()) {
            return Err(Error::BadAscii);
        }

        // The all-ASCII check above guarantees valid UTF-8.
        let names = std::str::from_utf8(bytes).map_err(|_| Error::BadAscii)?;

        Ok(Self(names.split(',').map(str::to_owned).collect()))
    }
}

impl std::fmt::Display for NameList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

/// A type that encodes to the body of an SSH message,
/// without its leading message code.
pub trait Encode {
    /// Append the message body to the buffer.
    fn encode(&self, buf: &mut Vec<u8>);
}

/// A type that decodes from the body of an SSH message,
/// the leading message code already consumed.
pub trait Decode: Sized {
    /// Decode the message body from the cursor.
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, Error>;
}

/// An SSH message, identified by its leading message code.
pub trait Message: Encode + Decode {
    /// The message code carried in the first payload byte.
    const CODE: u8;
}

/// The cleartext payload of a single SSH packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The payload bytes, starting with the message code.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Encode a [`Message`] into a [`Packet`].
    pub fn new(message: &impl Message) -> Self {
        let mut payload = Vec::new();
        Self::encode_into(message, &mut payload);

        Self { payload }
    }

    /// Encode a [`Message`], code byte included, into the buffer.
    pub fn encode_into<T: Message>(message: &T, buf: &mut Vec<u8>) {
        put_u8(buf, T::CODE);
        message.encode(buf);
    }

    /// The message code of the payload, if any.
    pub fn code(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Interpret the payload as a `T` message.
    pub fn to<T: Message>(&self) -> Result<T, Error> {
        let mut decoder = Decoder::new(&self.payload);

        let code = decoder.u8()?;
        if code != T::CODE {
            return Err(Error::UnexpectedMessage {
                expected: T::CODE,
                found: code,
            });
        }

        let message = T::decode(&mut decoder)?;
        decoder.finish()?;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_round_trip() {
        let mut buf = Vec::new();

        put_u8(&mut buf, 0xAB);
        put_u32(&mut buf, 0xDEAD_BEEF);
        put_boolean(&mut buf, true);
        put_string(&mut buf, b"ssh-userauth");

        let mut decoder = Decoder::new(&buf);
        assert_eq!(decoder.u8().unwrap(), 0xAB);
        assert_eq!(decoder.u32().unwrap(), 0xDEAD_BEEF);
        assert!(decoder.boolean().unwrap());
        assert_eq!(decoder.string().unwrap(), b"ssh-userauth");
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn decoder_rejects_truncated_fields() {
        let mut decoder = Decoder::new(&[0x00, 0x00, 0x00, 0x05, b'a']);

        assert_eq!(decoder.string(), Err(Error::Truncated));
    }

    #[test]
    fn name_list_grammar() {
        let mut buf = Vec::new();
        NameList::default().encode(&mut buf);
        assert_eq!(buf, [0x00, 0x00, 0x00, 0x00]);

        let mut decoder = Decoder::new(&buf);
        assert!(decoder.name_list().unwrap().is_empty());

        let mut buf = Vec::new();
        NameList::new(["a", "b", "c"]).encode(&mut buf);
        assert_eq!(buf, [0x00, 0x00, 0x00, 0x05, b'a', b',', b'b', b',', b'c']);

        let mut decoder = Decoder::new(&buf);
        assert_eq!(
            decoder.name_list().unwrap(),
            NameList::new(["a", "b", "c"])
        );
    }

    #[test]
    fn name_list_negotiation_prefers_ours() {
        let ours = NameList::new(["curve25519-sha256", "diffie-hellman-group14-sha256"]);
        let theirs = NameList::new(["diffie-hellman-group14-sha256", "curve25519-sha256"]);

        assert_eq!(ours.preferred_in(&theirs), Some("curve25519-sha256"));
        assert_eq!(theirs.preferred_in(&ours), Some("diffie-hellman-group14-sha256"));
        assert_eq!(ours.preferred_in(&NameList::default()), None);
    }

    #[test]
    fn packet_checks_message_code() {
        let packet = Packet {
            payload: vec![21],
        };

        assert!(packet.to::<trans::NewKeys>().is_ok());
        assert_eq!(
            packet.to::<trans::ServiceAccept>(),
            Err(Error::UnexpectedMessage {
                expected: 6,
                found: 21
            })
        );
    }
}
