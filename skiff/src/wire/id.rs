//! The identification line exchanged before any packet,
//! as defined in [RFC 4253 §4.2](https://datatracker.ietf.org/doc/html/rfc4253#section-4.2).

use futures::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::Error;
use crate::Result;

/// Bytes of pre-identification lines tolerated before giving up on a peer.
const MAX_PREAMBLE_SIZE: usize = 8 * 1024;

/// The identification of one end of the connection:
/// `SSH-protoversion-softwareversion SP comments CR LF` on the wire.
///
/// The `protoversion` and `softwareversion` fields are printable US-ASCII
/// and contain neither `-` nor whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id {
    /// The protocol version, `2.0` for this implementation.
    pub protocol: String,

    /// The software version identifier.
    pub software: String,

    /// Optional free-form comments.
    pub comments: Option<String>,
}

impl Id {
    /// Create a version `2.0` [`Id`] from a software version string.
    pub fn v2(software: impl Into<String>, comments: Option<impl Into<String>>) -> Self {
        Self {
            protocol: "2.0".into(),
            software: software.into(),
            comments: comments.map(Into::into),
        }
    }

    /// Whether the identified peer speaks SSH 2.0,
    /// including the `1.99` compatibility version from RFC 4253 §5.1.
    pub fn is_v2(&self) -> bool {
        matches!(&*self.protocol, "2.0" | "1.99")
    }

    /// Parse an identification line, without its trailing CR LF.
    pub fn parse(line: &[u8]) -> Result<Self, Error> {
        let line = std::str::from_utf8(line).map_err(|_| Error::BadId)?;

        let rest = line.strip_prefix("SSH-").ok_or(Error::BadId)?;
        let (protocol, rest) = rest.split_once('-').ok_or(Error::BadId)?;
        let (software, comments) = match rest.split_once(' ') {
            Some((software, comments)) if !comments.is_empty() => {
                (software, Some(comments.to_owned()))
            }
            Some((software, _)) => (software, None),
            None => (rest, None),
        };

        if protocol.is_empty()
            || software.is_empty()
            || !protocol.bytes().all(|byte| byte.is_ascii_graphic())
            || !software.bytes().all(|byte| byte.is_ascii_graphic())
        {
            return Err(Error::BadId);
        }

        Ok(Self {
            protocol: protocol.to_owned(),
            software: software.to_owned(),
            comments,
        })
    }

    /// Read the peer's identification from the stream, skipping any
    /// lines the peer sends before its `SSH-` line.
    pub async fn from_async_reader(reader: &mut (impl AsyncBufRead + Unpin)) -> Result<Self> {
        let mut preamble = 0;

        loop {
            let mut line = Vec::new();
            let read = reader.read_until(b'\n', &mut line).await?;

            if read == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }

            // The final LF, and the CR before it, are not part of the line;
            // a missing LF is tolerated only when the stream ended with it.
            if line.last() == Some(&b'\n') {
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
            }

            if line.starts_with(b"SSH-") {
                break Ok(Self::parse(&line)?);
            }

            tracing::trace!("Skipped a pre-identification line of {read} bytes");

            preamble += read;
            if preamble > MAX_PREAMBLE_SIZE {
                break Err(Error::IdOverflow.into());
            }
        }
    }

    /// Write our identification line, CR LF included, to the stream.
    pub async fn to_async_writer(&self, writer: &mut (impl AsyncWrite + Unpin)) -> Result<()> {
        writer.write_all(format!("{self}\r\n").as_bytes()).await?;

        Ok(())
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SSH-{}-{}", self.protocol, self.software)?;

        if let Some(comments) = &self.comments {
            write!(f, " {comments}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_the_documented_banner() {
        let id = Id::v2("OpenSSH_Emulator", Some("x"));

        assert_eq!(
            format!("{id}\r\n").as_bytes(),
            [
                0x53, 0x53, 0x48, 0x2D, 0x32, 0x2E, 0x30, 0x2D, 0x4F, 0x70, 0x65, 0x6E, 0x53,
                0x53, 0x48, 0x5F, 0x45, 0x6D, 0x75, 0x6C, 0x61, 0x74, 0x6F, 0x72, 0x20, 0x78,
                0x0D, 0x0A,
            ]
        );
    }

    #[test]
    fn parses_with_and_without_comments() {
        let id = Id::parse(b"SSH-2.0-OpenSSH_9.4").unwrap();
        assert_eq!(id.protocol, "2.0");
        assert_eq!(id.software, "OpenSSH_9.4");
        assert_eq!(id.comments, None);

        let id = Id::parse(b"SSH-1.99-OpenSSH_3.9 Debian").unwrap();
        assert_eq!(id.protocol, "1.99");
        assert!(id.is_v2());
        assert_eq!(id.comments.as_deref(), Some("Debian"));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(Id::parse(b"HTTP/1.1 200 OK").is_err());
        assert!(Id::parse(b"SSH-2.0").is_err());
        assert!(Id::parse(b"SSH--software").is_err());
        assert!(Id::parse(b"SSH-2.0- comment").is_err());
    }

    #[async_std::test]
    async fn skips_preamble_lines() {
        let mut reader = futures::io::Cursor::new(
            b"welcome to the jungle\r\nSSH-2.0-peer comment\r\n".to_vec(),
        );

        let id = Id::from_async_reader(&mut reader).await.unwrap();
        assert_eq!(id.software, "peer");
        assert_eq!(id.comments.as_deref(), Some("comment"));
    }

    #[async_std::test]
    async fn accepts_a_banner_ending_with_the_stream() {
        let mut reader = futures::io::Cursor::new(b"SSH-2.0-peer".to_vec());

        let id = Id::from_async_reader(&mut reader).await.unwrap();
        assert_eq!(id.software, "peer");
    }
}
