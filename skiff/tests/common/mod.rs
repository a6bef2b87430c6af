//! A scripted in-memory peer for driving the [`Session`] state
//! machine without a network.

use std::{
    io,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};

use futures::{AsyncBufRead, AsyncRead, AsyncWrite};
use secrecy::SecretBox;

use skiff::{
    algorithm::{CipherKind, Exchange, Hmac, KexContext, KeyMaterial, Secrets},
    side::client::{Algorithms, Client},
    stream::{Stream, Transport},
    wire::{trans::KexInit, Message, NameList, Packet},
    Pipe, Result,
};

/// A one-directional scripted duplex: reads come from the script,
/// writes land in a shared buffer the test inspects afterwards.
pub struct Duplex {
    read: futures::io::Cursor<Vec<u8>>,
    write: Arc<Mutex<Vec<u8>>>,
}

impl Duplex {
    pub fn new(script: Vec<u8>) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let write = Arc::new(Mutex::new(Vec::new()));

        (
            Self {
                read: futures::io::Cursor::new(script),
                write: write.clone(),
            },
            write,
        )
    }
}

impl AsyncRead for Duplex {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().read).poll_read(cx, buf)
    }
}

impl AsyncBufRead for Duplex {
    fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        Pin::new(&mut self.get_mut().read).poll_fill_buf(cx)
    }

    fn consume(self: Pin<&mut Self>, amt: usize) {
        Pin::new(&mut self.get_mut().read).consume(amt)
    }
}

impl AsyncWrite for Duplex {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.write.lock().expect("poisoned").extend_from_slice(buf);

        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// A key-exchange runner producing fixed secrets without touching the
/// stream; pairs with `none` ciphers and MACs on both sides.
#[derive(Debug, Default)]
pub struct ScriptedExchange;

impl Exchange for ScriptedExchange {
    async fn run(
        &self,
        _stream: &mut Stream<impl Pipe>,
        _context: KexContext<'_>,
    ) -> Result<Secrets> {
        let empty = || KeyMaterial {
            iv: SecretBox::new(Box::default()),
            key: SecretBox::new(Box::default()),
            mac: SecretBox::new(Box::default()),
        };

        Ok(Secrets {
            hash: vec![0x51; 32],
            client: empty(),
            server: empty(),
        })
    }
}

/// A client configuration negotiating the `scripted` kex and `none`
/// everything else.
pub fn client() -> Client<ScriptedExchange> {
    Client {
        algorithms: Algorithms {
            kexs: vec!["scripted".into()],
            keys: vec!["scripted-key".into()],
            ciphers: vec![CipherKind::None],
            macs: vec![Hmac::None],
        },
        ..Default::default()
    }
}

/// The `SSH_MSG_KEXINIT` a scripted server proposes.
pub fn server_kexinit() -> KexInit {
    KexInit {
        cookie: [0x5A; 16],
        kex_algorithms: NameList::new(["scripted"]),
        server_host_key_algorithms: NameList::new(["scripted-key"]),
        encryption_algorithms_client_to_server: NameList::new(["none"]),
        encryption_algorithms_server_to_client: NameList::new(["none"]),
        mac_algorithms_client_to_server: NameList::new(["none"]),
        mac_algorithms_server_to_client: NameList::new(["none"]),
        compression_algorithms_client_to_server: NameList::new(["none"]),
        compression_algorithms_server_to_client: NameList::new(["none"]),
        languages_client_to_server: NameList::default(),
        languages_server_to_client: NameList::default(),
        first_kex_packet_follows: false,
    }
}

/// Frame a sequence of payloads the way a `none`-cipher server would,
/// banner first.
pub fn script(payloads: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = b"SSH-2.0-scripted\r\n".to_vec();
    let mut transport = Transport::default();

    for (seq, payload) in payloads.iter().enumerate() {
        bytes.extend(
            transport
                .seal(payload, seq as u32)
                .expect("framing a scripted packet"),
        );
    }

    bytes
}

/// The encoded payload of a scripted message.
pub fn payload<T: Message>(message: &T) -> Vec<u8> {
    Packet::new(message).payload
}

/// Split the client's outbound bytes into its banner line and the
/// cleartext packet payloads.
pub fn unframe(bytes: &[u8]) -> (String, Vec<Packet>) {
    let newline = bytes
        .iter()
        .position(|byte| *byte == b'\n')
        .expect("client sent no banner");
    let banner = String::from_utf8(bytes[..newline + 1].to_vec()).expect("banner is not UTF-8");

    let mut rest = &bytes[newline + 1..];
    let mut packets = Vec::new();

    while !rest.is_empty() {
        let length = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let padding = rest[4] as usize;

        packets.push(Packet {
            payload: rest[5..4 + length - padding].to_vec(),
        });

        rest = &rest[4 + length..];
    }

    (banner, packets)
}
