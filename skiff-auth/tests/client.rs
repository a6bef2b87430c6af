#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use skiff::{
    algorithm::{CipherKind, Hmac},
    side::client::{Algorithms, Client},
    wire::{
        trans::{Disconnect, DisconnectReason, NewKeys, ServiceAccept},
        userauth::{self, Method},
        NameList,
    },
    Session,
};
use skiff_auth::{client::Auth, Error, Signer};

mod common;
use common::{payload, script, server_kexinit, unframe, Duplex, ScriptedExchange};

fn client() -> Client<ScriptedExchange> {
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

/// A deterministic credential recording what it signed.
struct FakeKey {
    blob: &'static str,
    signed: Arc<Mutex<Vec<u8>>>,
}

impl FakeKey {
    fn new(blob: &'static str) -> Self {
        Self {
            blob,
            signed: Default::default(),
        }
    }
}

impl Signer for FakeKey {
    fn algorithm(&self) -> String {
        "ssh-ed25519".into()
    }

    fn public_key(&self) -> Result<Vec<u8>, signature::Error> {
        Ok(self.blob.as_bytes().to_vec())
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, signature::Error> {
        *self.signed.lock().unwrap() = data.to_vec();

        Ok(vec![0xAB; 64])
    }
}

fn rejection() -> Vec<u8> {
    payload(&userauth::Failure {
        continue_with: NameList::new(["publickey", "password"]),
        partial_success: false,
    })
}

fn accepted_service() -> Vec<u8> {
    payload(&ServiceAccept {
        service_name: "ssh-userauth".into(),
    })
}

fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();
}

#[async_std::test]
async fn rejected_keys_cascade_in_order() -> Result<(), Box<dyn std::error::Error>> {
    init();

    let script = script(&[
        payload(&server_kexinit()),
        payload(&NewKeys),
        accepted_service(),
        rejection(),
        rejection(),
        rejection(),
    ]);
    let (pipe, written) = Duplex::new(script);

    let mut session = Session::new(pipe, client()).await?;
    let outcome = Auth::new("ferris")
        .key(FakeKey::new("one"))
        .key(FakeKey::new("two"))
        .key(FakeKey::new("three"))
        .authenticate(&mut session)
        .await;

    assert!(matches!(outcome, Err(Error::CouldNotLogIn)));

    let (banner, packets) = unframe(&written.lock().unwrap());
    assert!(banner.starts_with("SSH-2.0-"));

    let codes = packets
        .iter()
        .map(|packet| packet.code().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(codes, [20, 21, 5, 50, 50, 50]);

    for (packet, blob) in packets[3..].iter().zip(["one", "two", "three"]) {
        let request = packet.to::<userauth::Request>()?;

        assert_eq!(request.username, "ferris");
        assert_eq!(request.service_name, "ssh-connection");
        match request.method {
            Method::Publickey {
                blob: sent,
                signature,
                ..
            } => {
                assert_eq!(sent, blob.as_bytes());
                assert!(signature.is_some());
            }
            other => panic!("unexpected method {other:?}"),
        }
    }

    Ok(())
}

#[async_std::test]
async fn stops_at_the_first_accepted_key() -> Result<(), Box<dyn std::error::Error>> {
    init();

    let script = script(&[
        payload(&server_kexinit()),
        payload(&NewKeys),
        accepted_service(),
        rejection(),
        payload(&userauth::Success),
    ]);
    let (pipe, written) = Duplex::new(script);

    let second = FakeKey::new("two");
    let signed = second.signed.clone();
    let authenticated = Arc::new(Mutex::new(None));

    let hooked = authenticated.clone();
    let mut session = Session::new(pipe, client()).await?;
    Auth::new("ferris")
        .key(FakeKey::new("one"))
        .key(second)
        .key(FakeKey::new("never-tried"))
        .on_authenticated(move |username| *hooked.lock().unwrap() = Some(username.to_owned()))
        .authenticate(&mut session)
        .await?;

    assert_eq!(authenticated.lock().unwrap().as_deref(), Some("ferris"));

    // The accepted candidate signed the session-bound input:
    // string(session_id), byte SSH_MSG_USERAUTH_REQUEST, string(user).
    let signed = signed.lock().unwrap();
    assert_eq!(signed[..4], [0x00, 0x00, 0x00, 0x20]);
    assert_eq!(signed[4..36], [0x51; 32]);
    assert_eq!(signed[36], 50);
    assert_eq!(&signed[37..47], b"\x00\x00\x00\x06ferris");

    let (_, packets) = unframe(&written.lock().unwrap());
    let codes = packets
        .iter()
        .map(|packet| packet.code().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(codes, [20, 21, 5, 50, 50]);

    Ok(())
}

#[async_std::test]
async fn password_fallback_is_a_single_attempt() -> Result<(), Box<dyn std::error::Error>> {
    init();

    let script = script(&[
        payload(&server_kexinit()),
        payload(&NewKeys),
        accepted_service(),
        rejection(),
        rejection(),
    ]);
    let (pipe, written) = Duplex::new(script);

    let mut session = Session::new(pipe, client()).await?;
    let outcome = Auth::new("ferris")
        .key(FakeKey::new("one"))
        .password("hunter2")
        .authenticate(&mut session)
        .await;

    assert!(matches!(outcome, Err(Error::CouldNotLogIn)));

    let (_, packets) = unframe(&written.lock().unwrap());
    let last = packets.last().unwrap().to::<userauth::Request>()?;

    assert!(matches!(
        last.method,
        Method::Password { password } if password == "hunter2"
    ));

    Ok(())
}

#[async_std::test]
async fn banners_are_absorbed() -> Result<(), Box<dyn std::error::Error>> {
    init();

    let script = script(&[
        payload(&server_kexinit()),
        payload(&NewKeys),
        accepted_service(),
        payload(&userauth::Banner {
            message: "mind the gap\n".into(),
            language: String::new(),
        }),
        payload(&userauth::Success),
    ]);
    let (pipe, _) = Duplex::new(script);

    let mut session = Session::new(pipe, client()).await?;
    Auth::new("ferris")
        .key(FakeKey::new("one"))
        .authenticate(&mut session)
        .await?;

    Ok(())
}

#[async_std::test]
async fn an_empty_continuation_is_fatal() -> Result<(), Box<dyn std::error::Error>> {
    init();

    let script = script(&[
        payload(&server_kexinit()),
        payload(&NewKeys),
        accepted_service(),
        payload(&userauth::Failure {
            continue_with: NameList::default(),
            partial_success: false,
        }),
    ]);
    let (pipe, written) = Duplex::new(script);

    let mut session = Session::new(pipe, client()).await?;
    let outcome = Auth::new("ferris")
        .key(FakeKey::new("one"))
        .key(FakeKey::new("never-tried"))
        .authenticate(&mut session)
        .await;

    assert!(matches!(outcome, Err(Error::NoMoreMethods)));

    let (_, packets) = unframe(&written.lock().unwrap());

    // A single attempt went out before the disconnect.
    let codes = packets
        .iter()
        .map(|packet| packet.code().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(codes, [20, 21, 5, 50, 1]);

    let disconnect = packets.last().unwrap().to::<Disconnect>()?;
    assert_eq!(
        disconnect.reason,
        DisconnectReason::NoMoreAuthMethodsAvailable
    );

    Ok(())
}
