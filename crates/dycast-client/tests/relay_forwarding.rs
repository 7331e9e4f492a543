#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod fake_transport;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use dycast_client::relay::{Relay, RelayEvent, RelayEventKind, RelayState, REASON_RELAY_CONNECT};
use dycast_client::session::close_code;
use dycast_client::transport::LinkEvent;
use dycast_core::error::{DyCastError, ErrorCode};
use dycast_core::normalize::{normalize, DyMessage};
use dycast_core::protocol::schema::{ChatMessage, Common};
use dycast_core::protocol::SubMessage;

use fake_transport::{Dial, FakeConnector};

const RELAY_URL: &str = "ws://localhost:8765";

fn spawn_with(connector: &FakeConnector) -> (Relay, mpsc::UnboundedReceiver<RelayEvent>) {
    let relay = Relay::spawn(RELAY_URL, Arc::new(connector.clone())).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    for kind in [RelayEventKind::Open, RelayEventKind::Close, RelayEventKind::Error] {
        let tx = tx.clone();
        relay.on(kind, move |ev| {
            let _ = tx.send(ev.clone());
        });
    }
    (relay, rx)
}

async fn next(events: &mut mpsc::UnboundedReceiver<RelayEvent>) -> RelayEvent {
    timeout(Duration::from_secs(300), events.recv())
        .await
        .expect("no event in time")
        .expect("relay stopped")
}

fn chat(msg_id: u64, text: &str) -> DyMessage {
    normalize(&SubMessage::Chat(ChatMessage {
        common: Some(Common {
            msg_id,
            ..Common::default()
        }),
        content: text.into(),
        ..ChatMessage::default()
    }))
}

async fn texts(connector: &FakeConnector, n: usize) -> Vec<String> {
    let link = connector.link(0);
    while link.texts().len() < n {
        tokio::task::yield_now().await;
    }
    link.texts()
}

#[tokio::test]
async fn batches_are_forwarded_as_json_text() {
    let connector = FakeConnector::default();
    let (relay, mut events) = spawn_with(&connector);
    assert_eq!(next(&mut events).await, RelayEvent::Open);
    assert!(relay.is_open());

    assert!(relay.forward(&[chat(1, "first"), chat(2, "second")]).unwrap());
    let sent = texts(&connector, 1).await;
    let json: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
    let batch = json.as_array().expect("json array");
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0]["content"], "first");
    assert_eq!(batch[1]["content"], "second");

    // Nothing goes out as a binary frame.
    assert!(connector.link(0).sent().is_empty());
}

#[tokio::test]
async fn close_sends_code_and_reason() {
    let connector = FakeConnector::default();
    let (relay, mut events) = spawn_with(&connector);
    assert_eq!(next(&mut events).await, RelayEvent::Open);

    relay.close(close_code::NORMAL, "close relay").unwrap();
    assert_eq!(
        next(&mut events).await,
        RelayEvent::Close {
            code: close_code::NORMAL,
            reason: "close relay".into()
        }
    );
    assert_eq!(relay.state(), RelayState::Closed);
    assert_eq!(
        connector.link(0).closed(),
        Some((close_code::NORMAL, "close relay".into()))
    );
    assert!(!relay.forward(&[chat(3, "late")]).unwrap());
}

#[tokio::test]
async fn refused_dial_closes_with_connecting_error() {
    let connector = FakeConnector::scripted([Dial::Refuse]);
    let (relay, mut events) = spawn_with(&connector);

    match next(&mut events).await {
        RelayEvent::Error(e) => assert_eq!(e.code(), ErrorCode::Transport),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(
        next(&mut events).await,
        RelayEvent::Close {
            code: close_code::CONNECTING_ERROR,
            reason: REASON_RELAY_CONNECT.into()
        }
    );
    assert_eq!(relay.state(), RelayState::Closed);
    assert!(!relay.forward(&[chat(1, "dropped")]).unwrap());
}

#[tokio::test]
async fn forward_before_open_is_dropped_and_close_aborts_dial() {
    let connector = FakeConnector::scripted([Dial::Hang]);
    let (relay, mut events) = spawn_with(&connector);
    while connector.dials() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(relay.state(), RelayState::Connecting);
    assert!(!relay.forward(&[chat(1, "early")]).unwrap());

    relay.close(close_code::NORMAL, "stop").unwrap();
    assert_eq!(
        next(&mut events).await,
        RelayEvent::Close {
            code: close_code::NORMAL,
            reason: "stop".into()
        }
    );
    assert_eq!(relay.state(), RelayState::Closed);
    assert_eq!(connector.accepted(), 0);
}

#[tokio::test]
async fn peer_close_ends_relay() {
    let connector = FakeConnector::default();
    let (relay, mut events) = spawn_with(&connector);
    assert_eq!(next(&mut events).await, RelayEvent::Open);

    connector.link(0).push(LinkEvent::Error("reset".into()));
    assert_eq!(
        next(&mut events).await,
        RelayEvent::Error(DyCastError::Transport("reset".into()))
    );
    connector.link(0).push(LinkEvent::Closed {
        code: None,
        reason: String::new(),
    });
    assert_eq!(
        next(&mut events).await,
        RelayEvent::Close {
            code: close_code::NO_STATUS,
            reason: String::new()
        }
    );
    assert_eq!(relay.state(), RelayState::Closed);
}

#[test]
fn relay_url_must_be_a_websocket() {
    let err = dycast_client::relay::parse_relay_url("http://localhost:8765").unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadConfig);
}
