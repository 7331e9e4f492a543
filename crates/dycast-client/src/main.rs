//! dycast
//!
//! Follows one live room and prints every normalized message as a json line.
//! - Config: `dycast [path]`, default `dycast.yaml`; needs a `room` section
//! - Relay: with a `relay` section, batches are also forwarded there as json
//! - Logs: tracing, filtered by `RUST_LOG`
//! - Exits on a terminal close, reconnect exhaustion or Ctrl-C

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use dycast_client::config;
use dycast_client::discovery::{LiveInfo, RetryOnce, StaticResolver, StaticSigner};
use dycast_client::relay::{Relay, RelayEvent, RelayEventKind, REASON_RELAY_CLOSE};
use dycast_client::session::close_code;
use dycast_client::transport::WsConnector;
use dycast_client::{DyCast, DyEvent, EventKind};
use dycast_core::error::{DyCastError, ErrorCode, Result};

const DEFAULT_CONFIG: &str = "dycast.yaml";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    if let Err(e) = run(&path).await {
        error!(code = e.code().as_str(), error = %e, "dycast failed");
        std::process::exit(1);
    }
}

async fn run(path: &str) -> Result<()> {
    let cfg = config::load_from_file(path)?;
    let room = cfg
        .room
        .clone()
        .ok_or_else(|| DyCastError::BadConfig("a room section is required".into()))?;

    let connector = Arc::new(WsConnector::default());
    let relay = match &cfg.relay {
        Some(section) => Some(Arc::new(Relay::spawn(&section.url, connector.clone())?)),
        None => None,
    };
    if let Some(relay) = &relay {
        relay.on(RelayEventKind::Close, |ev| {
            if let RelayEvent::Close { code, reason } = ev {
                warn!(code, reason = %reason, "relay closed");
            }
        });
    }

    let resolver = Arc::new(RetryOnce::new(StaticResolver::new(LiveInfo::from(&room))));
    let dycast = DyCast::spawn(
        cfg.session,
        resolver,
        Arc::new(StaticSigner::default()),
        connector,
    )?;

    // Terminal outcomes: a close event or exhausted reconnects.
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<DyEvent>();

    dycast.on(EventKind::Open, |ev| {
        if let DyEvent::Open(live) = ev {
            info!(room_id = %live.room_id, nickname = %live.nickname, title = %live.title, "live opened");
        }
    });
    let forward_to = relay.clone();
    dycast.on(EventKind::Message, move |ev| {
        if let DyEvent::Message(batch) = ev {
            if let Some(relay) = &forward_to {
                if let Err(e) = relay.forward(batch) {
                    warn!(error = %e, "relay forward failed");
                }
            }
            for msg in batch {
                match serde_json::to_string(msg) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!(id = %msg.id, error = %e, "message not serializable"),
                }
            }
        }
    });
    dycast.on(EventKind::Reconnecting, |ev| {
        if let DyEvent::Reconnecting { attempt, code, reason } = ev {
            warn!(attempt, ?code, ?reason, "reconnecting");
        }
    });
    dycast.on(EventKind::Reconnect, |_| info!("reconnected"));

    let tx = done_tx.clone();
    dycast.on(EventKind::Close, move |ev| {
        let _ = tx.send(ev.clone());
    });
    dycast.on(EventKind::Error, move |ev| {
        if let DyEvent::Error(e) = ev {
            warn!(code = e.code().as_str(), error = %e, "session error");
            if e.code() == ErrorCode::ReconnectExhausted {
                let _ = done_tx.send(ev.clone());
            }
        }
    });

    dycast.connect(room.num.as_str())?;

    let ev = tokio::select! {
        ev = done_rx.recv() => Some(ev),
        _ = tokio::signal::ctrl_c() => None,
    };
    if let Some(relay) = &relay {
        let _ = relay.close(close_code::NORMAL, REASON_RELAY_CLOSE);
    }
    if let Some(ev) = ev {
        return finish(ev);
    }

    info!("interrupted, closing");
    dycast.close(close_code::NORMAL, "interrupted")?;
    let ev = tokio::time::timeout(SHUTDOWN_GRACE, done_rx.recv())
        .await
        .ok()
        .flatten();
    finish(ev)
}

fn finish(outcome: Option<DyEvent>) -> Result<()> {
    match outcome {
        Some(DyEvent::Close { code, reason }) => {
            info!(code, reason = %reason, "session closed");
            Ok(())
        }
        Some(DyEvent::Error(e)) => Err(e),
        _ => Ok(()),
    }
}
