//! Session actor and its consumer handle.
//!
//! One tokio task owns the `SessionMachine`, the live link and the
//! heartbeat timer. Link events, timer ticks, consumer commands and the
//! results of background connection steps are serialized through a single
//! `select!` loop, so the machine never sees two events at once. Room
//! resolution and socket opening run in a spawned task that is aborted as
//! soon as the session leaves CONNECTING/RECONNECTING.

use std::collections::VecDeque;
use std::future::{self, Future};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info_span, warn, Instrument, Span};

use dycast_core::emitter::{Emitter, ListenerId};
use dycast_core::error::{DyCastError, Result};
use dycast_core::id::SnowflakeId;

use crate::config::SessionSection;
use crate::discovery::{build_push_url, ImInfo, LiveInfo, RoomResolver, Signer};
use crate::session::event::{close_code, DyEvent, EventKind};
use crate::session::machine::{ConnectionState, Cursor, Effect, SessionEvent, SessionMachine};
use crate::transport::{Connector, Link, LinkEvent};

/// Machine id folded into fallback message ids.
pub const ID_MACHINE: u16 = 37;

/// Last published view of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: ConnectionState,
    pub cursor: Cursor,
    pub live_info: Option<LiveInfo>,
}

impl Snapshot {
    fn of(machine: &SessionMachine) -> Self {
        Self {
            state: machine.state(),
            cursor: machine.cursor().clone(),
            live_info: machine.live_info().cloned(),
        }
    }
}

#[derive(Debug)]
enum Command {
    Connect(String),
    Close { code: u16, reason: String },
    Reconnect,
}

impl From<Command> for SessionEvent {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Connect(room_num) => SessionEvent::Connect { room_num },
            Command::Close { code, reason } => SessionEvent::Close { code, reason },
            Command::Reconnect => SessionEvent::Reconnect,
        }
    }
}

/// Handle to one room session.
///
/// Commands are queued to the session task; outcomes arrive as events.
/// Dropping the last handle stops the task and closes the link.
#[derive(Debug)]
pub struct DyCast {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<Snapshot>,
    emitter: Arc<Emitter<DyEvent>>,
}

impl DyCast {
    /// Start the session task. Must be called inside a tokio runtime.
    pub fn spawn(
        cfg: SessionSection,
        resolver: Arc<dyn RoomResolver>,
        signer: Arc<dyn Signer>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let machine = SessionMachine::new(&cfg, SnowflakeId::new(ID_MACHINE)?);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snap_tx, snap_rx) = watch::channel(Snapshot::of(&machine));
        let emitter = Arc::new(Emitter::new());
        let (attempts_tx, attempts_rx) = mpsc::unbounded_channel();

        let actor = SessionActor {
            cfg: Arc::new(cfg),
            machine,
            resolver,
            signer,
            connector,
            emitter: Arc::clone(&emitter),
            snapshot: snap_tx,
            commands: cmd_rx,
            link: None,
            heartbeat: None,
            attempt: None,
            attempt_epoch: 0,
            attempts_tx,
            attempts_rx,
        };
        tokio::spawn(actor.run().instrument(info_span!("dycast_session")));

        Ok(Self {
            commands: cmd_tx,
            snapshot: snap_rx,
            emitter,
        })
    }

    /// Connect to a room by its public number.
    ///
    /// Rejected with an `Error(AlreadyConnected)` event while a session is
    /// connecting, connected or reconnecting.
    pub fn connect(&self, room_num: impl Into<String>) -> Result<()> {
        self.command(Command::Connect(room_num.into()))
    }

    pub fn close(&self, code: u16, reason: impl Into<String>) -> Result<()> {
        self.command(Command::Close {
            code,
            reason: reason.into(),
        })
    }

    /// Drop the current link and resume from the last cursor.
    pub fn reconnect(&self) -> Result<()> {
        self.command(Command::Reconnect)
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshot.borrow().state
    }

    pub fn cursor(&self) -> Cursor {
        self.snapshot.borrow().cursor.clone()
    }

    pub fn live_info(&self) -> Option<LiveInfo> {
        self.snapshot.borrow().live_info.clone()
    }

    /// Watch state changes; useful to await a state without listeners.
    pub fn subscribe_state(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&DyEvent) + Send + Sync + 'static,
    {
        self.emitter.on(kind, handler)
    }

    pub fn once<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&DyEvent) + Send + Sync + 'static,
    {
        self.emitter.once(kind, handler)
    }

    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.emitter.off(kind, id)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.emitter.listener_count(kind)
    }

    /// Remove listeners of one kind, or all of them.
    pub fn clear(&self, kind: Option<EventKind>) {
        self.emitter.clear(kind)
    }

    fn command(&self, cmd: Command) -> Result<()> {
        self.commands
            .send(cmd)
            .map_err(|_| DyCastError::Internal("session task stopped".into()))
    }
}

/// Outcome of a background connection step.
enum Attempt {
    Resolved(Result<(LiveInfo, ImInfo)>),
    Opened(Box<dyn Link>),
    OpenFailed(String),
}

/// What woke the actor loop.
enum Wake {
    Command(Option<Command>),
    Link(Option<LinkEvent>),
    Attempt(Option<(u64, Attempt)>),
    Tick,
}

struct SessionActor {
    cfg: Arc<SessionSection>,
    machine: SessionMachine,
    resolver: Arc<dyn RoomResolver>,
    signer: Arc<dyn Signer>,
    connector: Arc<dyn Connector>,
    emitter: Arc<Emitter<DyEvent>>,
    snapshot: watch::Sender<Snapshot>,
    commands: mpsc::UnboundedReceiver<Command>,
    link: Option<Box<dyn Link>>,
    heartbeat: Option<Interval>,
    /// Resolve/open run off the loop so commands stay responsive.
    attempt: Option<JoinHandle<()>>,
    attempt_epoch: u64,
    attempts_tx: mpsc::UnboundedSender<(u64, Attempt)>,
    attempts_rx: mpsc::UnboundedReceiver<(u64, Attempt)>,
}

impl SessionActor {
    async fn run(mut self) {
        loop {
            let wake = tokio::select! {
                cmd = self.commands.recv() => Wake::Command(cmd),
                ev = next_link_event(&mut self.link) => Wake::Link(ev),
                done = self.attempts_rx.recv() => Wake::Attempt(done),
                _ = next_tick(&mut self.heartbeat) => Wake::Tick,
            };

            let event = match wake {
                Wake::Command(Some(cmd)) => SessionEvent::from(cmd),
                Wake::Command(None) => break,
                Wake::Link(ev) => match ev {
                    Some(LinkEvent::Binary(data)) => SessionEvent::Frame(data),
                    Some(LinkEvent::Error(e)) => SessionEvent::SocketError(e),
                    Some(LinkEvent::Closed { code, reason }) => {
                        self.link = None;
                        SessionEvent::Closed { code, reason }
                    }
                    None => {
                        self.link = None;
                        SessionEvent::Closed {
                            code: None,
                            reason: String::new(),
                        }
                    }
                },
                Wake::Attempt(Some((epoch, outcome))) => {
                    match self.accept_attempt(epoch, outcome).await {
                        Some(ev) => ev,
                        None => continue,
                    }
                }
                Wake::Attempt(None) => continue,
                Wake::Tick => SessionEvent::HeartbeatTick,
            };
            self.handle(event).await;
        }

        debug!("all handles dropped, stopping session");
        self.cancel_attempt();
        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.close(close_code::GOING_AWAY, "client dropped").await {
                debug!(error = %e, "close on shutdown failed");
            }
        }
    }

    /// Run one event and everything it causes to completion.
    async fn handle(&mut self, event: SessionEvent) {
        let mut queue = VecDeque::from([event]);
        while let Some(ev) = queue.pop_front() {
            let effects = self.machine.step(ev);
            self.publish();
            for effect in effects {
                self.apply(effect, &mut queue).await;
            }
        }
        if !matches!(
            self.machine.state(),
            ConnectionState::Connecting | ConnectionState::Reconnecting
        ) {
            self.cancel_attempt();
        }
    }

    async fn apply(&mut self, effect: Effect, queue: &mut VecDeque<SessionEvent>) {
        match effect {
            Effect::Emit(event) => self.emitter.emit(&event),
            Effect::Resolve { room_num, resume } => {
                let resolver = Arc::clone(&self.resolver);
                self.start_attempt(async move {
                    Attempt::Resolved(resolve(resolver.as_ref(), &room_num, resume).await)
                });
            }
            Effect::OpenSocket { live, cursor } => {
                let signature = self.signer.sign(&live.room_id, &live.unique_id);
                let url = match build_push_url(
                    &self.cfg.push_url,
                    &self.cfg.extra_params,
                    &live,
                    &cursor.cursor,
                    &cursor.internal_ext,
                    &signature,
                ) {
                    Ok(url) => url,
                    Err(e) => {
                        queue.push_back(SessionEvent::OpenFailed(e.to_string()));
                        return;
                    }
                };
                let connector = Arc::clone(&self.connector);
                self.start_attempt(async move {
                    match connector.connect(&url).await {
                        Ok(link) => Attempt::Opened(link),
                        Err(e) => Attempt::OpenFailed(e.to_string()),
                    }
                });
            }
            Effect::Send(data) => match self.link.as_mut() {
                Some(link) => {
                    if let Err(e) = link.send(data).await {
                        queue.push_back(SessionEvent::SendFailed(e.to_string()));
                    }
                }
                None => queue.push_back(SessionEvent::SendFailed("socket not open".into())),
            },
            Effect::CloseSocket { code, reason } => {
                if let Some(mut link) = self.link.take() {
                    if let Err(e) = link.close(code, &reason).await {
                        debug!(code, error = %e, "close frame not sent");
                    }
                    // The echo is not awaited; report a statusless close.
                    queue.push_back(SessionEvent::Closed {
                        code: None,
                        reason: String::new(),
                    });
                }
            }
            Effect::StartHeartbeat(period) => {
                let mut interval = time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.heartbeat = Some(interval);
            }
            Effect::StopHeartbeat => self.heartbeat = None,
        }
    }

    /// Spawn one connection step, replacing any step still running.
    fn start_attempt<F>(&mut self, step: F)
    where
        F: Future<Output = Attempt> + Send + 'static,
    {
        self.cancel_attempt();
        let epoch = self.attempt_epoch;
        let tx = self.attempts_tx.clone();
        let task = async move {
            let _ = tx.send((epoch, step.await));
        };
        self.attempt = Some(tokio::spawn(task.instrument(Span::current())));
    }

    /// Abort the running step; anything it already reported is discarded.
    fn cancel_attempt(&mut self) {
        if let Some(task) = self.attempt.take() {
            task.abort();
        }
        self.attempt_epoch += 1;
    }

    async fn accept_attempt(&mut self, epoch: u64, outcome: Attempt) -> Option<SessionEvent> {
        if epoch != self.attempt_epoch {
            if let Attempt::Opened(mut link) = outcome {
                debug!("closing link opened by a cancelled attempt");
                let _ = link.close(close_code::NORMAL, "cancelled").await;
            }
            return None;
        }
        self.attempt = None;
        Some(match outcome {
            Attempt::Resolved(res) => SessionEvent::Resolved(res),
            Attempt::Opened(link) => {
                self.link = Some(link);
                SessionEvent::Opened
            }
            Attempt::OpenFailed(e) => SessionEvent::OpenFailed(e),
        })
    }

    fn publish(&self) {
        self.snapshot.send_replace(Snapshot::of(&self.machine));
    }
}

async fn resolve(
    resolver: &dyn RoomResolver,
    room_num: &str,
    resume: Option<Cursor>,
) -> Result<(LiveInfo, ImInfo)> {
    let live = resolver.resolve_room(room_num).await?;
    if !live.is_living() {
        return Ok((live, ImInfo::default()));
    }
    let im = match resume {
        Some(c) => ImInfo {
            cursor: c.cursor,
            internal_ext: c.internal_ext,
            ..ImInfo::default()
        },
        None => {
            let req_ms = now_ms();
            match resolver.fetch_im_info(&live.room_id, &live.unique_id).await {
                Ok(im) => im,
                Err(e) => {
                    warn!(room_id = %live.room_id, error = %e, "im fetch failed, using fallback cursor");
                    ImInfo::fallback(&live.room_id, &live.unique_id, req_ms, now_ms())
                }
            }
        }
    };
    Ok((live, im))
}

async fn next_link_event(link: &mut Option<Box<dyn Link>>) -> Option<LinkEvent> {
    match link {
        Some(link) => link.next().await,
        None => future::pending().await,
    }
}

async fn next_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
