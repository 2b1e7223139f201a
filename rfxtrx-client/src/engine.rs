use std::sync::{Arc, Mutex, PoisonError};

use futures_core::Stream;
use rfxtrx_rs_protocol::frame;
use rfxtrx_rs_protocol::{
    DecoderRegistry, InterfaceStatus, Protocol, ReceiverType, SequenceId, interface,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::{self, Context, Link, Request};
use crate::dispatch::FrameDispatcher;
use crate::error::{ClientError, Result};
use crate::events::{EngineEvent, EventSink, event_stream};
use crate::queue::{CommandOutcome, Reply};
use crate::state::{CommandPolicy, ConnectionState, EngineConfig, TimeoutPolicy};
use crate::transport::Connector;

/// Async host driver for an RFXtrx transceiver.
///
/// The engine owns no I/O itself. [`open`](Self::open) spawns a connection
/// task that opens the transport, runs the bring-up handshake
/// (settle → reset → flush → status) and then serves commands until the link
/// closes. Decoded packets and lifecycle changes are published to every
/// subscriber.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> rfxtrx_rs_client::Result<()> {
/// use rfxtrx_rs_client::{EngineConfig, RfxEngine, TcpConnector};
///
/// let engine = RfxEngine::new(TcpConnector::new("192.168.1.20:10001"), EngineConfig::default());
/// let mut events = engine.subscribe();
/// engine.open()?;
/// let status = engine.ready().await?;
/// println!("firmware {}", status.firmware_version);
///
/// while let Ok(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct RfxEngine {
    connector: Arc<dyn Connector>,
    config: EngineConfig,
    dispatcher: FrameDispatcher,
    events: EventSink,
    link: Arc<watch::Sender<Link>>,
    session: Mutex<Option<Session>>,
}

struct Session {
    requests: mpsc::Sender<Request>,
    task: JoinHandle<()>,
}

/// Handle to a command sent with tracking.
#[derive(Debug)]
pub struct TrackedCommand {
    sequence: SequenceId,
    outcome: oneshot::Receiver<Result<CommandOutcome>>,
}

impl TrackedCommand {
    /// Sequence id stamped into the frame.
    pub fn sequence(&self) -> SequenceId {
        self.sequence
    }

    /// Wait until the command settles.
    ///
    /// Resolves exactly once: with the device's reply, with the timeout
    /// policy's outcome, or with [`ClientError::ConnectionClosed`].
    pub async fn outcome(self) -> Result<CommandOutcome> {
        self.outcome
            .await
            .unwrap_or(Err(ClientError::ConnectionClosed))
    }
}

/// What [`RfxEngine::send`] did with a frame.
#[derive(Debug)]
pub enum Submitted {
    Untracked(SequenceId),
    Tracked(TrackedCommand),
}

impl Submitted {
    pub fn sequence(&self) -> SequenceId {
        match self {
            Self::Untracked(sequence) => *sequence,
            Self::Tracked(command) => command.sequence(),
        }
    }
}

impl RfxEngine {
    /// Create an engine decoding every known packet type.
    pub fn new(connector: impl Connector + 'static, config: EngineConfig) -> Self {
        Self::with_registry(connector, config, DecoderRegistry::standard())
    }

    /// Create an engine that decodes only the packet types in `registry`.
    ///
    /// Responses and interface messages are decoded regardless.
    pub fn with_registry(
        connector: impl Connector + 'static,
        config: EngineConfig,
        registry: DecoderRegistry,
    ) -> Self {
        let (link, _) = watch::channel(Link::closed());
        Self {
            connector: Arc::new(connector),
            events: EventSink::new(config.event_capacity),
            dispatcher: FrameDispatcher::new(Arc::new(registry)),
            link: Arc::new(link),
            session: Mutex::new(None),
            config,
        }
    }

    // -- Accessors --

    pub fn state(&self) -> ConnectionState {
        self.link.borrow().state
    }

    /// Status reported by the device during bring-up, refreshed by every
    /// status reply while Ready. `None` unless the link is Ready.
    pub fn status(&self) -> Option<InterfaceStatus> {
        self.link.borrow().status.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &DecoderRegistry {
        self.dispatcher.registry()
    }

    /// Subscribe to engine events. Only events published after this call are
    /// received.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Engine events as a [`Stream`].
    pub fn events(&self) -> impl Stream<Item = EngineEvent> + use<> {
        event_stream(self.events.subscribe())
    }

    // -- Lifecycle --

    /// Start bring-up in the background.
    ///
    /// Allowed from `Closed` or `Failed`. The state is `Opening` when this
    /// returns; use [`ready`](Self::ready) to wait for the handshake.
    /// Must be called from within a tokio runtime.
    pub fn open(&self) -> Result<()> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.state();
        if state.is_open() {
            return Err(ClientError::InvalidState {
                expected: "Closed or Failed",
                actual: state.as_str(),
            });
        }

        info!("opening");
        self.link.send_replace(Link::opening());
        self.events.publish(EngineEvent::Connecting);

        let (requests, rx) = mpsc::channel(self.config.request_capacity.max(1));
        let ctx = Context {
            config: self.config.clone(),
            events: self.events.clone(),
            link: self.link.clone(),
            dispatcher: self.dispatcher.clone(),
        };
        let task = tokio::spawn(connection::run(ctx, self.connector.clone(), rx));
        *session = Some(Session { requests, task });
        Ok(())
    }

    /// Wait until bring-up finishes.
    ///
    /// Returns the device status once Ready, or
    /// [`ClientError::ConnectFailed`] if the connection ended first.
    pub async fn ready(&self) -> Result<InterfaceStatus> {
        let mut rx = self.link.subscribe();
        let link = rx
            .wait_for(|link| {
                matches!(
                    link.state,
                    ConnectionState::Ready | ConnectionState::Closed | ConnectionState::Failed
                )
            })
            .await
            .map_err(|_| ClientError::ConnectionClosed)?
            .clone();

        match (link.state, link.status, link.reason) {
            (ConnectionState::Ready, Some(status), _) => Ok(status),
            (_, _, Some(reason)) => Err(ClientError::ConnectFailed(reason)),
            (state, _, None) if state == ConnectionState::Closed => Err(ClientError::NotConnected),
            (state, _, None) => Err(ClientError::ConnectFailed(state.to_string())),
        }
    }

    /// Close the link.
    ///
    /// Every pending command settles with [`ClientError::ConnectionClosed`]
    /// before this returns. Closing an engine that is not open is a no-op.
    pub async fn close(&self) -> Result<()> {
        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(session) = session else {
            return Ok(());
        };

        debug!("closing");
        let (done, done_rx) = oneshot::channel();
        if session.requests.send(Request::Close { done }).await.is_ok() {
            let _ = done_rx.await;
        }
        if let Err(e) = session.task.await {
            warn!(error = %e, "connection task ended abnormally");
        }
        Ok(())
    }

    // -- Commands --

    /// Send a frame without tracking. Returns the sequence id stamped into it.
    ///
    /// The frame is validated before anything else: a malformed frame fails
    /// with [`ClientError::Protocol`] whatever the link state.
    pub async fn enqueue(&self, frame: impl Into<Vec<u8>>) -> Result<SequenceId> {
        let frame = frame.into();
        frame::validate_outbound(&frame)?;
        self.submit(frame, None).await
    }

    /// Send a frame and track it under `policy`.
    pub async fn enqueue_tracked(
        &self,
        frame: impl Into<Vec<u8>>,
        policy: CommandPolicy,
    ) -> Result<TrackedCommand> {
        let frame = frame.into();
        frame::validate_outbound(&frame)?;
        let (outcome_tx, outcome) = oneshot::channel();
        let sequence = self.submit(frame, Some((policy, outcome_tx))).await?;
        Ok(TrackedCommand { sequence, outcome })
    }

    /// Send a frame under the configured policy for its packet type.
    pub async fn send(&self, frame: impl Into<Vec<u8>>) -> Result<Submitted> {
        let frame = frame.into();
        frame::validate_outbound(&frame)?;
        let policy = self.config.policies.get(frame[1]);
        if policy.tracked {
            self.enqueue_tracked(frame, policy)
                .await
                .map(Submitted::Tracked)
        } else {
            self.enqueue(frame).await.map(Submitted::Untracked)
        }
    }

    /// Ask the device for its status.
    pub async fn request_status(&self) -> Result<InterfaceStatus> {
        let frame = interface::get_status(SequenceId::new(0))?;
        let outcome = self
            .enqueue_tracked(frame, self.control_policy())
            .await?
            .outcome()
            .await?;
        expect_status(outcome)
    }

    /// Select the receiver frequency and the enabled receive protocols.
    ///
    /// Returns the status the device answers with, which lists the
    /// protocols it actually enabled.
    pub async fn set_protocols(
        &self,
        receiver_type: ReceiverType,
        protocols: &[Protocol],
    ) -> Result<InterfaceStatus> {
        let frame = interface::set_mode(SequenceId::new(0), receiver_type, protocols)?;
        let outcome = self
            .enqueue_tracked(frame, self.control_policy())
            .await?
            .outcome()
            .await?;
        expect_status(outcome)
    }

    /// Persist the current mode in the device's flash.
    ///
    /// The device does not always answer; a missing reply is reported as
    /// [`CommandOutcome::TimedOut`].
    pub async fn save_settings(&self) -> Result<CommandOutcome> {
        let frame = interface::save_settings(SequenceId::new(0))?;
        let policy = CommandPolicy::tracked(self.config.status_timeout, TimeoutPolicy::Advisory);
        self.enqueue_tracked(frame, policy).await?.outcome().await
    }

    // -- Helpers --

    fn control_policy(&self) -> CommandPolicy {
        CommandPolicy::tracked(self.config.status_timeout, TimeoutPolicy::Fail)
    }

    async fn submit(
        &self,
        frame: Vec<u8>,
        tracked: Option<(CommandPolicy, connection::OutcomeSender)>,
    ) -> Result<SequenceId> {
        let state = self.state();
        if state != ConnectionState::Ready {
            return Err(ClientError::NotReady {
                state: state.as_str(),
            });
        }
        let requests = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.requests.clone())
            .ok_or(ClientError::NotConnected)?;

        let (accepted, accepted_rx) = oneshot::channel();
        requests
            .send(Request::Send {
                frame,
                tracked,
                accepted,
            })
            .await
            .map_err(|_| ClientError::ConnectionClosed)?;
        accepted_rx
            .await
            .unwrap_or(Err(ClientError::ConnectionClosed))
    }
}

fn expect_status(outcome: CommandOutcome) -> Result<InterfaceStatus> {
    match outcome {
        CommandOutcome::Replied(Reply::Status(status)) => Ok(status),
        other => Err(ClientError::UnexpectedResponse(format!(
            "expected interface status, got {other:?}"
        ))),
    }
}
