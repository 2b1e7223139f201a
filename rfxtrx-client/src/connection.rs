//! The connection task.
//!
//! One task per open engine owns the transport, the framer, the command queue
//! and the lifecycle. The [`RfxEngine`](crate::RfxEngine) handle talks to it
//! over an `mpsc` request channel and reads link state from a `watch` channel.
//! All timers (settle delay, command timeouts) are a single `sleep_until`
//! branch armed at the earliest deadline.

use std::sync::Arc;

use rfxtrx_rs_protocol::decode::DecodedEvent;
use rfxtrx_rs_protocol::{ByteFramer, Frame, InterfaceStatus, SequenceId, interface};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::dispatch::{Dispatch, FrameDispatcher};
use crate::error::{ClientError, Result};
use crate::events::{EngineEvent, EventSink};
use crate::lifecycle::{Lifecycle, LifecycleEvent};
use crate::queue::{CommandOutcome, CommandQueue, Reply, Resolution};
use crate::state::{CommandPolicy, ConnectionState, EngineConfig, TimeoutPolicy};
use crate::transport::{Connector, Transport};

/// Link state mirrored to the engine handle.
#[derive(Clone, Debug)]
pub(crate) struct Link {
    pub state: ConnectionState,
    pub status: Option<InterfaceStatus>,
    /// Why the last connection ended, if it did.
    pub reason: Option<String>,
}

impl Link {
    pub fn closed() -> Self {
        Self {
            state: ConnectionState::Closed,
            status: None,
            reason: None,
        }
    }

    pub fn opening() -> Self {
        Self {
            state: ConnectionState::Opening,
            status: None,
            reason: None,
        }
    }
}

pub(crate) type OutcomeSender = oneshot::Sender<Result<CommandOutcome>>;

pub(crate) enum Request {
    Send {
        frame: Vec<u8>,
        tracked: Option<(CommandPolicy, OutcomeSender)>,
        accepted: oneshot::Sender<Result<SequenceId>>,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

/// Everything the task shares with the handle.
#[derive(Clone)]
pub(crate) struct Context {
    pub config: EngineConfig,
    pub events: EventSink,
    pub link: Arc<watch::Sender<Link>>,
    pub dispatcher: FrameDispatcher,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Reset,
    Status,
}

enum Waiter {
    Caller(OutcomeSender),
    Handshake(Step),
}

/// Why the task is stopping.
enum Exit {
    /// Transport error or end of stream.
    Lost(String),
    /// A handshake step failed.
    Failed(String),
    /// The handle asked to close, or was dropped.
    Closed {
        reason: String,
        done: Option<oneshot::Sender<()>>,
    },
}

/// Open the transport, then drive the connection until it ends.
pub(crate) async fn run(
    ctx: Context,
    connector: Arc<dyn Connector>,
    mut requests: mpsc::Receiver<Request>,
) {
    let mut lifecycle = Lifecycle::new();
    if let Err(e) = lifecycle.apply(LifecycleEvent::Open) {
        warn!(error = %e, "connection task started in wrong state");
        return;
    }

    let open_timeout = ctx.config.open_timeout;
    let open = tokio::time::timeout(open_timeout, connector.open());
    tokio::pin!(open);

    let opened: std::result::Result<Box<dyn Transport>, Exit> = loop {
        tokio::select! {
            biased;
            req = requests.recv() => match req {
                Some(Request::Send { accepted, .. }) => {
                    let _ = accepted.send(Err(ClientError::NotReady {
                        state: ConnectionState::Opening.as_str(),
                    }));
                }
                Some(Request::Close { done }) => {
                    break Err(Exit::Closed {
                        reason: "closed by caller".into(),
                        done: Some(done),
                    });
                }
                None => {
                    break Err(Exit::Closed {
                        reason: "engine dropped".into(),
                        done: None,
                    });
                }
            },
            res = &mut open => break match res {
                Ok(Ok(transport)) => Ok(transport),
                Ok(Err(e)) => Err(Exit::Lost(format!("open failed: {e}"))),
                Err(_) => Err(Exit::Lost(ClientError::Timeout(open_timeout).to_string())),
            },
        }
    };

    match opened {
        Ok(transport) => {
            let mut connection = Connection::new(ctx, transport, requests, lifecycle);
            let exit = connection.drive().await;
            connection.shutdown(exit).await;
        }
        Err(exit) => {
            let _ = lifecycle.apply(LifecycleEvent::TransportLost);
            let (reason, done) = match exit {
                Exit::Lost(reason) | Exit::Failed(reason) => (reason, None),
                Exit::Closed { reason, done } => (reason, done),
            };
            warn!(%reason, "connect failed");
            ctx.link.send_modify(|link| {
                link.state = lifecycle.state();
                link.status = None;
                link.reason = Some(reason.clone());
            });
            ctx.events.publish(EngineEvent::ConnectFailed { reason });
            if let Some(done) = done {
                let _ = done.send(());
            }
        }
    }
}

struct Connection {
    ctx: Context,
    transport: Box<dyn Transport>,
    requests: mpsc::Receiver<Request>,
    lifecycle: Lifecycle,
    framer: ByteFramer,
    queue: CommandQueue<Waiter>,
    settle_deadline: Option<Instant>,
    read_buf: Vec<u8>,
}

impl Connection {
    fn new(
        ctx: Context,
        transport: Box<dyn Transport>,
        requests: mpsc::Receiver<Request>,
        lifecycle: Lifecycle,
    ) -> Self {
        let read_buf = vec![0u8; ctx.config.read_buffer_size.max(1)];
        Self {
            ctx,
            transport,
            requests,
            lifecycle,
            framer: ByteFramer::new(),
            queue: CommandQueue::new(),
            settle_deadline: None,
            read_buf,
        }
    }

    async fn drive(&mut self) -> Exit {
        if let Err(exit) = self.advance(LifecycleEvent::TransportOpened) {
            return exit;
        }
        self.publish_state(None);
        self.settle_deadline = Some(Instant::now() + self.ctx.config.settle_delay);
        debug!(delay = ?self.ctx.config.settle_delay, "transport open, settling");

        loop {
            if let Err(exit) = self.step().await {
                return exit;
            }
        }
    }

    async fn step(&mut self) -> std::result::Result<(), Exit> {
        let deadline = match (self.settle_deadline, self.queue.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let wake_at = deadline.unwrap_or_else(Instant::now);

        tokio::select! {
            biased;
            req = self.requests.recv() => self.on_request(req).await,
            read = self.transport.read(&mut self.read_buf) => self.on_read(read).await,
            _ = tokio::time::sleep_until(wake_at), if deadline.is_some() => self.on_timer().await,
        }
    }

    async fn on_request(&mut self, req: Option<Request>) -> std::result::Result<(), Exit> {
        match req {
            Some(Request::Send {
                frame,
                tracked,
                accepted,
            }) => self.on_send(frame, tracked, accepted).await,
            Some(Request::Close { done }) => Err(Exit::Closed {
                reason: "closed by caller".into(),
                done: Some(done),
            }),
            None => Err(Exit::Closed {
                reason: "engine dropped".into(),
                done: None,
            }),
        }
    }

    async fn on_send(
        &mut self,
        mut frame: Vec<u8>,
        tracked: Option<(CommandPolicy, OutcomeSender)>,
        accepted: oneshot::Sender<Result<SequenceId>>,
    ) -> std::result::Result<(), Exit> {
        let state = self.lifecycle.state();
        if state != ConnectionState::Ready {
            let _ = accepted.send(Err(ClientError::NotReady {
                state: state.as_str(),
            }));
            return Ok(());
        }

        let sequence = match self.queue.prepare(&mut frame) {
            Ok(sequence) => sequence,
            Err(e) => {
                let _ = accepted.send(Err(e));
                return Ok(());
            }
        };
        let is_tracked = tracked.is_some();
        if let Some((policy, outcome)) = tracked {
            self.queue
                .track(sequence, Waiter::Caller(outcome), &policy, Instant::now());
        }

        debug!(%sequence, packet_type = frame[1], tracked = is_tracked, "sending command");
        trace!(bytes = ?frame, "tx");
        match self.transport.write(&frame).await {
            Ok(()) => {
                let _ = accepted.send(Ok(sequence));
                Ok(())
            }
            Err(e) => {
                let reason = format!("write failed: {e}");
                if let Some(r) = self.queue.fail(sequence, ClientError::ConnectionClosed) {
                    self.settle(r).await?;
                }
                let _ = accepted.send(Err(ClientError::Io(e)));
                Err(Exit::Lost(reason))
            }
        }
    }

    async fn on_read(&mut self, read: std::io::Result<usize>) -> std::result::Result<(), Exit> {
        let n = match read {
            Ok(0) => return Err(Exit::Lost("end of stream".into())),
            Ok(n) => n,
            Err(e) => return Err(Exit::Lost(format!("read failed: {e}"))),
        };

        match self.lifecycle.state() {
            ConnectionState::QueryingStatus | ConnectionState::Ready => {}
            state => {
                trace!(%state, discarded = n, "input ignored during bring-up");
                return Ok(());
            }
        }

        let frames = self.framer.push(&self.read_buf[..n]);
        for frame in frames {
            self.on_frame(frame).await?;
        }
        Ok(())
    }

    async fn on_frame(&mut self, frame: Frame) -> std::result::Result<(), Exit> {
        let dispatch = self.ctx.dispatcher.dispatch(&frame);
        let settled = dispatch
            .reply()
            .and_then(|reply| self.queue.resolve(reply.sequence(), reply));

        match dispatch {
            Dispatch::Response(response) => {
                if settled.is_none() {
                    debug!(sequence = %response.sequence, "response matched no pending command");
                    self.ctx
                        .events
                        .publish(EngineEvent::Decoded(DecodedEvent::Response(response)));
                }
            }
            Dispatch::Event(event) => {
                if let DecodedEvent::Status(status) = &event {
                    if self.lifecycle.state() == ConnectionState::Ready {
                        let status = status.clone();
                        self.ctx.link.send_modify(|link| link.status = Some(status));
                    }
                }
                self.ctx.events.publish(EngineEvent::Decoded(event));
            }
            Dispatch::Ignored { .. } | Dispatch::Malformed { .. } => {}
        }

        if let Some(resolution) = settled {
            self.settle(resolution).await?;
        }
        Ok(())
    }

    async fn on_timer(&mut self) -> std::result::Result<(), Exit> {
        let now = Instant::now();

        if self.settle_deadline.is_some_and(|at| at <= now) {
            self.settle_deadline = None;
            self.advance(LifecycleEvent::SettleElapsed)?;
            self.publish_state(None);
            let policy =
                CommandPolicy::tracked(self.ctx.config.reset_window, TimeoutPolicy::Complete);
            self.send_control(Step::Reset, interface::reset, policy).await?;
        }

        for resolution in self.queue.expire(now) {
            self.settle(resolution).await?;
        }
        Ok(())
    }

    /// Hand a settled command to whoever waits for it.
    async fn settle(&mut self, resolution: Resolution<Waiter>) -> std::result::Result<(), Exit> {
        let Resolution {
            sequence,
            waiter,
            result,
        } = resolution;
        match waiter {
            Waiter::Caller(tx) => {
                if matches!(result, Ok(CommandOutcome::Completed)) {
                    self.ctx
                        .events
                        .publish(EngineEvent::CommandCompleted { sequence });
                }
                // The caller may have dropped its TrackedCommand.
                let _ = tx.send(result);
                Ok(())
            }
            Waiter::Handshake(step) => self.on_step(step, result).await,
        }
    }

    async fn on_step(
        &mut self,
        step: Step,
        result: Result<CommandOutcome>,
    ) -> std::result::Result<(), Exit> {
        match (step, result) {
            (Step::Reset, Ok(_)) => {
                self.advance(LifecycleEvent::ResetAcked)?;
                self.publish_state(None);
                self.flush().await?;
                let policy =
                    CommandPolicy::tracked(self.ctx.config.status_timeout, TimeoutPolicy::Fail);
                self.send_control(Step::Status, interface::get_status, policy)
                    .await
            }
            (Step::Status, Ok(CommandOutcome::Replied(Reply::Status(status)))) => {
                self.advance(LifecycleEvent::StatusAcked)?;
                info!(
                    receiver = %status.receiver_type,
                    firmware = status.firmware_version,
                    protocols = status.protocols.len(),
                    "link ready"
                );
                self.publish_state(Some(status.clone()));
                self.ctx.events.publish(EngineEvent::Ready(status));
                Ok(())
            }
            (Step::Status, Ok(other)) => Err(Exit::Failed(format!(
                "unexpected reply to status query: {other:?}"
            ))),
            (step, Err(e)) => Err(Exit::Failed(format!("{step:?} step failed: {e}"))),
        }
    }

    async fn flush(&mut self) -> std::result::Result<(), Exit> {
        self.transport
            .discard_input()
            .await
            .map_err(|e| Exit::Failed(format!("flush failed: {e}")))?;
        self.framer.clear();
        self.advance(LifecycleEvent::Flushed)?;
        self.publish_state(None);
        Ok(())
    }

    /// Send a handshake command through the queue.
    async fn send_control(
        &mut self,
        step: Step,
        build: fn(SequenceId) -> rfxtrx_rs_protocol::Result<Vec<u8>>,
        policy: CommandPolicy,
    ) -> std::result::Result<(), Exit> {
        let mut frame = build(SequenceId::new(0)).map_err(|e| Exit::Failed(e.to_string()))?;
        let sequence = self
            .queue
            .prepare(&mut frame)
            .map_err(|e| Exit::Failed(e.to_string()))?;
        self.queue
            .track(sequence, Waiter::Handshake(step), &policy, Instant::now());

        debug!(?step, %sequence, timeout = ?policy.timeout, "handshake command");
        if let Err(e) = self.transport.write(&frame).await {
            self.queue.fail(sequence, ClientError::ConnectionClosed);
            return Err(Exit::Failed(format!("{step:?} write failed: {e}")));
        }
        Ok(())
    }

    fn advance(&mut self, event: LifecycleEvent) -> std::result::Result<ConnectionState, Exit> {
        let state = self
            .lifecycle
            .apply(event)
            .map_err(|e| Exit::Failed(e.to_string()))?;
        debug!(event = event.as_str(), %state, "lifecycle");
        Ok(state)
    }

    fn publish_state(&self, status: Option<InterfaceStatus>) {
        let state = self.lifecycle.state();
        self.ctx.link.send_modify(|link| {
            link.state = state;
            if status.is_some() {
                link.status = status;
            }
        });
    }

    /// Settle every pending command with `ConnectionClosed`, close the
    /// transport, and report how the connection ended.
    async fn shutdown(mut self, exit: Exit) {
        let was_ready = self.lifecycle.state() == ConnectionState::Ready;

        for resolution in self.queue.fail_all() {
            if let Waiter::Caller(tx) = resolution.waiter {
                let _ = tx.send(resolution.result);
            }
        }
        if let Err(e) = self.transport.close().await {
            debug!(error = %e, "transport close failed");
        }

        let (event, reason, done) = match exit {
            Exit::Lost(reason) => (LifecycleEvent::TransportLost, reason, None),
            Exit::Failed(reason) => (LifecycleEvent::StepFailed, reason, None),
            Exit::Closed { reason, done } => (LifecycleEvent::TransportLost, reason, done),
        };
        if self.lifecycle.apply(event).is_err() {
            // StepFailed outside the handshake: treat as a lost link.
            let _ = self.lifecycle.apply(LifecycleEvent::TransportLost);
        }
        let state = self.lifecycle.state();

        self.ctx.link.send_modify(|link| {
            link.state = state;
            link.status = None;
            link.reason = Some(reason.clone());
        });

        if was_ready {
            info!(%reason, "disconnected");
            self.ctx.events.publish(EngineEvent::Disconnect { reason });
        } else {
            warn!(%reason, %state, "connect failed");
            self.ctx.events.publish(EngineEvent::ConnectFailed { reason });
        }

        if let Some(done) = done {
            let _ = done.send(());
        }
    }
}
