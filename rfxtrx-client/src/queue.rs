//! Outstanding-command tracking keyed by sequence id.
//!
//! The queue is generic over the waiter `W` it stores for each command, so
//! caller futures and internal handshake steps share one id space. It never
//! delivers anything itself: every operation that settles a command hands back
//! a [`Resolution`] carrying the waiter and its result.

use std::collections::HashMap;
use std::time::Duration;

use rfxtrx_rs_protocol::frame;
use rfxtrx_rs_protocol::{
    CommandResponse, InterfaceMessage, InterfaceStatus, SequenceAllocator, SequenceId,
};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::state::{CommandPolicy, TimeoutPolicy};

/// A reply frame matched to a tracked command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Response(CommandResponse),
    Status(InterfaceStatus),
    Interface(InterfaceMessage),
}

impl Reply {
    pub fn sequence(&self) -> SequenceId {
        match self {
            Self::Response(r) => r.sequence,
            Self::Status(s) => s.sequence,
            Self::Interface(m) => m.sequence,
        }
    }

    /// A response carries a result code; interface replies always count.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Response(r) => r.is_success(),
            Self::Status(_) | Self::Interface(_) => true,
        }
    }
}

/// How a tracked command ended, short of an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The device answered.
    Replied(Reply),
    /// The timeout elapsed under [`TimeoutPolicy::Complete`].
    Completed,
    /// The timeout elapsed under [`TimeoutPolicy::Advisory`].
    TimedOut,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Replied(reply) => reply.is_success(),
            Self::Completed => true,
            Self::TimedOut => false,
        }
    }

    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Self::Replied(reply) => Some(reply),
            _ => None,
        }
    }
}

/// A settled command: its waiter and what to hand it.
#[derive(Debug)]
pub struct Resolution<W> {
    pub sequence: SequenceId,
    pub waiter: W,
    pub result: Result<CommandOutcome>,
}

#[derive(Debug)]
struct Pending<W> {
    waiter: W,
    timeout: Duration,
    on_timeout: TimeoutPolicy,
    deadline: Instant,
}

#[derive(Debug)]
pub struct CommandQueue<W> {
    allocator: SequenceAllocator,
    pending: HashMap<SequenceId, Pending<W>>,
}

impl<W> CommandQueue<W> {
    pub fn new() -> Self {
        Self {
            allocator: SequenceAllocator::new(),
            pending: HashMap::new(),
        }
    }

    /// Allocate a sequence id that is not outstanding and stamp it into
    /// `frame`, which must already be a valid outbound frame.
    pub fn prepare(&mut self, frame: &mut [u8]) -> Result<SequenceId> {
        for _ in 0..=u8::MAX as usize {
            let id = self.allocator.next();
            if !self.pending.contains_key(&id) {
                frame::stamp_sequence(frame, id);
                return Ok(id);
            }
        }
        warn!(outstanding = self.pending.len(), "no free sequence id");
        Err(ClientError::QueueFull)
    }

    /// Start the timer for a prepared, written command.
    pub fn track(&mut self, sequence: SequenceId, waiter: W, policy: &CommandPolicy, now: Instant) {
        let previous = self.pending.insert(
            sequence,
            Pending {
                waiter,
                timeout: policy.timeout,
                on_timeout: policy.on_timeout,
                deadline: now + policy.timeout,
            },
        );
        debug_assert!(previous.is_none(), "sequence id {sequence} tracked twice");
    }

    /// Settle the command `sequence` with a reply. Late or duplicate replies
    /// return `None`.
    pub fn resolve(&mut self, sequence: SequenceId, reply: Reply) -> Option<Resolution<W>> {
        let pending = self.pending.remove(&sequence)?;
        debug!(%sequence, "command resolved");
        Some(Resolution {
            sequence,
            waiter: pending.waiter,
            result: Ok(CommandOutcome::Replied(reply)),
        })
    }

    /// Settle the command `sequence` with an error, bypassing its timer.
    pub fn fail(&mut self, sequence: SequenceId, error: ClientError) -> Option<Resolution<W>> {
        let pending = self.pending.remove(&sequence)?;
        debug!(%sequence, %error, "command failed");
        Some(Resolution {
            sequence,
            waiter: pending.waiter,
            result: Err(error),
        })
    }

    /// Settle every command whose deadline is at or before `now`, earliest
    /// first, according to its timeout policy.
    pub fn expire(&mut self, now: Instant) -> Vec<Resolution<W>> {
        let mut due: Vec<(Instant, SequenceId)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(id, p)| (p.deadline, *id))
            .collect();
        due.sort();

        let mut settled = Vec::with_capacity(due.len());
        for (_, sequence) in due {
            let Some(pending) = self.pending.remove(&sequence) else {
                continue;
            };
            let result = match pending.on_timeout {
                TimeoutPolicy::Advisory => Ok(CommandOutcome::TimedOut),
                TimeoutPolicy::Complete => Ok(CommandOutcome::Completed),
                TimeoutPolicy::Fail => Err(ClientError::CommandTimeout {
                    sequence,
                    after: pending.timeout,
                }),
            };
            if pending.on_timeout == TimeoutPolicy::Fail {
                warn!(%sequence, after = ?pending.timeout, "command timed out");
            } else {
                debug!(%sequence, policy = ?pending.on_timeout, "command timer elapsed");
            }
            settled.push(Resolution {
                sequence,
                waiter: pending.waiter,
                result,
            });
        }
        settled
    }

    /// Earliest armed deadline, if any command is outstanding.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Settle everything with [`ClientError::ConnectionClosed`], in id order.
    pub fn fail_all(&mut self) -> Vec<Resolution<W>> {
        let mut drained: Vec<_> = self.pending.drain().collect();
        drained.sort_by_key(|(id, _)| *id);
        drained
            .into_iter()
            .map(|(sequence, pending)| Resolution {
                sequence,
                waiter: pending.waiter,
                result: Err(ClientError::ConnectionClosed),
            })
            .collect()
    }

    pub fn is_pending(&self, sequence: SequenceId) -> bool {
        self.pending.contains_key(&sequence)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<W> Default for CommandQueue<W> {
    fn default() -> Self {
        Self::new()
    }
}
