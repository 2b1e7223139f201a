use std::collections::HashMap;
use std::time::Duration;

use rfxtrx_rs_protocol::PacketType;

/// Connection state machine.
///
/// Bring-up: `Closed` → `Opening` → `Settling` → `Resetting` → `Flushing` →
/// `QueryingStatus` → `Ready`. Transport loss returns to `Closed`; a failed
/// handshake step ends in `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport open.
    Closed,
    /// Waiting for the connector to hand over a transport.
    Opening,
    /// Transport open; waiting out the device's power-up delay.
    Settling,
    /// Reset command sent; waiting out the reset window.
    Resetting,
    /// Discarding whatever the device emitted during reset.
    Flushing,
    /// Status query sent; waiting for the interface status reply.
    QueryingStatus,
    /// Handshake complete; caller commands are accepted.
    Ready,
    /// A handshake step failed. The transport has been closed.
    Failed,
}

impl ConnectionState {
    /// Returns the state name as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "Closed",
            Self::Opening => "Opening",
            Self::Settling => "Settling",
            Self::Resetting => "Resetting",
            Self::Flushing => "Flushing",
            Self::QueryingStatus => "QueryingStatus",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
        }
    }

    /// `true` while a connection task owns a transport or is acquiring one.
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed | Self::Failed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a tracked command resolves to when its timeout elapses unanswered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeoutPolicy {
    /// Resolve with `CommandOutcome::TimedOut`. RF delivery is not guaranteed,
    /// so silence is not an error.
    #[default]
    Advisory,
    /// Resolve with `CommandOutcome::Completed` and publish
    /// `EngineEvent::CommandCompleted`. For commands the device never answers.
    Complete,
    /// Resolve with `ClientError::CommandTimeout`.
    Fail,
}

/// Tracking and timeout behaviour for one kind of command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandPolicy {
    /// Wait for an acknowledgement. Untracked commands are fire-and-forget.
    pub tracked: bool,
    /// Time allowed for the acknowledgement. Default: 4 seconds.
    pub timeout: Duration,
    /// Reaction when `timeout` elapses. Default: [`TimeoutPolicy::Advisory`].
    pub on_timeout: TimeoutPolicy,
}

impl CommandPolicy {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

    pub fn untracked() -> Self {
        Self {
            tracked: false,
            timeout: Self::DEFAULT_TIMEOUT,
            on_timeout: TimeoutPolicy::Advisory,
        }
    }

    pub fn tracked(timeout: Duration, on_timeout: TimeoutPolicy) -> Self {
        Self {
            tracked: true,
            timeout,
            on_timeout,
        }
    }
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::untracked()
    }
}

/// Per-packet-type command policies, consulted by
/// [`RfxEngine::send`](crate::RfxEngine::send).
///
/// The standard table tracks interface control commands (0x00) with
/// [`TimeoutPolicy::Fail`] and sends everything else fire-and-forget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyTable {
    fallback: CommandPolicy,
    by_type: HashMap<u8, CommandPolicy>,
}

impl PolicyTable {
    pub fn standard() -> Self {
        let mut table = Self::uniform(CommandPolicy::untracked());
        table.set(
            PacketType::InterfaceControl.to_byte(),
            CommandPolicy::tracked(CommandPolicy::DEFAULT_TIMEOUT, TimeoutPolicy::Fail),
        );
        table
    }

    /// The same policy for every packet type.
    pub fn uniform(policy: CommandPolicy) -> Self {
        Self {
            fallback: policy,
            by_type: HashMap::new(),
        }
    }

    pub fn set(&mut self, packet_type: u8, policy: CommandPolicy) -> &mut Self {
        self.by_type.insert(packet_type, policy);
        self
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, packet_type: u8, policy: CommandPolicy) -> Self {
        self.set(packet_type, policy);
        self
    }

    pub fn get(&self, packet_type: u8) -> CommandPolicy {
        self.by_type.get(&packet_type).copied().unwrap_or(self.fallback)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Configuration for [`RfxEngine`](crate::RfxEngine).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Timeout for the connector to open the transport. Default: 10 seconds.
    pub open_timeout: Duration,
    /// Delay between opening the transport and sending reset. The device
    /// ignores commands while it boots. Default: 5.5 seconds.
    ///
    /// Measured from the moment the connector hands over the transport, not
    /// from [`RfxEngine::open`](crate::RfxEngine::open): a slow connector
    /// delays reset by however long `open` took, up to `open_timeout`.
    pub settle_delay: Duration,
    /// How long to wait after reset before flushing. Default: 500 ms.
    pub reset_window: Duration,
    /// Timeout for the status reply during bring-up. Default: 5 seconds.
    pub status_timeout: Duration,
    /// Tracking policy per packet type for [`RfxEngine::send`](crate::RfxEngine::send).
    pub policies: PolicyTable,
    /// Broadcast buffer for published events. Default: 256.
    pub event_capacity: usize,
    /// Buffer for requests from the handle to the connection task. Default: 32.
    pub request_capacity: usize,
    /// Size of a single transport read. Default: 256.
    pub read_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(5500),
            reset_window: Duration::from_millis(500),
            status_timeout: Duration::from_secs(5),
            policies: PolicyTable::standard(),
            event_capacity: 256,
            request_capacity: 32,
            read_buffer_size: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_tracks_interface_control_only() {
        let table = PolicyTable::standard();
        let control = table.get(0x00);
        assert!(control.tracked);
        assert_eq!(control.on_timeout, TimeoutPolicy::Fail);
        assert_eq!(control.timeout, Duration::from_secs(4));

        let lighting = table.get(0x10);
        assert!(!lighting.tracked);
        assert_eq!(lighting.on_timeout, TimeoutPolicy::Advisory);
    }

    #[test]
    fn table_overrides() {
        let table = PolicyTable::standard().with(
            0x11,
            CommandPolicy::tracked(Duration::from_secs(2), TimeoutPolicy::Advisory),
        );
        assert!(table.get(0x11).tracked);
        assert_eq!(table.get(0x11).timeout, Duration::from_secs(2));
        assert!(!table.get(0x12).tracked);
    }

    #[test]
    fn open_states() {
        assert!(!ConnectionState::Closed.is_open());
        assert!(!ConnectionState::Failed.is_open());
        assert!(ConnectionState::Settling.is_open());
        assert!(ConnectionState::Ready.is_open());
        assert_eq!(ConnectionState::QueryingStatus.to_string(), "QueryingStatus");
    }

    #[test]
    fn config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.settle_delay + config.reset_window, Duration::from_secs(6));
        assert_eq!(config.status_timeout, Duration::from_secs(5));
        assert_eq!(config.event_capacity, 256);
    }
}
