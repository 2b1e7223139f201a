use std::time::Duration;

use rfxtrx_rs_protocol::SequenceId;

/// Errors that can occur while driving an RFXtrx device.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed frame bytes or an undecodable payload.
    #[error("protocol error: {0}")]
    Protocol(#[from] rfxtrx_rs_protocol::ProtocolError),

    /// Opening the transport exceeded the configured timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// A tracked command with a failing timeout policy got no reply.
    #[error("command {sequence} timed out after {after:?}")]
    CommandTimeout { sequence: SequenceId, after: Duration },

    /// The connection closed before the command resolved.
    #[error("connection closed")]
    ConnectionClosed,

    /// No connection has been opened.
    #[error("not connected")]
    NotConnected,

    /// Commands are only accepted once the link is Ready.
    #[error("link not ready (state {state})")]
    NotReady { state: &'static str },

    /// Method called in the wrong connection state (e.g. `open` while Ready).
    #[error("invalid state: expected {expected}, actual {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// The lifecycle rejected an event in its current state.
    #[error("invalid transition: {event} in state {from}")]
    InvalidTransition {
        from: &'static str,
        event: &'static str,
    },

    /// All 256 sequence ids are outstanding.
    #[error("command queue full: every sequence id is outstanding")]
    QueueFull,

    /// Bring-up failed before the link became Ready.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The device answered with a reply of the wrong kind.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Convenience alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;
