//! Async host driver for RFXtrx 433/868 MHz RF transceivers.
//!
//! Open a byte-stream link to the device, run its bring-up handshake, send
//! commands with optional reply tracking, and receive decoded sensor and
//! remote-control packets as events.

mod connection;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod lifecycle;
#[cfg(test)]
mod mock;
pub mod queue;
pub mod state;
pub mod transport;

pub use dispatch::{Dispatch, FrameDispatcher};
pub use engine::{RfxEngine, Submitted, TrackedCommand};
pub use error::{ClientError, Result};
pub use events::{EngineEvent, EventSink, event_stream};
pub use lifecycle::{Lifecycle, LifecycleEvent};
pub use queue::{CommandOutcome, CommandQueue, Reply, Resolution};
pub use state::{CommandPolicy, ConnectionState, EngineConfig, PolicyTable, TimeoutPolicy};
pub use transport::{Connector, StreamTransport, TcpConnector, Transport};
