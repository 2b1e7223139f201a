//! RFXtrx wire protocol: framing, sequence ids, and packet decoding.
//!
//! This crate is pure and synchronous. It turns a chunked byte stream into
//! complete frames, builds outbound interface commands, and decodes inbound
//! frames into typed events. The async engine lives in `rfxtrx-rs-client`.

pub mod decode;
pub mod error;
pub mod frame;
pub mod framer;
pub mod interface;
pub mod response;
pub mod sequence;

pub use decode::{DecodedEvent, DecoderRegistry};
pub use error::{ProtocolError, Result};
pub use frame::{Frame, PacketType};
pub use framer::ByteFramer;
pub use interface::{InterfaceCommand, InterfaceMessage, InterfaceStatus, Protocol, ReceiverType};
pub use response::{CommandResponse, ResultCode};
pub use sequence::{SequenceAllocator, SequenceId};
