//! Routing of complete inbound frames.

use std::sync::Arc;

use rfxtrx_rs_protocol::decode::DecodedEvent;
use rfxtrx_rs_protocol::{CommandResponse, DecoderRegistry, Frame, PacketType, ProtocolError};
use tracing::{trace, warn};

use crate::queue::Reply;

/// Where an inbound frame goes next.
#[derive(Debug)]
pub enum Dispatch {
    /// Acknowledgement of a sent command (0x02), routed by sequence id.
    Response(CommandResponse),
    /// A decoded packet to publish.
    Event(DecodedEvent),
    /// Packet type not registered.
    Ignored { packet_type: u8 },
    /// Registered type whose payload failed to decode.
    Malformed {
        packet_type: u8,
        error: ProtocolError,
    },
}

impl Dispatch {
    /// The command reply this frame carries, if any. Interface messages
    /// answer control commands as well as being published.
    pub fn reply(&self) -> Option<Reply> {
        match self {
            Self::Response(r) => Some(Reply::Response(r.clone())),
            Self::Event(DecodedEvent::Status(s)) => Some(Reply::Status(s.clone())),
            Self::Event(DecodedEvent::Interface(m)) => Some(Reply::Interface(m.clone())),
            _ => None,
        }
    }
}

/// Decodes frames through a shared, immutable [`DecoderRegistry`].
///
/// Responses (0x02) and interface messages (0x01) are always decoded: the
/// engine needs them to settle commands whatever the registry holds.
#[derive(Clone, Debug)]
pub struct FrameDispatcher {
    registry: Arc<DecoderRegistry>,
}

impl FrameDispatcher {
    pub fn new(registry: Arc<DecoderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    pub fn dispatch(&self, frame: &Frame) -> Dispatch {
        let type_byte = frame.packet_type();
        trace!(packet_type = type_byte, len = frame.as_bytes().len(), "frame received");

        let packet_type = match type_byte {
            0x01 => Some(PacketType::InterfaceMessage),
            0x02 => Some(PacketType::Response),
            other => self.registry.lookup(other),
        };
        let Some(packet_type) = packet_type else {
            trace!(packet_type = type_byte, "no decoder registered");
            return Dispatch::Ignored {
                packet_type: type_byte,
            };
        };

        match packet_type.decode(frame.payload()) {
            Ok(DecodedEvent::Response(r)) => Dispatch::Response(r),
            Ok(event) => Dispatch::Event(event),
            Err(error) => {
                warn!(packet_type = type_byte, %error, "malformed frame dropped");
                Dispatch::Malformed {
                    packet_type: type_byte,
                    error,
                }
            }
        }
    }
}
