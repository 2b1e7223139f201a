//! Frame layout and outbound encoding.
//!
//! ```text
//! [length][packet type][subtype][sequence id][payload...]
//! ```
//!
//! `length` counts the bytes that follow it, so a complete frame is
//! `length + 1` bytes long.

use bytes::Bytes;

use crate::error::{ProtocolError, Result};
use crate::sequence::SequenceId;

/// Smallest legal value of the length byte.
pub const MIN_LENGTH_BYTE: u8 = 4;

/// Offset of the sequence id in an outbound or inbound frame.
pub const SEQUENCE_OFFSET: usize = 3;

/// Packet types this driver knows about.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PacketType {
    InterfaceControl,
    InterfaceMessage,
    Response,
    Undecoded,
    Lighting1,
    Lighting2,
    Lighting3,
    Lighting4,
    Lighting5,
    Lighting6,
    Chime1,
    Security1,
    Temperature,
    Humidity,
    TemperatureHumidity,
    Barometric,
    TemperatureHumidityBarometric,
    Rain,
    Wind,
    Uv,
    Current,
    Energy,
    CurrentEnergy,
    Weight,
    RfxSensor,
    RfxMeter,
}

impl PacketType {
    pub const ALL: [PacketType; 26] = [
        Self::InterfaceControl,
        Self::InterfaceMessage,
        Self::Response,
        Self::Undecoded,
        Self::Lighting1,
        Self::Lighting2,
        Self::Lighting3,
        Self::Lighting4,
        Self::Lighting5,
        Self::Lighting6,
        Self::Chime1,
        Self::Security1,
        Self::Temperature,
        Self::Humidity,
        Self::TemperatureHumidity,
        Self::Barometric,
        Self::TemperatureHumidityBarometric,
        Self::Rain,
        Self::Wind,
        Self::Uv,
        Self::Current,
        Self::Energy,
        Self::CurrentEnergy,
        Self::Weight,
        Self::RfxSensor,
        Self::RfxMeter,
    ];

    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0x00 => Ok(Self::InterfaceControl),
            0x01 => Ok(Self::InterfaceMessage),
            0x02 => Ok(Self::Response),
            0x03 => Ok(Self::Undecoded),
            0x10 => Ok(Self::Lighting1),
            0x11 => Ok(Self::Lighting2),
            0x12 => Ok(Self::Lighting3),
            0x13 => Ok(Self::Lighting4),
            0x14 => Ok(Self::Lighting5),
            0x15 => Ok(Self::Lighting6),
            0x16 => Ok(Self::Chime1),
            0x20 => Ok(Self::Security1),
            0x50 => Ok(Self::Temperature),
            0x51 => Ok(Self::Humidity),
            0x52 => Ok(Self::TemperatureHumidity),
            0x53 => Ok(Self::Barometric),
            0x54 => Ok(Self::TemperatureHumidityBarometric),
            0x55 => Ok(Self::Rain),
            0x56 => Ok(Self::Wind),
            0x57 => Ok(Self::Uv),
            0x59 => Ok(Self::Current),
            0x5A => Ok(Self::Energy),
            0x5B => Ok(Self::CurrentEnergy),
            0x5D => Ok(Self::Weight),
            0x70 => Ok(Self::RfxSensor),
            0x71 => Ok(Self::RfxMeter),
            _ => Err(ProtocolError::UnknownPacketType(b)),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::InterfaceControl => 0x00,
            Self::InterfaceMessage => 0x01,
            Self::Response => 0x02,
            Self::Undecoded => 0x03,
            Self::Lighting1 => 0x10,
            Self::Lighting2 => 0x11,
            Self::Lighting3 => 0x12,
            Self::Lighting4 => 0x13,
            Self::Lighting5 => 0x14,
            Self::Lighting6 => 0x15,
            Self::Chime1 => 0x16,
            Self::Security1 => 0x20,
            Self::Temperature => 0x50,
            Self::Humidity => 0x51,
            Self::TemperatureHumidity => 0x52,
            Self::Barometric => 0x53,
            Self::TemperatureHumidityBarometric => 0x54,
            Self::Rain => 0x55,
            Self::Wind => 0x56,
            Self::Uv => 0x57,
            Self::Current => 0x59,
            Self::Energy => 0x5A,
            Self::CurrentEnergy => 0x5B,
            Self::Weight => 0x5D,
            Self::RfxSensor => 0x70,
            Self::RfxMeter => 0x71,
        }
    }
}

/// One complete inbound frame, length byte included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Wrap a complete frame. The length byte must match the byte count.
    pub fn parse(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        check_length(&bytes)?;
        Ok(Self { bytes })
    }

    /// The framer has already checked the length byte.
    pub(crate) fn from_complete(bytes: Bytes) -> Self {
        debug_assert!(check_length(&bytes).is_ok());
        Self { bytes }
    }

    pub fn packet_type(&self) -> u8 {
        self.bytes[1]
    }

    pub fn subtype(&self) -> u8 {
        self.bytes[2]
    }

    pub fn sequence(&self) -> SequenceId {
        SequenceId::new(self.bytes[SEQUENCE_OFFSET])
    }

    /// Everything after the packet-type byte (subtype first).
    pub fn payload(&self) -> &[u8] {
        &self.bytes[2..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

fn check_length(bytes: &[u8]) -> Result<()> {
    let min = MIN_LENGTH_BYTE as usize + 1;
    if bytes.len() < min {
        return Err(ProtocolError::FrameTooShort {
            expected: min,
            actual: bytes.len(),
        });
    }
    let declared = bytes[0] as usize;
    if declared != bytes.len() - 1 {
        return Err(ProtocolError::LengthMismatch {
            declared,
            actual: bytes.len() - 1,
        });
    }
    Ok(())
}

/// Build an outbound frame from its parts.
pub fn encode(packet_type: u8, subtype: u8, sequence: SequenceId, payload: &[u8]) -> Result<Vec<u8>> {
    let body_len = 3 + payload.len();
    if body_len > u8::MAX as usize {
        return Err(ProtocolError::FrameTooLong(body_len));
    }

    let mut frame = Vec::with_capacity(body_len + 1);
    frame.push(body_len as u8);
    frame.push(packet_type);
    frame.push(subtype);
    frame.push(sequence.value());
    frame.extend_from_slice(payload);

    debug_assert_eq!(frame.len(), body_len + 1);
    Ok(frame)
}

/// Check caller-supplied frame bytes before they are queued.
pub fn validate_outbound(bytes: &[u8]) -> Result<()> {
    check_length(bytes)
}

/// Overwrite the sequence id byte of a validated frame.
pub fn stamp_sequence(bytes: &mut [u8], sequence: SequenceId) {
    bytes[SEQUENCE_OFFSET] = sequence.value();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_type_roundtrip_all() {
        for pt in PacketType::ALL {
            assert_eq!(PacketType::from_byte(pt.to_byte()).unwrap(), pt);
        }
    }

    #[test]
    fn unknown_packet_type() {
        let err = PacketType::from_byte(0x42).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownPacketType(0x42)));
    }

    #[test]
    fn parse_accessors() {
        let frame = Frame::parse(vec![0x04, 0x02, 0x01, 0x07, 0x00]).unwrap();
        assert_eq!(frame.packet_type(), 0x02);
        assert_eq!(frame.subtype(), 0x01);
        assert_eq!(frame.sequence(), SequenceId::new(7));
        assert_eq!(frame.payload(), &[0x01, 0x07, 0x00]);
    }

    #[test]
    fn parse_too_short() {
        let err = Frame::parse(vec![0x03, 0x02, 0x01, 0x00]).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooShort { .. }));
    }

    #[test]
    fn parse_length_mismatch() {
        let err = Frame::parse(vec![0x07, 0x02, 0x01, 0x00, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::LengthMismatch {
                declared: 7,
                actual: 4
            }
        ));
    }

    #[test]
    fn encode_reset() {
        let frame = encode(0x00, 0x00, SequenceId::new(0), &[0u8; 10]).unwrap();
        assert_eq!(frame.len(), 14);
        assert_eq!(frame[0], 0x0D);
        assert_eq!(&frame[1..4], &[0x00, 0x00, 0x00]);
    }

    #[test]
    fn encode_too_long() {
        let err = encode(0x10, 0x00, SequenceId::new(0), &[0u8; 253]).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLong(256)));
    }

    #[test]
    fn validate_and_stamp() {
        let mut frame = vec![0x07, 0x10, 0x00, 0x00, 0x41, 0x01, 0x01, 0x00];
        validate_outbound(&frame).unwrap();
        stamp_sequence(&mut frame, SequenceId::new(0x2A));
        assert_eq!(frame[3], 0x2A);
    }

    #[test]
    fn validate_rejects_bad_length() {
        assert!(validate_outbound(&[0x07, 0x10, 0x00]).is_err());
        assert!(validate_outbound(&[0x05, 0x10, 0x00, 0x00, 0x00]).is_err());
    }
}
