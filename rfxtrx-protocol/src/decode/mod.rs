//! Inbound packet decoders.
//!
//! Every decoder is a pure mapping from the payload that follows the
//! packet-type byte to a typed record. `payload[0]` is always the subtype and
//! `payload[1]` the device's own rolling sequence number.

pub mod lighting;
pub mod meter;
pub mod sensor;

use std::collections::HashMap;

use crate::error::{ProtocolError, Result};
use crate::frame::{Frame, PacketType};
use crate::interface::{InterfaceMessage, InterfaceStatus};
use crate::response::CommandResponse;

pub use lighting::{
    Chime1, Lighting1, Lighting1Command, Lighting2, Lighting2Command, Lighting3,
    Lighting3Command, Lighting4, Lighting5, Lighting6, Lighting6Command, Security1,
    SecurityStatus,
};
pub use meter::{Current, CurrentEnergy, Energy, RfxMeter, RfxSensor, RfxSensorReading};
pub use sensor::{
    Barometric, Forecast, Humidity, HumidityStatus, Rain, Temperature, TemperatureHumidity,
    TemperatureHumidityBarometric, Uv, Weight, Wind,
};

/// A decoded inbound packet, one case per supported packet type.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodedEvent {
    Status(InterfaceStatus),
    Interface(InterfaceMessage),
    Response(CommandResponse),
    Undecoded(Undecoded),
    Lighting1(Lighting1),
    Lighting2(Lighting2),
    Lighting3(Lighting3),
    Lighting4(Lighting4),
    Lighting5(Lighting5),
    Lighting6(Lighting6),
    Chime1(Chime1),
    Security1(Security1),
    Temperature(Temperature),
    Humidity(Humidity),
    TemperatureHumidity(TemperatureHumidity),
    Barometric(Barometric),
    TemperatureHumidityBarometric(TemperatureHumidityBarometric),
    Rain(Rain),
    Wind(Wind),
    Uv(Uv),
    Current(Current),
    Energy(Energy),
    CurrentEnergy(CurrentEnergy),
    Weight(Weight),
    RfxSensor(RfxSensor),
    RfxMeter(RfxMeter),
}

impl DecodedEvent {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Status(_) | Self::Interface(_) => PacketType::InterfaceMessage,
            Self::Response(_) => PacketType::Response,
            Self::Undecoded(_) => PacketType::Undecoded,
            Self::Lighting1(_) => PacketType::Lighting1,
            Self::Lighting2(_) => PacketType::Lighting2,
            Self::Lighting3(_) => PacketType::Lighting3,
            Self::Lighting4(_) => PacketType::Lighting4,
            Self::Lighting5(_) => PacketType::Lighting5,
            Self::Lighting6(_) => PacketType::Lighting6,
            Self::Chime1(_) => PacketType::Chime1,
            Self::Security1(_) => PacketType::Security1,
            Self::Temperature(_) => PacketType::Temperature,
            Self::Humidity(_) => PacketType::Humidity,
            Self::TemperatureHumidity(_) => PacketType::TemperatureHumidity,
            Self::Barometric(_) => PacketType::Barometric,
            Self::TemperatureHumidityBarometric(_) => PacketType::TemperatureHumidityBarometric,
            Self::Rain(_) => PacketType::Rain,
            Self::Wind(_) => PacketType::Wind,
            Self::Uv(_) => PacketType::Uv,
            Self::Current(_) => PacketType::Current,
            Self::Energy(_) => PacketType::Energy,
            Self::CurrentEnergy(_) => PacketType::CurrentEnergy,
            Self::Weight(_) => PacketType::Weight,
            Self::RfxSensor(_) => PacketType::RfxSensor,
            Self::RfxMeter(_) => PacketType::RfxMeter,
        }
    }
}

/// Raw RF data the device received but could not decode itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Undecoded {
    pub subtype: u8,
    pub data: Vec<u8>,
}

impl PacketType {
    /// Decode a payload of this packet type.
    pub fn decode(self, payload: &[u8]) -> Result<DecodedEvent> {
        let event = match self {
            Self::InterfaceMessage => {
                require_len(self, payload, 1)?;
                if payload[0] == 0x00 {
                    DecodedEvent::Status(InterfaceStatus::decode(payload)?)
                } else {
                    DecodedEvent::Interface(InterfaceMessage::decode(payload)?)
                }
            }
            Self::Response => DecodedEvent::Response(CommandResponse::decode(payload)?),
            Self::Undecoded => {
                require_len(self, payload, 2)?;
                DecodedEvent::Undecoded(Undecoded {
                    subtype: payload[0],
                    data: payload[2..].to_vec(),
                })
            }
            Self::Lighting1 => DecodedEvent::Lighting1(Lighting1::decode(payload)?),
            Self::Lighting2 => DecodedEvent::Lighting2(Lighting2::decode(payload)?),
            Self::Lighting3 => DecodedEvent::Lighting3(Lighting3::decode(payload)?),
            Self::Lighting4 => DecodedEvent::Lighting4(Lighting4::decode(payload)?),
            Self::Lighting5 => DecodedEvent::Lighting5(Lighting5::decode(payload)?),
            Self::Lighting6 => DecodedEvent::Lighting6(Lighting6::decode(payload)?),
            Self::Chime1 => DecodedEvent::Chime1(Chime1::decode(payload)?),
            Self::Security1 => DecodedEvent::Security1(Security1::decode(payload)?),
            Self::Temperature => DecodedEvent::Temperature(Temperature::decode(payload)?),
            Self::Humidity => DecodedEvent::Humidity(Humidity::decode(payload)?),
            Self::TemperatureHumidity => {
                DecodedEvent::TemperatureHumidity(TemperatureHumidity::decode(payload)?)
            }
            Self::Barometric => DecodedEvent::Barometric(Barometric::decode(payload)?),
            Self::TemperatureHumidityBarometric => DecodedEvent::TemperatureHumidityBarometric(
                TemperatureHumidityBarometric::decode(payload)?,
            ),
            Self::Rain => DecodedEvent::Rain(Rain::decode(payload)?),
            Self::Wind => DecodedEvent::Wind(Wind::decode(payload)?),
            Self::Uv => DecodedEvent::Uv(Uv::decode(payload)?),
            Self::Current => DecodedEvent::Current(Current::decode(payload)?),
            Self::Energy => DecodedEvent::Energy(Energy::decode(payload)?),
            Self::CurrentEnergy => DecodedEvent::CurrentEnergy(CurrentEnergy::decode(payload)?),
            Self::Weight => DecodedEvent::Weight(Weight::decode(payload)?),
            Self::RfxSensor => DecodedEvent::RfxSensor(RfxSensor::decode(payload)?),
            Self::RfxMeter => DecodedEvent::RfxMeter(RfxMeter::decode(payload)?),
            // Outbound only; the device never sends it.
            Self::InterfaceControl => return Err(ProtocolError::UnknownPacketType(0x00)),
        };
        Ok(event)
    }

    /// Whether frames of this type can arrive from the device.
    pub fn is_inbound(self) -> bool {
        self != Self::InterfaceControl
    }
}

/// Immutable packet-type byte → decoder map, built once per engine.
#[derive(Clone, Debug)]
pub struct DecoderRegistry {
    decoders: HashMap<u8, PacketType>,
}

impl DecoderRegistry {
    /// Every inbound packet type this crate can decode.
    pub fn standard() -> Self {
        Self::with_types(PacketType::ALL.iter().copied())
    }

    /// Only the given types; frames of any other type are ignored.
    pub fn with_types(types: impl IntoIterator<Item = PacketType>) -> Self {
        let decoders = types
            .into_iter()
            .filter(|pt| pt.is_inbound())
            .map(|pt| (pt.to_byte(), pt))
            .collect();
        Self { decoders }
    }

    pub fn lookup(&self, packet_type: u8) -> Option<PacketType> {
        self.decoders.get(&packet_type).copied()
    }

    pub fn contains(&self, packet_type: PacketType) -> bool {
        self.decoders.contains_key(&packet_type.to_byte())
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decode a complete frame. `Ok(None)` when its type is not registered.
    pub fn decode(&self, frame: &Frame) -> Result<Option<DecodedEvent>> {
        match self.lookup(frame.packet_type()) {
            Some(pt) => pt.decode(frame.payload()).map(Some),
            None => Ok(None),
        }
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

pub(crate) fn require_len(packet_type: PacketType, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() < expected {
        return Err(ProtocolError::PayloadTooShort {
            packet_type: packet_type.to_byte(),
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// Sign-magnitude tenths: bit 7 of `hi` is the sign.
pub(crate) fn signed_tenths(hi: u8, lo: u8) -> f64 {
    let magnitude = u16::from_be_bytes([hi & 0x7F, lo]) as f64 / 10.0;
    if hi & 0x80 != 0 { -magnitude } else { magnitude }
}

pub(crate) fn u16_be(hi: u8, lo: u8) -> u16 {
    u16::from_be_bytes([hi, lo])
}

/// Low nibble = battery level (0-9, 9 = full), high nibble = RSSI.
pub(crate) fn battery_rssi(b: u8) -> (u8, u8) {
    (b & 0x0F, b >> 4)
}

pub(crate) fn rssi(b: u8) -> u8 {
    b >> 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_magnitude() {
        assert_eq!(signed_tenths(0x00, 0xDC), 22.0);
        assert_eq!(signed_tenths(0x80, 0x2D), -4.5);
        assert_eq!(signed_tenths(0x01, 0x00), 25.6);
    }

    #[test]
    fn battery_and_rssi_nibbles() {
        assert_eq!(battery_rssi(0x79), (9, 7));
        assert_eq!(rssi(0x70), 7);
    }

    #[test]
    fn lighting1_spec_vector() {
        let event = PacketType::Lighting1
            .decode(&[0x00, 0x01, 0x44, 0x02, 0x01, 0x70])
            .unwrap();
        match event {
            DecodedEvent::Lighting1(l) => {
                assert_eq!(l.housecode, 'D');
                assert_eq!(l.unitcode, 2);
                assert_eq!(l.command, Lighting1Command::On);
                assert_eq!(l.command.to_string(), "On");
                assert_eq!(l.rssi, 7);
            }
            other => panic!("expected Lighting1, got {other:?}"),
        }
    }

    #[test]
    fn interface_subtype_selects_status() {
        let status = PacketType::InterfaceMessage
            .decode(&[0x00, 0x01, 0x02, 0x53, 0x5F, 0x00, 0x00, 0x01])
            .unwrap();
        assert!(matches!(status, DecodedEvent::Status(_)));

        let other = PacketType::InterfaceMessage
            .decode(&[0x07, 0x03, b'C', b'o', b'p'])
            .unwrap();
        match other {
            DecodedEvent::Interface(m) => {
                assert_eq!(m.subtype, 0x07);
                assert_eq!(m.data, b"Cop".to_vec());
            }
            other => panic!("expected Interface, got {other:?}"),
        }
    }

    #[test]
    fn undecoded_keeps_raw_bytes() {
        let event = PacketType::Undecoded
            .decode(&[0x03, 0x00, 0xDE, 0xAD])
            .unwrap();
        assert_eq!(
            event,
            DecodedEvent::Undecoded(Undecoded {
                subtype: 0x03,
                data: vec![0xDE, 0xAD],
            })
        );
    }

    #[test]
    fn interface_control_is_not_decodable() {
        assert!(PacketType::InterfaceControl.decode(&[0, 0, 0]).is_err());
    }

    #[test]
    fn registry_standard_excludes_outbound_only() {
        let registry = DecoderRegistry::standard();
        assert_eq!(registry.len(), PacketType::ALL.len() - 1);
        assert!(!registry.contains(PacketType::InterfaceControl));
        assert_eq!(registry.lookup(0x10), Some(PacketType::Lighting1));
        assert_eq!(registry.lookup(0x42), None);
    }

    #[test]
    fn registry_restricted() {
        let registry = DecoderRegistry::with_types([PacketType::Response, PacketType::Temperature]);
        assert_eq!(registry.len(), 2);
        let frame = Frame::parse(vec![0x07, 0x10, 0x00, 0x01, 0x44, 0x02, 0x01, 0x70]).unwrap();
        assert!(registry.decode(&frame).unwrap().is_none());
    }

    #[test]
    fn registry_decode_frame() {
        let registry = DecoderRegistry::standard();
        let frame = Frame::parse(vec![0x04, 0x02, 0x01, 0x00, 0x00]).unwrap();
        let event = registry.decode(&frame).unwrap().unwrap();
        assert_eq!(event.packet_type(), PacketType::Response);
    }

    #[test]
    fn truncated_payload_reports_type() {
        let err = PacketType::Wind.decode(&[0x01, 0x00, 0x12]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::PayloadTooShort {
                packet_type: 0x56,
                expected: 15,
                actual: 3
            }
        ));
    }
}
