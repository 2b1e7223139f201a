//! Current/energy meters (0x59-0x5B), RFXSensor (0x70) and RFXMeter (0x71).

use super::{battery_rssi, require_len, rssi, u16_be};
use crate::error::Result;
use crate::frame::PacketType;

/// Raw energy totals count in units of 1/223.666 Wh.
const ENERGY_TOTAL_DIVISOR: f64 = 223.666;

fn amps(hi: u8, lo: u8) -> f64 {
    f64::from(u16_be(hi, lo)) / 10.0
}

fn energy_total(b: &[u8]) -> f64 {
    let raw = b.iter().fold(0u64, |acc, &x| acc << 8 | u64::from(x));
    raw as f64 / ENERGY_TOTAL_DIVISOR
}

/// Three-channel current clamp (OWL CM113 and relatives).
#[derive(Clone, Debug, PartialEq)]
pub struct Current {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    pub count: u8,
    /// Amperes per channel.
    pub channels: [f64; 3],
    pub battery: u8,
    pub rssi: u8,
}

impl Current {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Current, p, 12)?;
        let (battery, rssi) = battery_rssi(p[11]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            count: p[4],
            channels: [amps(p[5], p[6]), amps(p[7], p[8]), amps(p[9], p[10])],
            battery,
            rssi,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Energy {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    pub count: u8,
    /// Instantaneous power in W.
    pub instant: u32,
    /// Accumulated energy in Wh.
    pub total: f64,
    pub battery: u8,
    pub rssi: u8,
}

impl Energy {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Energy, p, 16)?;
        let (battery, rssi) = battery_rssi(p[15]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            count: p[4],
            instant: u32::from_be_bytes([p[5], p[6], p[7], p[8]]),
            total: energy_total(&p[9..15]),
            battery,
            rssi,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CurrentEnergy {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    pub count: u8,
    pub channels: [f64; 3],
    /// Wh; the device only sends a total with the first message of a burst.
    pub total: Option<f64>,
    pub battery: u8,
    pub rssi: u8,
}

impl CurrentEnergy {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::CurrentEnergy, p, 18)?;
        let (battery, rssi) = battery_rssi(p[17]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            count: p[4],
            channels: [amps(p[5], p[6]), amps(p[7], p[8]), amps(p[9], p[10])],
            total: (p[4] == 0).then(|| energy_total(&p[11..17])),
            battery,
            rssi,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RfxSensorReading {
    /// Degrees Celsius.
    Temperature(f64),
    /// A/D input, mV.
    Voltage(u16),
    /// Supply voltage, mV.
    Supply(u16),
    Message(u16),
    Unknown(u16),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RfxSensor {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u8,
    pub reading: RfxSensorReading,
    pub rssi: u8,
}

impl RfxSensor {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::RfxSensor, p, 6)?;
        let raw = u16_be(p[3], p[4]);
        let reading = match p[0] {
            0x00 => {
                let magnitude = f64::from(u16_be(p[3] & 0x7F, p[4])) / 100.0;
                RfxSensorReading::Temperature(if p[3] & 0x80 != 0 { -magnitude } else { magnitude })
            }
            0x01 => RfxSensorReading::Voltage(raw),
            0x02 => RfxSensorReading::Supply(raw),
            0x03 => RfxSensorReading::Message(raw),
            _ => RfxSensorReading::Unknown(raw),
        };
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: p[2],
            reading,
            rssi: rssi(p[5]),
        })
    }
}

/// Pulse counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RfxMeter {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    pub counter: u32,
    pub rssi: u8,
}

impl RfxMeter {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::RfxMeter, p, 9)?;
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            counter: u32::from_be_bytes([p[4], p[5], p[6], p[7]]),
            rssi: rssi(p[8]),
        })
    }
}
