//! Lighting, chime and security packets (0x10-0x16, 0x20).

use std::fmt;

use super::{battery_rssi, require_len, rssi};
use crate::error::Result;
use crate::frame::PacketType;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Lighting1Command {
    Off,
    On,
    Dim,
    Bright,
    AllOff,
    AllOn,
    Chime,
    Unknown(u8),
}

impl Lighting1Command {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Off,
            0x01 => Self::On,
            0x02 => Self::Dim,
            0x03 => Self::Bright,
            0x05 => Self::AllOff,
            0x06 => Self::AllOn,
            0x07 => Self::Chime,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::On => "On",
            Self::Dim => "Dim",
            Self::Bright => "Bright",
            Self::AllOff => "All Off",
            Self::AllOn => "All On",
            Self::Chime => "Chime",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for Lighting1Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// X10, ARC, ELRO, Waveman, Chacon, IMPULS and similar house/unit code remotes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lighting1 {
    pub subtype: u8,
    pub sequence: u8,
    pub housecode: char,
    pub unitcode: u8,
    pub command: Lighting1Command,
    pub rssi: u8,
}

impl Lighting1 {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Lighting1, p, 6)?;
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            housecode: char::from(p[2]),
            unitcode: p[3],
            command: Lighting1Command::from_byte(p[4]),
            rssi: rssi(p[5]),
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Lighting2Command {
    Off,
    On,
    SetLevel,
    GroupOff,
    GroupOn,
    SetGroupLevel,
    Unknown(u8),
}

impl Lighting2Command {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Off,
            0x01 => Self::On,
            0x02 => Self::SetLevel,
            0x03 => Self::GroupOff,
            0x04 => Self::GroupOn,
            0x05 => Self::SetGroupLevel,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::On => "On",
            Self::SetLevel => "Set Level",
            Self::GroupOff => "Group Off",
            Self::GroupOn => "Group On",
            Self::SetGroupLevel => "Set Group Level",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for Lighting2Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AC, HomeEasy EU and ANSLUT: 26-bit id plus unit code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lighting2 {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u32,
    pub unitcode: u8,
    pub command: Lighting2Command,
    pub level: u8,
    pub rssi: u8,
}

impl Lighting2 {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Lighting2, p, 10)?;
        let id = u32::from(p[2] & 0x03) << 24
            | u32::from(p[3]) << 16
            | u32::from(p[4]) << 8
            | u32::from(p[5]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id,
            unitcode: p[6],
            command: Lighting2Command::from_byte(p[7]),
            level: p[8],
            rssi: rssi(p[9]),
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Lighting3Command {
    Bright,
    Dim,
    On,
    /// Level 1-9.
    Level(u8),
    Off,
    Program,
    Unknown(u8),
}

impl Lighting3Command {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Bright,
            0x08 => Self::Dim,
            0x10 => Self::On,
            0x11..=0x19 => Self::Level(b - 0x10),
            0x1A => Self::Off,
            0x1C => Self::Program,
            other => Self::Unknown(other),
        }
    }
}

/// Ikea Koppla: system code plus a bitmap of channels 1-10.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lighting3 {
    pub subtype: u8,
    pub sequence: u8,
    pub system: u8,
    pub channels: Vec<u8>,
    pub command: Lighting3Command,
    pub rssi: u8,
}

impl Lighting3 {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Lighting3, p, 7)?;
        let bitmap = u16::from(p[4] & 0x03) << 8 | u16::from(p[3]);
        let channels = (0..10u8).filter(|i| bitmap & (1 << i) != 0).map(|i| i + 1).collect();
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            system: p[2],
            channels,
            command: Lighting3Command::from_byte(p[5]),
            rssi: rssi(p[6]),
        })
    }
}

/// PT2262-style 24-bit code with its pulse timing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lighting4 {
    pub subtype: u8,
    pub sequence: u8,
    pub data: u32,
    /// Pulse width in microseconds.
    pub pulse: u16,
    pub rssi: u8,
}

impl Lighting4 {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Lighting4, p, 8)?;
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            data: u32::from_be_bytes([0, p[2], p[3], p[4]]),
            pulse: super::u16_be(p[5], p[6]),
            rssi: rssi(p[7]),
        })
    }
}

/// LightwaveRF, EMW100, BBSB, MDREMOTE and relatives. The command byte's
/// meaning depends on the subtype, so it is kept raw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lighting5 {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u32,
    pub unitcode: u8,
    pub command: u8,
    pub level: u8,
    pub rssi: u8,
}

impl Lighting5 {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Lighting5, p, 9)?;
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u32::from_be_bytes([0, p[2], p[3], p[4]]),
            unitcode: p[5],
            command: p[6],
            level: p[7],
            rssi: rssi(p[8]),
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Lighting6Command {
    On,
    Off,
    GroupOn,
    GroupOff,
    Unknown(u8),
}

impl Lighting6Command {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::On,
            0x01 => Self::Off,
            0x02 => Self::GroupOn,
            0x03 => Self::GroupOff,
            other => Self::Unknown(other),
        }
    }
}

/// Blyss.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lighting6 {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    pub groupcode: char,
    pub unitcode: u8,
    pub command: Lighting6Command,
    pub command_sequence: u8,
    pub rssi: u8,
}

impl Lighting6 {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Lighting6, p, 10)?;
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: super::u16_be(p[2], p[3]),
            groupcode: char::from(p[4]),
            unitcode: p[5],
            command: Lighting6Command::from_byte(p[6]),
            command_sequence: p[7],
            rssi: rssi(p[9]),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chime1 {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    pub sound: u8,
    pub rssi: u8,
}

impl Chime1 {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Chime1, p, 6)?;
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: super::u16_be(p[2], p[3]),
            sound: p[4],
            rssi: rssi(p[5]),
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SecurityStatus {
    Normal,
    NormalDelayed,
    Alarm,
    AlarmDelayed,
    Motion,
    NoMotion,
    Panic,
    EndPanic,
    ArmAway,
    ArmAwayDelayed,
    ArmHome,
    ArmHomeDelayed,
    Disarm,
    LightOff(u8),
    LightOn(u8),
    Unknown(u8),
}

impl SecurityStatus {
    /// Decode the status byte with the tamper bit already masked off.
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Normal,
            0x01 => Self::NormalDelayed,
            0x02 => Self::Alarm,
            0x03 => Self::AlarmDelayed,
            0x04 => Self::Motion,
            0x05 => Self::NoMotion,
            0x06 => Self::Panic,
            0x07 => Self::EndPanic,
            0x09 => Self::ArmAway,
            0x0A => Self::ArmAwayDelayed,
            0x0B => Self::ArmHome,
            0x0C => Self::ArmHomeDelayed,
            0x0D => Self::Disarm,
            0x10 => Self::LightOff(1),
            0x11 => Self::LightOn(1),
            0x12 => Self::LightOff(2),
            0x13 => Self::LightOn(2),
            other => Self::Unknown(other),
        }
    }
}

/// Door/window contacts, motion sensors and security remotes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Security1 {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u32,
    pub status: SecurityStatus,
    pub tampered: bool,
    pub battery: u8,
    pub rssi: u8,
}

impl Security1 {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Security1, p, 7)?;
        let (battery, rssi) = battery_rssi(p[6]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u32::from_be_bytes([0, p[2], p[3], p[4]]),
            status: SecurityStatus::from_byte(p[5] & 0x7F),
            tampered: p[5] & 0x80 != 0,
            battery,
            rssi,
        })
    }
}
