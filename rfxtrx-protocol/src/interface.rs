//! Interface control commands (packet type 0x00) and the interface status
//! reply (packet type 0x01).

use crate::decode::require_len;
use crate::error::Result;
use crate::frame::{self, PacketType};
use crate::sequence::SequenceId;

/// `cmnd` byte of an interface control frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceCommand {
    Reset,
    GetStatus,
    SetMode,
    SaveSettings,
    StartReceiver,
}

impl InterfaceCommand {
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Reset => 0x00,
            Self::GetStatus => 0x02,
            Self::SetMode => 0x03,
            Self::SaveSettings => 0x06,
            Self::StartReceiver => 0x07,
        }
    }

    /// Encode a 14-byte control frame carrying `msg1..msg9`.
    pub fn encode(self, sequence: SequenceId, msg: [u8; 9]) -> Result<Vec<u8>> {
        let mut payload = [0u8; 10];
        payload[0] = self.to_byte();
        payload[1..].copy_from_slice(&msg);
        frame::encode(PacketType::InterfaceControl.to_byte(), 0x00, sequence, &payload)
    }
}

pub fn reset(sequence: SequenceId) -> Result<Vec<u8>> {
    InterfaceCommand::Reset.encode(sequence, [0; 9])
}

pub fn get_status(sequence: SequenceId) -> Result<Vec<u8>> {
    InterfaceCommand::GetStatus.encode(sequence, [0; 9])
}

pub fn save_settings(sequence: SequenceId) -> Result<Vec<u8>> {
    InterfaceCommand::SaveSettings.encode(sequence, [0; 9])
}

pub fn start_receiver(sequence: SequenceId) -> Result<Vec<u8>> {
    InterfaceCommand::StartReceiver.encode(sequence, [0; 9])
}

/// Select the receiver frequency and the set of enabled receive protocols.
pub fn set_mode(
    sequence: SequenceId,
    receiver_type: ReceiverType,
    protocols: &[Protocol],
) -> Result<Vec<u8>> {
    let bitmap = Protocol::encode_bitmap(protocols);
    let mut msg = [0u8; 9];
    msg[0] = receiver_type.to_byte();
    msg[2..5].copy_from_slice(&bitmap);
    InterfaceCommand::SetMode.encode(sequence, msg)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReceiverType {
    Mhz310,
    Mhz315,
    Mhz433ReceiverOnly,
    Mhz433Transceiver,
    Mhz868,
    Mhz868Fsk,
    Mhz868_30,
    Mhz868_30Fsk,
    Mhz868_35,
    Mhz868_35Fsk,
    Mhz868_95,
    Unknown(u8),
}

impl ReceiverType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x50 => Self::Mhz310,
            0x51 => Self::Mhz315,
            0x52 => Self::Mhz433ReceiverOnly,
            0x53 => Self::Mhz433Transceiver,
            0x55 => Self::Mhz868,
            0x56 => Self::Mhz868Fsk,
            0x57 => Self::Mhz868_30,
            0x58 => Self::Mhz868_30Fsk,
            0x59 => Self::Mhz868_35,
            0x5A => Self::Mhz868_35Fsk,
            0x5B => Self::Mhz868_95,
            other => Self::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Mhz310 => 0x50,
            Self::Mhz315 => 0x51,
            Self::Mhz433ReceiverOnly => 0x52,
            Self::Mhz433Transceiver => 0x53,
            Self::Mhz868 => 0x55,
            Self::Mhz868Fsk => 0x56,
            Self::Mhz868_30 => 0x57,
            Self::Mhz868_30Fsk => 0x58,
            Self::Mhz868_35 => 0x59,
            Self::Mhz868_35Fsk => 0x5A,
            Self::Mhz868_95 => 0x5B,
            Self::Unknown(b) => b,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mhz310 => "310MHz",
            Self::Mhz315 => "315MHz",
            Self::Mhz433ReceiverOnly => "433.92MHz receiver only",
            Self::Mhz433Transceiver => "433.92MHz transceiver",
            Self::Mhz868 => "868.00MHz",
            Self::Mhz868Fsk => "868.00MHz FSK",
            Self::Mhz868_30 => "868.30MHz",
            Self::Mhz868_30Fsk => "868.30MHz FSK",
            Self::Mhz868_35 => "868.35MHz",
            Self::Mhz868_35Fsk => "868.35MHz FSK",
            Self::Mhz868_95 => "868.95MHz",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl std::fmt::Display for ReceiverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receive protocols that can be enabled in the device's mode bitmap.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Undecoded,
    Imagintronix,
    ByronSx,
    Rsl,
    Lighting4,
    FineOffset,
    Rubicson,
    AeBlyss,
    BlindsT1,
    BlindsT0,
    ProGuard,
    Fs20,
    LaCrosse,
    Hideki,
    LightwaveRf,
    Mertik,
    Visonic,
    Ati,
    Oregon,
    Meiantech,
    HomeEasyEu,
    Ac,
    Arc,
    X10,
}

/// `(protocol, byte index into msg3..msg5, bit mask)`.
const PROTOCOL_BITS: [(Protocol, usize, u8); 24] = [
    (Protocol::Undecoded, 0, 0x80),
    (Protocol::Imagintronix, 0, 0x40),
    (Protocol::ByronSx, 0, 0x20),
    (Protocol::Rsl, 0, 0x10),
    (Protocol::Lighting4, 0, 0x08),
    (Protocol::FineOffset, 0, 0x04),
    (Protocol::Rubicson, 0, 0x02),
    (Protocol::AeBlyss, 0, 0x01),
    (Protocol::BlindsT1, 1, 0x80),
    (Protocol::BlindsT0, 1, 0x40),
    (Protocol::ProGuard, 1, 0x20),
    (Protocol::Fs20, 1, 0x10),
    (Protocol::LaCrosse, 1, 0x08),
    (Protocol::Hideki, 1, 0x04),
    (Protocol::LightwaveRf, 1, 0x02),
    (Protocol::Mertik, 1, 0x01),
    (Protocol::Visonic, 2, 0x80),
    (Protocol::Ati, 2, 0x40),
    (Protocol::Oregon, 2, 0x20),
    (Protocol::Meiantech, 2, 0x10),
    (Protocol::HomeEasyEu, 2, 0x08),
    (Protocol::Ac, 2, 0x04),
    (Protocol::Arc, 2, 0x02),
    (Protocol::X10, 2, 0x01),
];

impl Protocol {
    /// Protocols whose bit is set in `msg3..msg5`, in table order.
    pub fn decode_bitmap(msg: [u8; 3]) -> Vec<Protocol> {
        PROTOCOL_BITS
            .iter()
            .filter(|(_, idx, bit)| msg[*idx] & bit != 0)
            .map(|(p, _, _)| *p)
            .collect()
    }

    pub fn encode_bitmap(protocols: &[Protocol]) -> [u8; 3] {
        let mut msg = [0u8; 3];
        for (p, idx, bit) in PROTOCOL_BITS {
            if protocols.contains(&p) {
                msg[idx] |= bit;
            }
        }
        msg
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undecoded => "UNDECODED",
            Self::Imagintronix => "IMAGINTRONIX",
            Self::ByronSx => "BYRONSX",
            Self::Rsl => "RSL",
            Self::Lighting4 => "LIGHTING4",
            Self::FineOffset => "FINEOFFSET",
            Self::Rubicson => "RUBICSON",
            Self::AeBlyss => "AE",
            Self::BlindsT1 => "BLINDST1",
            Self::BlindsT0 => "BLINDST0",
            Self::ProGuard => "PROGUARD",
            Self::Fs20 => "FS20",
            Self::LaCrosse => "LACROSSE",
            Self::Hideki => "HIDEKI",
            Self::LightwaveRf => "LIGHTWAVERF",
            Self::Mertik => "MERTIK",
            Self::Visonic => "VISONIC",
            Self::Ati => "ATI",
            Self::Oregon => "OREGON",
            Self::Meiantech => "MEIANTECH",
            Self::HomeEasyEu => "HOMEEASY",
            Self::Ac => "AC",
            Self::Arc => "ARC",
            Self::X10 => "X10",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply to get-status or set-mode: what the device is and what it listens for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceStatus {
    pub sequence: SequenceId,
    /// The control command this status answers.
    pub command: u8,
    pub receiver_type: ReceiverType,
    pub firmware_version: u8,
    pub protocols: Vec<Protocol>,
    pub hardware_version: Option<(u8, u8)>,
}

impl InterfaceStatus {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        require_len(PacketType::InterfaceMessage, payload, 8)?;
        let hardware_version = if payload.len() >= 11 {
            Some((payload[9], payload[10]))
        } else {
            None
        };
        Ok(Self {
            sequence: SequenceId::new(payload[1]),
            command: payload[2],
            receiver_type: ReceiverType::from_byte(payload[3]),
            firmware_version: payload[4],
            protocols: Protocol::decode_bitmap([payload[5], payload[6], payload[7]]),
            hardware_version,
        })
    }

    pub fn has_protocol(&self, protocol: Protocol) -> bool {
        self.protocols.contains(&protocol)
    }
}

/// Interface message with a subtype other than status (e.g. start-receiver
/// banner, wrong-command report).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceMessage {
    pub subtype: u8,
    pub sequence: SequenceId,
    pub data: Vec<u8>,
}

impl InterfaceMessage {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        require_len(PacketType::InterfaceMessage, payload, 2)?;
        Ok(Self {
            subtype: payload[0],
            sequence: SequenceId::new(payload[1]),
            data: payload[2..].to_vec(),
        })
    }
}
