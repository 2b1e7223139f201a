use crate::decode::require_len;
use crate::error::Result;
use crate::frame::PacketType;
use crate::sequence::SequenceId;

/// Result byte of a transmitter response (packet type 0x02).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    TxDelayed,
    TxLockFailed,
    IllegalAcAddress,
    UnknownCommand,
    UnknownRemoteId,
    Timeout,
    Unrecognized(u8),
}

impl ResultCode {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Ok,
            0x01 => Self::TxDelayed,
            0x02 => Self::TxLockFailed,
            0x03 => Self::IllegalAcAddress,
            0x04 => Self::UnknownCommand,
            0x05 => Self::UnknownRemoteId,
            0x06 => Self::Timeout,
            other => Self::Unrecognized(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::TxDelayed => 0x01,
            Self::TxLockFailed => 0x02,
            Self::IllegalAcAddress => 0x03,
            Self::UnknownCommand => 0x04,
            Self::UnknownRemoteId => 0x05,
            Self::Timeout => 0x06,
            Self::Unrecognized(b) => b,
        }
    }

    /// `true` when the device accepted the command (possibly after a delay).
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::TxDelayed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ACK - transmit OK",
            Self::TxDelayed => "ACK - transmit delayed",
            Self::TxLockFailed => "NAK - transmitter did not lock on the requested frequency",
            Self::IllegalAcAddress => "NAK - AC address zero in id1-id4 not allowed",
            Self::UnknownCommand => "command unknown or not supported by this device",
            Self::UnknownRemoteId => "unknown remote ID",
            Self::Timeout => "timeout",
            Self::Unrecognized(_) => "unrecognized result code",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unrecognized(b) => write!(f, "unrecognized result code {b:#04x}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Acknowledgement of a previously sent command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandResponse {
    pub subtype: u8,
    pub sequence: SequenceId,
    pub result: ResultCode,
}

impl CommandResponse {
    /// Decode from the payload that follows the packet-type byte.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        require_len(PacketType::Response, payload, 3)?;
        Ok(Self {
            subtype: payload[0],
            sequence: SequenceId::new(payload[1]),
            result: ResultCode::from_byte(payload[2]),
        })
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;

    #[test]
    fn decode_ok() {
        let resp = CommandResponse::decode(&[0x01, 0x00, 0x00]).unwrap();
        assert_eq!(resp.subtype, 0x01);
        assert_eq!(resp.sequence, SequenceId::new(0));
        assert_eq!(resp.result, ResultCode::Ok);
        assert!(resp.is_success());
    }

    #[test]
    fn decode_lock_failed() {
        let resp = CommandResponse::decode(&[0x01, 0x09, 0x02]).unwrap();
        assert_eq!(resp.sequence.value(), 9);
        assert_eq!(resp.result, ResultCode::TxLockFailed);
        assert!(!resp.is_success());
    }

    #[test]
    fn delayed_counts_as_success() {
        assert!(ResultCode::TxDelayed.is_success());
        assert!(!ResultCode::Timeout.is_success());
    }

    #[test]
    fn unrecognized_code_is_kept() {
        let code = ResultCode::from_byte(0x42);
        assert_eq!(code, ResultCode::Unrecognized(0x42));
        assert_eq!(code.to_byte(), 0x42);
        assert_eq!(code.to_string(), "unrecognized result code 0x42");
    }

    #[test]
    fn decode_truncated() {
        let err = CommandResponse::decode(&[0x01, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::PayloadTooShort {
                packet_type: 0x02,
                ..
            }
        ));
    }
}
