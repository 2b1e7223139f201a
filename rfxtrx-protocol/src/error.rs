#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame too short: expected at least {expected}, actual {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("length byte mismatch: declared {declared}, actual {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("frame too long: {0} bytes after the length byte (max 255)")]
    FrameTooLong(usize),

    #[error("payload too short for packet type {packet_type:#04x}: expected {expected}, actual {actual}")]
    PayloadTooShort {
        packet_type: u8,
        expected: usize,
        actual: usize,
    },

    #[error("unknown packet type: {0:#04x}")]
    UnknownPacketType(u8),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
