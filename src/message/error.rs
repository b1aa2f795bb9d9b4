use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("byte source error")]
    Io(#[from] std::io::Error),
    #[error("message decode error")]
    Decode(#[from] DecodeError),
}

/// Why a frame or message could not be decoded. All of these are
/// recovered locally: the framer resyncs and the dispatcher tags the
/// message invalid and moves on to the next frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("bit field at offset {pos} of width {len} overruns the {have}-bit buffer")]
    Overrun { pos: usize, len: usize, have: usize },
    #[error("frame leader malformed: {reason}")]
    MalformedHeader { reason: &'static str },
    #[error("MSM header needs {needed} bits but only {available} follow the leader")]
    HeaderTooShort { needed: usize, available: usize },
    #[error("cell grid of {satellites} satellites x {signals} signals exceeds the 64-cell limit")]
    CellGridTooLarge { satellites: usize, signals: usize },
    #[error("frame incomplete: expected {expected} bytes, got {actual}")]
    Incomplete { expected: usize, actual: usize },
    #[error("complete CRC check failed")]
    CrcFailure,
}
