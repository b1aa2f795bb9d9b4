/*
RTCM3 frame layout (bit 0 is the most significant bit of byte 0):

bits 0..7      0xD3 preamble
bits 8..13     reserved, must be zero
bits 14..23    payload length L (0..1023)
bits 24..35    message type            ┐
...                                    │ payload: L bytes
bits (24+8L)..(47+8L)   CRC-24Q of the first 3+L bytes
*/
use chrono::{DateTime, Utc};
use num_enum::TryFromPrimitive;
use slog::warn;
use std::convert::TryFrom;
use std::fmt;

mod error;
pub use error::{DecodeError, Error};

pub mod bits;
pub mod crc;
pub mod frequencies;

mod base;
pub use base::BasePosition;

mod msm;
pub use msm::{Msm, MsmHeader, MsmKind, SatelliteCell, SignalCell};

mod time;
pub use time::TimeResolver;

pub use crc::crc24q;

pub const PREAMBLE: u8 = 0xD3;
pub const LEADER_LENGTH: usize = 3;
pub const CRC_LENGTH: usize = 3;
/// Smallest well-formed frame: leader, one payload byte and the CRC.
pub const MIN_FRAME_LENGTH: usize = LEADER_LENGTH + 1 + CRC_LENGTH;

/// The GNSS constellations RTCM3 multiple signal messages cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constellation {
    Gps,
    Glonass,
    Galileo,
    Sbas,
    Qzss,
    Beidou,
    NavIc,
}

impl fmt::Display for Constellation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Constellation::Gps => "GPS",
            Constellation::Glonass => "GLONASS",
            Constellation::Galileo => "Galileo",
            Constellation::Sbas => "SBAS",
            Constellation::Qzss => "QZSS",
            Constellation::Beidou => "Beidou",
            Constellation::NavIc => "NavIC",
        };
        write!(f, "{}", name)
    }
}

/// The message types this crate decodes beyond the raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u16)]
pub enum MessageType {
    BasePosition = 1005,
    BasePositionHeight = 1006,
    Msm4Gps = 1074,
    Msm7Gps = 1077,
    Msm4Glonass = 1084,
    Msm7Glonass = 1087,
    Msm4Galileo = 1094,
    Msm7Galileo = 1097,
    Msm4Sbas = 1104,
    Msm7Sbas = 1107,
    Msm4Qzss = 1114,
    Msm7Qzss = 1117,
    Msm4Beidou = 1124,
    Msm7Beidou = 1127,
    Msm4NavIc = 1134,
    Msm7NavIc = 1137,
}

enum Category {
    Base { height: bool },
    Msm(MsmKind, Constellation),
}

impl MessageType {
    fn category(self) -> Category {
        use Constellation::*;
        use MessageType::*;
        match self {
            BasePosition => Category::Base { height: false },
            BasePositionHeight => Category::Base { height: true },
            Msm4Gps => Category::Msm(MsmKind::Msm4, Gps),
            Msm7Gps => Category::Msm(MsmKind::Msm7, Gps),
            Msm4Glonass => Category::Msm(MsmKind::Msm4, Glonass),
            Msm7Glonass => Category::Msm(MsmKind::Msm7, Glonass),
            Msm4Galileo => Category::Msm(MsmKind::Msm4, Galileo),
            Msm7Galileo => Category::Msm(MsmKind::Msm7, Galileo),
            Msm4Sbas => Category::Msm(MsmKind::Msm4, Sbas),
            Msm7Sbas => Category::Msm(MsmKind::Msm7, Sbas),
            Msm4Qzss => Category::Msm(MsmKind::Msm4, Qzss),
            Msm7Qzss => Category::Msm(MsmKind::Msm7, Qzss),
            Msm4Beidou => Category::Msm(MsmKind::Msm4, Beidou),
            Msm7Beidou => Category::Msm(MsmKind::Msm7, Beidou),
            Msm4NavIc => Category::Msm(MsmKind::Msm4, NavIc),
            Msm7NavIc => Category::Msm(MsmKind::Msm7, NavIc),
        }
    }

    /// The constellation an MSM type reports for.
    pub fn constellation(self) -> Option<Constellation> {
        match self.category() {
            Category::Msm(_, constellation) => Some(constellation),
            Category::Base { .. } => None,
        }
    }

    pub fn msm_kind(self) -> Option<MsmKind> {
        match self.category() {
            Category::Msm(kind, _) => Some(kind),
            Category::Base { .. } => None,
        }
    }
}

/// Decoded payload of a message, when the type is one this crate
/// reads.
#[derive(Debug, Clone)]
pub enum Readable {
    /// The frame parsed and its CRC matched, but the type is not one
    /// this crate decodes further.
    None,
    Base1005(BasePosition),
    Base1006(BasePosition),
    Msm(Msm),
}

/// One RTCM3 frame with its quality flags and decoded payload. `valid`
/// implies `complete` and `crc_valid`; the raw bytes are kept whatever
/// the outcome so callers can log or replay them.
#[derive(Debug, Clone)]
pub struct Message {
    pub raw: Vec<u8>,
    pub message_type: u16,
    pub complete: bool,
    pub crc_valid: bool,
    pub valid: bool,
    pub readable: Readable,
    pub failure: Option<DecodeError>,
}

impl Message {
    fn failed(
        raw: Vec<u8>,
        message_type: u16,
        complete: bool,
        crc_valid: bool,
        failure: DecodeError,
    ) -> Message {
        Message {
            raw,
            message_type,
            complete,
            crc_valid,
            valid: false,
            readable: Readable::None,
            failure: Some(failure),
        }
    }
}

/// Payload length from a 3-byte leader, or why the leader cannot start
/// a frame.
pub fn parse_leader(leader: &[u8; 3]) -> Result<usize, DecodeError> {
    if leader[0] != PREAMBLE {
        return Err(DecodeError::MalformedHeader {
            reason: "missing 0xD3 preamble",
        });
    }
    if leader[1] & 0xFC != 0 {
        return Err(DecodeError::MalformedHeader {
            reason: "reserved leader bits set",
        });
    }
    let length = usize::from(leader[1] & 0x03) << 8 | usize::from(leader[2]);
    if length == 0 {
        return Err(DecodeError::MalformedHeader {
            reason: "zero payload length",
        });
    }
    Ok(length)
}

/// Routes each frame to its typed decoder. Owns the rollover state of
/// the [`TimeResolver`], so one decoder stays confined to one task; a
/// parallel consumer owns one decoder per task.
pub struct Decoder {
    times: TimeResolver,
    logger: slog::Logger,
}

impl Decoder {
    /// A decoder whose timestamps are anchored at `start` (used only
    /// to pick the first GNSS week and day).
    pub fn new(start: DateTime<Utc>, logger: slog::Logger) -> Decoder {
        let times = TimeResolver::new(start, logger.clone());
        Decoder { times, logger }
    }

    /// A decoder over a caller-built resolver, for non-default leap
    /// seconds.
    pub fn with_resolver(times: TimeResolver, logger: slog::Logger) -> Decoder {
        Decoder { times, logger }
    }

    /// Decode one frame into a [`Message`]. Never fails: framing,
    /// CRC and decode problems come back as quality flags and a
    /// failure reason on the message.
    pub fn decode(&mut self, raw: Vec<u8>) -> Message {
        let message_type = bits::bits_u(&raw, 24, 12).unwrap_or(0) as u16;

        if raw.len() < MIN_FRAME_LENGTH {
            let failure = DecodeError::Incomplete {
                expected: MIN_FRAME_LENGTH,
                actual: raw.len(),
            };
            return Message::failed(raw, message_type, false, false, failure);
        }
        let payload_length = match parse_leader(array_ref![&raw, 0, 3]) {
            Ok(length) => length,
            Err(failure) => return Message::failed(raw, message_type, false, false, failure),
        };
        let expected = LEADER_LENGTH + payload_length + CRC_LENGTH;
        if raw.len() < expected {
            let failure = DecodeError::Incomplete {
                expected,
                actual: raw.len(),
            };
            return Message::failed(raw, message_type, false, false, failure);
        }

        let body = LEADER_LENGTH + payload_length;
        let tail = array_ref![&raw, body, 3];
        let expected_crc =
            u32::from(tail[0]) << 16 | u32::from(tail[1]) << 8 | u32::from(tail[2]);
        if crc::crc24q(&raw[..body]) != expected_crc {
            return Message::failed(raw, message_type, true, false, DecodeError::CrcFailure);
        }

        match MessageType::try_from(message_type) {
            Err(_) => Message {
                raw,
                message_type,
                complete: true,
                crc_valid: true,
                valid: true,
                readable: Readable::None,
                failure: None,
            },
            Ok(known) => match self.read(&raw, body * 8, known) {
                Ok(readable) => Message {
                    raw,
                    message_type,
                    complete: true,
                    crc_valid: true,
                    valid: true,
                    readable,
                    failure: None,
                },
                Err(failure) => {
                    warn!(self.logger, "message failed to decode";
                          "type" => message_type, "reason" => %failure);
                    Message::failed(raw, message_type, true, true, failure)
                }
            },
        }
    }

    fn read(
        &mut self,
        frame: &[u8],
        payload_bits: usize,
        message_type: MessageType,
    ) -> Result<Readable, DecodeError> {
        match message_type.category() {
            Category::Base { height: false } => Ok(Readable::Base1005(BasePosition::decode(
                frame,
                payload_bits,
                false,
            )?)),
            Category::Base { height: true } => Ok(Readable::Base1006(BasePosition::decode(
                frame,
                payload_bits,
                true,
            )?)),
            Category::Msm(kind, constellation) => Ok(Readable::Msm(Msm::decode(
                frame,
                payload_bits,
                message_type as u16,
                kind,
                constellation,
                &mut self.times,
            )?)),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "message type {}, frame length {}",
            self.message_type,
            self.raw.len()
        )?;
        if !self.complete {
            writeln!(f, ", incomplete frame")?;
        } else if !self.crc_valid {
            writeln!(f, ", complete CRC check failed")?;
        } else if !self.valid {
            match &self.failure {
                Some(reason) => writeln!(f, ", invalid: {}", reason)?,
                None => writeln!(f, ", invalid")?,
            }
        } else {
            writeln!(f)?;
        }
        match &self.readable {
            Readable::None => Ok(()),
            Readable::Base1005(position) | Readable::Base1006(position) => {
                write!(f, "{}", position)
            }
            Readable::Msm(msm) => write!(f, "{}", msm),
        }
    }
}
