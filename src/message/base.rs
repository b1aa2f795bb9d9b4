/*
Messages 1005 and 1006 carry the base station's antenna reference
point in ECEF coordinates; 1006 appends the antenna height. Layout
after the 3-byte leader, in bits:

field                          1005   1006
message type                     12     12
station ID                       12     12
ITRF realisation year             6      6
reserved                          4      4
antenna X (0.1 mm, signed)       38     38
reserved                          2      2
antenna Y (0.1 mm, signed)       38     38
reserved                          2      2
antenna Z (0.1 mm, signed)       38     38
antenna height (0.1 mm)           -     16
total                           152    168
*/
use super::bits::{bits_i, bits_u};
use super::DecodeError;
use std::fmt;

const UNITS_PER_METRE: f64 = 10_000.0;

/// Base-station antenna position from message 1005 or 1006.
/// Coordinates stay in the 0.1 mm units they arrive in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePosition {
    pub station_id: u16,
    pub itrf_year: u8,
    pub ecef_x: i64,
    pub ecef_y: i64,
    pub ecef_z: i64,
    /// Antenna height above the reference point, 1006 only.
    pub height: Option<u16>,
}

impl BasePosition {
    pub(crate) fn decode(
        frame: &[u8],
        payload_bits: usize,
        with_height: bool,
    ) -> Result<BasePosition, DecodeError> {
        let start = 24;
        let needed = if with_height { 168 } else { 152 };
        if payload_bits < start + needed {
            return Err(DecodeError::Overrun {
                pos: start,
                len: needed,
                have: payload_bits,
            });
        }
        let mut pos = start + 12;
        let station_id = bits_u(frame, pos, 12)? as u16;
        pos += 12;
        let itrf_year = bits_u(frame, pos, 6)? as u8;
        pos += 6 + 4;
        let ecef_x = bits_i(frame, pos, 38)?;
        pos += 38 + 2;
        let ecef_y = bits_i(frame, pos, 38)?;
        pos += 38 + 2;
        let ecef_z = bits_i(frame, pos, 38)?;
        pos += 38;
        let height = if with_height {
            Some(bits_u(frame, pos, 16)? as u16)
        } else {
            None
        };
        Ok(BasePosition {
            station_id,
            itrf_year,
            ecef_x,
            ecef_y,
            ecef_z,
            height,
        })
    }

    /// Antenna reference point in metres.
    pub fn ecef_metres(&self) -> (f64, f64, f64) {
        (
            self.ecef_x as f64 / UNITS_PER_METRE,
            self.ecef_y as f64 / UNITS_PER_METRE,
            self.ecef_z as f64 / UNITS_PER_METRE,
        )
    }

    /// Antenna height in metres, 1006 only.
    pub fn height_metres(&self) -> Option<f64> {
        self.height.map(|h| f64::from(h) / UNITS_PER_METRE)
    }
}

impl fmt::Display for BasePosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (x, y, z) = self.ecef_metres();
        writeln!(
            f,
            "stationID {}, ITRF realisation year {}",
            self.station_id, self.itrf_year
        )?;
        write!(f, "ECEF coords in metres ({:.4}, {:.4}, {:.4})", x, y, z)?;
        if let Some(height) = self.height_metres() {
            write!(f, ", antenna height {:.4} m", height)?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::bits::BitWriter;

    fn position_payload(message_type: u64, height: Option<u64>) -> Vec<u8> {
        let mut writer = BitWriter::new();
        writer
            .push(message_type, 12)
            .push(2, 12) // station ID
            .push(3, 6) // ITRF year
            .push(0, 4)
            .push_i(123_456, 38)
            .push(0, 2)
            .push_i(234_567, 38)
            .push(0, 2)
            .push_i(345_678, 38);
        if let Some(height) = height {
            writer.push(height, 16);
        }
        writer.finish()
    }

    fn with_leader(payload: Vec<u8>) -> Vec<u8> {
        let mut frame = vec![0xD3, 0, payload.len() as u8];
        frame.extend(payload);
        frame
    }

    #[test]
    fn decodes_1005() {
        let frame = with_leader(position_payload(1005, None));
        let payload_bits = frame.len() * 8;
        let position = BasePosition::decode(&frame, payload_bits, false).unwrap();
        assert_eq!(position.station_id, 2);
        assert_eq!(position.itrf_year, 3);
        assert_eq!(position.ecef_x, 123_456);
        assert_eq!(position.ecef_y, 234_567);
        assert_eq!(position.ecef_z, 345_678);
        assert_eq!(position.height, None);
    }

    #[test]
    fn decodes_1006_with_height_and_negative_coordinates() {
        let mut writer = BitWriter::new();
        writer
            .push(1006, 12)
            .push(31, 12)
            .push(0, 6)
            .push(0, 4)
            .push_i(-123_456, 38)
            .push(0, 2)
            .push_i(-1, 38)
            .push(0, 2)
            .push_i(0, 38)
            .push(15_000, 16);
        let frame = with_leader(writer.finish());
        let position = BasePosition::decode(&frame, frame.len() * 8, true).unwrap();
        assert_eq!(position.station_id, 31);
        assert_eq!(position.ecef_x, -123_456);
        assert_eq!(position.ecef_y, -1);
        assert_eq!(position.ecef_z, 0);
        assert_eq!(position.height, Some(15_000));
        assert_eq!(position.height_metres(), Some(1.5));
    }

    #[test]
    fn renders_metres() {
        let frame = with_leader(position_payload(1005, None));
        let position = BasePosition::decode(&frame, frame.len() * 8, false).unwrap();
        let text = position.to_string();
        assert!(text.contains("ECEF coords in metres (12.3456, 23.4567, 34.5678)"));
    }

    #[test]
    fn short_payload_is_an_overrun() {
        let frame = with_leader(position_payload(1006, None));
        // 1006 needs 16 more bits than this payload carries
        assert!(matches!(
            BasePosition::decode(&frame, frame.len() * 8, true),
            Err(DecodeError::Overrun { .. })
        ));
    }
}
