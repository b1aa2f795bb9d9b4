/*
Multiple signal messages pack a satellite section and a signal section
after the header, each laid out column-major: every satellite's value
for one field, then every satellite's value for the next field, and
likewise per signal cell. MSM4 and MSM7 share this shape and differ
only in field widths and in MSM7's phase-range rates.

Satellite cell          MSM4        MSM7
rough range whole ms       8           8
extended information       -           4
rough range mod 1 ms      10          10
phase range rate           -   14 signed
total                     18          36

Signal cell             MSM4        MSM7
range delta        15 signed   20 signed
phase range delta  22 signed   24 signed
lock time indicator        4          10
half-cycle ambiguity       1           1
CNR                        6          10
phase range rate delta     -   15 signed
total                     48          80
*/
mod header;
pub use header::MsmHeader;

use super::bits::{bits_i, bits_u};
use super::frequencies::{wavelength, RANGE_MILLISECOND};
use super::time::TimeResolver;
use super::{Constellation, DecodeError};
use chrono::{DateTime, Utc};
use std::fmt;

/// The two MSM resolutions this crate decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsmKind {
    Msm4,
    Msm7,
}

impl MsmKind {
    fn satellite_bits(self) -> usize {
        match self {
            MsmKind::Msm4 => 18,
            MsmKind::Msm7 => 36,
        }
    }

    fn signal_bits(self) -> usize {
        match self {
            MsmKind::Msm4 => 48,
            MsmKind::Msm7 => 80,
        }
    }

    fn range_delta_bits(self) -> usize {
        match self {
            MsmKind::Msm4 => 15,
            MsmKind::Msm7 => 20,
        }
    }

    /// Left shift aligning the range delta with the 20-bit MSM7 slot.
    fn range_delta_shift(self) -> u32 {
        match self {
            MsmKind::Msm4 => 5,
            MsmKind::Msm7 => 0,
        }
    }

    fn phase_delta_bits(self) -> usize {
        match self {
            MsmKind::Msm4 => 22,
            MsmKind::Msm7 => 24,
        }
    }

    /// Left shift aligning the phase-range delta with the 24-bit slot.
    fn phase_delta_shift(self) -> u32 {
        match self {
            MsmKind::Msm4 => 2,
            MsmKind::Msm7 => 0,
        }
    }

    fn lock_bits(self) -> usize {
        match self {
            MsmKind::Msm4 => 4,
            MsmKind::Msm7 => 10,
        }
    }

    fn cnr_bits(self) -> usize {
        match self {
            MsmKind::Msm4 => 6,
            MsmKind::Msm7 => 10,
        }
    }
}

impl fmt::Display for MsmKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MsmKind::Msm4 => write!(f, "MSM4"),
            MsmKind::Msm7 => write!(f, "MSM7"),
        }
    }
}

/// Top-bit-only sentinel of an n-bit signed field: "value absent".
const fn sentinel(bits: usize) -> i64 {
    -(1 << (bits - 1))
}

const INVALID_RANGE_WHOLE: u64 = 0xFF;
const PHASE_RANGE_RATE_BITS: usize = 14;
const PHASE_RANGE_RATE_DELTA_BITS: usize = 15;
const RANGE_FRACTION_SCALE: f64 = 1024.0;

/// Per-satellite fields of the satellite section. Protocol sentinels
/// decode to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteCell {
    pub satellite_id: u8,
    /// Rough range, whole milliseconds.
    pub range_whole_millis: Option<u8>,
    /// Rough range modulo 1 ms, in units of 1/1024 ms.
    pub range_fraction: u16,
    /// Extended satellite information, MSM7 only.
    pub extended_info: Option<u8>,
    /// Rough phase range rate in whole m/s, MSM7 only.
    pub phase_range_rate: Option<i16>,
}

impl SatelliteCell {
    /// Rough range in metres from the satellite fields alone.
    pub fn approximate_range_metres(&self) -> Option<f64> {
        let whole = f64::from(self.range_whole_millis?);
        let fraction = f64::from(self.range_fraction) / RANGE_FRACTION_SCALE;
        Some((whole + fraction) * RANGE_MILLISECOND)
    }
}

/// Per-(satellite, signal) fields of the signal section. Deltas are
/// normalised to the MSM7 widths at decode time so that aggregation is
/// layout-independent; sentinels decode to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalCell {
    /// Index of the owning satellite in [`Msm::satellites`].
    pub satellite_index: u8,
    pub satellite_id: u8,
    pub signal_id: u8,
    /// Range delta in units of 2^-29 ms.
    pub range_delta: Option<i64>,
    /// Phase-range delta in units of 2^-31 ms.
    pub phase_range_delta: Option<i64>,
    pub lock_time: u16,
    pub half_cycle_ambiguity: bool,
    pub cnr: u16,
    /// Phase-range-rate delta in 0.1 mm/s, MSM7 only.
    pub phase_range_rate_delta: Option<i16>,
}

impl SignalCell {
    // A cell whose every field is zero; a short multiple-message frame
    // is padded with these.
    fn is_zero(&self) -> bool {
        self.range_delta == Some(0)
            && self.phase_range_delta == Some(0)
            && self.lock_time == 0
            && !self.half_cycle_ambiguity
            && self.cnr == 0
            && self.phase_range_rate_delta.unwrap_or(0) == 0
    }
}

const SCALE_2_29: f64 = (1u64 << 29) as f64;
const SCALE_2_31: f64 = (1u64 << 31) as f64;
const RATE_UNITS_PER_METRE_SECOND: i64 = 10_000;

/// A decoded multiple signal message: header, satellite cells in
/// ascending satellite-ID order, and signal cells in row-major
/// (satellite, then signal) order.
#[derive(Debug, Clone)]
pub struct Msm {
    pub kind: MsmKind,
    pub header: MsmHeader,
    pub satellites: Vec<SatelliteCell>,
    pub signals: Vec<SignalCell>,
    /// Epoch time resolved to UTC, when the constellation has a
    /// defined mapping.
    pub utc: Option<DateTime<Utc>>,
}

impl Msm {
    pub(crate) fn decode(
        frame: &[u8],
        payload_bits: usize,
        message_type: u16,
        kind: MsmKind,
        constellation: Constellation,
        times: &mut TimeResolver,
    ) -> Result<Msm, DecodeError> {
        let (header, pos) = MsmHeader::decode(frame, payload_bits, message_type, constellation)?;
        let (satellites, pos) = decode_satellites(frame, payload_bits, pos, kind, &header)?;
        let signals = decode_signals(frame, payload_bits, pos, kind, &header)?;
        let utc = times.resolve(constellation, header.epoch_time);
        Ok(Msm {
            kind,
            header,
            satellites,
            signals,
            utc,
        })
    }

    /// The satellite cell a signal cell references.
    pub fn satellite(&self, cell: &SignalCell) -> &SatelliteCell {
        &self.satellites[cell.satellite_index as usize]
    }

    /// Satellite-to-receiver range in metres, or `None` when the
    /// satellite's rough range is absent. A delta at its sentinel
    /// contributes nothing.
    pub fn range_metres(&self, cell: &SignalCell) -> Option<f64> {
        let satellite = self.satellite(cell);
        let whole = i64::from(satellite.range_whole_millis?);
        let fraction = i64::from(satellite.range_fraction);
        let aggregate = (whole << 29 | fraction << 19) + cell.range_delta.unwrap_or(0);
        Some(aggregate as f64 / SCALE_2_29 * RANGE_MILLISECOND)
    }

    /// Phase range in cycles, or `None` when the rough range is absent
    /// or the signal has no known wavelength.
    pub fn phase_range_cycles(&self, cell: &SignalCell) -> Option<f64> {
        let wavelength = wavelength(self.header.constellation, cell.signal_id);
        if wavelength == 0.0 {
            return None;
        }
        let satellite = self.satellite(cell);
        let whole = i64::from(satellite.range_whole_millis?);
        let fraction = i64::from(satellite.range_fraction);
        let aggregate = (whole << 31 | fraction << 21) + cell.phase_range_delta.unwrap_or(0);
        Some(aggregate as f64 / SCALE_2_31 * RANGE_MILLISECOND / wavelength)
    }

    /// Phase range rate in m/s; `None` for MSM4 or when the
    /// satellite's rough rate is absent.
    pub fn phase_range_rate(&self, cell: &SignalCell) -> Option<f64> {
        let rough = i64::from(self.satellite(cell).phase_range_rate?);
        let delta = i64::from(cell.phase_range_rate_delta.unwrap_or(0));
        Some((rough * RATE_UNITS_PER_METRE_SECOND + delta) as f64 / RATE_UNITS_PER_METRE_SECOND as f64)
    }

    /// Doppler in Hz, derived from the phase range rate.
    pub fn doppler_hz(&self, cell: &SignalCell) -> Option<f64> {
        let wavelength = wavelength(self.header.constellation, cell.signal_id);
        if wavelength == 0.0 {
            return None;
        }
        Some(-self.phase_range_rate(cell)? / wavelength)
    }
}

fn decode_satellites(
    frame: &[u8],
    payload_bits: usize,
    start: usize,
    kind: MsmKind,
    header: &MsmHeader,
) -> Result<(Vec<SatelliteCell>, usize), DecodeError> {
    let count = header.satellite_count();
    let needed = count * kind.satellite_bits();
    if payload_bits < start + needed {
        return Err(DecodeError::Overrun {
            pos: start,
            len: needed,
            have: payload_bits,
        });
    }
    let mut cells: Vec<SatelliteCell> = header
        .satellite_ids
        .iter()
        .map(|&satellite_id| SatelliteCell {
            satellite_id,
            range_whole_millis: None,
            range_fraction: 0,
            extended_info: None,
            phase_range_rate: None,
        })
        .collect();

    let mut pos = start;
    for cell in cells.iter_mut() {
        let whole = bits_u(frame, pos, 8)?;
        pos += 8;
        cell.range_whole_millis = if whole == INVALID_RANGE_WHOLE {
            None
        } else {
            Some(whole as u8)
        };
    }
    if kind == MsmKind::Msm7 {
        for cell in cells.iter_mut() {
            cell.extended_info = Some(bits_u(frame, pos, 4)? as u8);
            pos += 4;
        }
    }
    for cell in cells.iter_mut() {
        cell.range_fraction = bits_u(frame, pos, 10)? as u16;
        pos += 10;
    }
    if kind == MsmKind::Msm7 {
        for cell in cells.iter_mut() {
            let rate = bits_i(frame, pos, PHASE_RANGE_RATE_BITS)?;
            pos += PHASE_RANGE_RATE_BITS;
            cell.phase_range_rate = if rate == sentinel(PHASE_RANGE_RATE_BITS) {
                None
            } else {
                Some(rate as i16)
            };
        }
    }
    Ok((cells, pos))
}

fn decode_signals(
    frame: &[u8],
    payload_bits: usize,
    start: usize,
    kind: MsmKind,
    header: &MsmHeader,
) -> Result<Vec<SignalCell>, DecodeError> {
    let declared = header.cell_count();
    let per_cell = kind.signal_bits();
    let available = (payload_bits - start) / per_cell;
    let count = if header.multiple_message {
        // a continued message carries however many whole cells fit
        if declared > 0 && available == 0 {
            return Err(DecodeError::Overrun {
                pos: start,
                len: per_cell,
                have: payload_bits,
            });
        }
        declared.min(available)
    } else {
        if available < declared {
            return Err(DecodeError::Overrun {
                pos: start,
                len: declared * per_cell,
                have: payload_bits,
            });
        }
        declared
    };

    // map the first `count` populated cells to their grid coordinates
    let signal_count = header.signal_count();
    let mut cells = Vec::with_capacity(count);
    'grid: for row in 0..header.satellite_count() {
        for column in 0..signal_count {
            if !header.cell(row, column) {
                continue;
            }
            cells.push(SignalCell {
                satellite_index: row as u8,
                satellite_id: header.satellite_ids[row],
                signal_id: header.signal_ids[column],
                range_delta: None,
                phase_range_delta: None,
                lock_time: 0,
                half_cycle_ambiguity: false,
                cnr: 0,
                phase_range_rate_delta: None,
            });
            if cells.len() == count {
                break 'grid;
            }
        }
    }

    let mut pos = start;
    for cell in cells.iter_mut() {
        let delta = bits_i(frame, pos, kind.range_delta_bits())?;
        pos += kind.range_delta_bits();
        cell.range_delta = if delta == sentinel(kind.range_delta_bits()) {
            None
        } else {
            Some(delta << kind.range_delta_shift())
        };
    }
    for cell in cells.iter_mut() {
        let delta = bits_i(frame, pos, kind.phase_delta_bits())?;
        pos += kind.phase_delta_bits();
        cell.phase_range_delta = if delta == sentinel(kind.phase_delta_bits()) {
            None
        } else {
            Some(delta << kind.phase_delta_shift())
        };
    }
    for cell in cells.iter_mut() {
        cell.lock_time = bits_u(frame, pos, kind.lock_bits())? as u16;
        pos += kind.lock_bits();
    }
    for cell in cells.iter_mut() {
        cell.half_cycle_ambiguity = bits_u(frame, pos, 1)? == 1;
        pos += 1;
    }
    for cell in cells.iter_mut() {
        cell.cnr = bits_u(frame, pos, kind.cnr_bits())? as u16;
        pos += kind.cnr_bits();
    }
    if kind == MsmKind::Msm7 {
        for cell in cells.iter_mut() {
            let delta = bits_i(frame, pos, PHASE_RANGE_RATE_DELTA_BITS)?;
            pos += PHASE_RANGE_RATE_DELTA_BITS;
            cell.phase_range_rate_delta = if delta == sentinel(PHASE_RANGE_RATE_DELTA_BITS) {
                None
            } else {
                Some(delta as i16)
            };
        }
    }

    if header.multiple_message {
        // the stream writer pads a short final message with all-zero
        // cells; strip them. A genuine all-zero cell is
        // indistinguishable from padding and is dropped with it.
        while matches!(cells.last(), Some(cell) if cell.is_zero()) {
            cells.pop();
        }
    }
    Ok(cells)
}

impl fmt::Display for Msm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let header = &self.header;
        write!(
            f,
            "{} {} stationID {}, epoch {}",
            header.constellation, self.kind, header.station_id, header.epoch_time
        )?;
        if let Some(utc) = self.utc {
            write!(f, " ({} UTC)", utc.format("%Y-%m-%d %H:%M:%S%.3f"))?;
        }
        if header.multiple_message {
            write!(f, ", more messages follow")?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{} satellites, {} signal types, {} signals",
            header.satellite_count(),
            header.signal_count(),
            self.signals.len()
        )?;
        for satellite in &self.satellites {
            match satellite.approximate_range_metres() {
                Some(range) => writeln!(f, "satellite {:2}: approx range {:.3} m", satellite.satellite_id, range)?,
                None => writeln!(f, "satellite {:2}: range invalid", satellite.satellite_id)?,
            }
        }
        for cell in &self.signals {
            write!(f, "sat {:2} sig {:2}:", cell.satellite_id, cell.signal_id)?;
            match self.range_metres(cell) {
                Some(range) => write!(f, " range {:.3} m,", range)?,
                None => write!(f, " range invalid,")?,
            }
            match self.phase_range_cycles(cell) {
                Some(cycles) => write!(f, " phase {:.3} cycles,", cycles)?,
                None => write!(f, " phase invalid,")?,
            }
            if self.kind == MsmKind::Msm7 {
                match (self.phase_range_rate(cell), self.doppler_hz(cell)) {
                    (Some(rate), Some(doppler)) => {
                        write!(f, " rate {:.4} m/s, doppler {:.3} Hz,", rate, doppler)?
                    }
                    _ => write!(f, " rate invalid,")?,
                }
            }
            writeln!(
                f,
                " lock {}, half-cycle {}, CNR {}",
                cell.lock_time, cell.half_cycle_ambiguity, cell.cnr
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::bits::BitWriter;
    use chrono::TimeZone;
    use float_cmp::assert_approx_eq;
    use slog::o;

    fn resolver() -> TimeResolver {
        TimeResolver::new(
            Utc.with_ymd_and_hms(2023, 5, 14, 0, 0, 0).unwrap(),
            slog::Logger::root(slog::Discard, o!()),
        )
    }

    // Two satellites (4 and 9), two signals (2 and 15), all four cells
    // populated.
    fn msm7_writer(multiple_message: u64) -> BitWriter {
        let mut writer = BitWriter::new();
        writer
            .push(0xD3, 8)
            .push(0, 16)
            .push(1077, 12)
            .push(2, 12)
            .push(3_600_000, 30)
            .push(multiple_message, 1)
            .push(0, 3)
            .push(0, 7)
            .push(0, 2)
            .push(0, 2)
            .push(0, 1)
            .push(0, 3)
            .push(1 << 60 | 1 << 55, 64)
            .push(1 << 30 | 1 << 17, 32)
            .push(0b1111, 4);
        // satellite stripes, column-major
        writer.push(81, 8).push(0xFF, 8); // rough range whole ms
        writer.push(0, 4).push(0, 4); // extended info
        writer.push(512, 10).push(0, 10); // rough range mod 1 ms
        writer.push_i(500, 14).push_i(-8192, 14); // phase range rates
        writer
    }

    fn push_signal_stripes(writer: &mut BitWriter, cells: usize) {
        let range_deltas = [1000i64, -1000, 0, -524_288];
        let phase_deltas = [2000i64, -8_388_608, 0, 0];
        let locks = [5u64, 6, 7, 8];
        let halves = [1u64, 0, 0, 0];
        let cnrs = [300u64, 301, 302, 303];
        let rate_deltas = [2500i64, -16_384, 0, 0];
        for &delta in range_deltas.iter().take(cells) {
            writer.push_i(delta, 20);
        }
        for &delta in phase_deltas.iter().take(cells) {
            writer.push_i(delta, 24);
        }
        for &lock in locks.iter().take(cells) {
            writer.push(lock, 10);
        }
        for &half in halves.iter().take(cells) {
            writer.push(half, 1);
        }
        for &cnr in cnrs.iter().take(cells) {
            writer.push(cnr, 10);
        }
        for &delta in rate_deltas.iter().take(cells) {
            writer.push_i(delta, 15);
        }
    }

    fn decode(frame: &[u8], kind: MsmKind) -> Result<Msm, DecodeError> {
        Msm::decode(
            frame,
            frame.len() * 8,
            match kind {
                MsmKind::Msm4 => 1074,
                MsmKind::Msm7 => 1077,
            },
            kind,
            Constellation::Gps,
            &mut resolver(),
        )
    }

    const L1_WAVELENGTH: f64 = SPEED_OF_LIGHT_TEST / 1.57542e9;
    const L2_WAVELENGTH: f64 = SPEED_OF_LIGHT_TEST / 1.22760e9;
    const SPEED_OF_LIGHT_TEST: f64 = 299_792_458.0;

    #[test]
    fn msm7_physical_quantities() {
        let mut writer = msm7_writer(0);
        push_signal_stripes(&mut writer, 4);
        let frame = writer.finish();
        let msm = decode(&frame, MsmKind::Msm7).unwrap();

        assert_eq!(msm.satellites.len(), 2);
        assert_eq!(msm.signals.len(), 4);
        assert_eq!(
            msm.satellites[0].range_whole_millis, Some(81)
        );
        assert_eq!(msm.satellites[1].range_whole_millis, None);
        assert_eq!(msm.satellites[1].phase_range_rate, None);

        // satellites ascend, signals ascend within each satellite
        let order: Vec<(u8, u8)> = msm
            .signals
            .iter()
            .map(|cell| (cell.satellite_id, cell.signal_id))
            .collect();
        assert_eq!(order, vec![(4, 2), (4, 15), (9, 2), (9, 15)]);

        let cell = &msm.signals[0];
        assert_eq!(cell.lock_time, 5);
        assert!(cell.half_cycle_ambiguity);
        assert_eq!(cell.cnr, 300);
        assert_approx_eq!(
            f64,
            msm.range_metres(cell).unwrap(),
            (81.5 + 1000.0 / SCALE_2_29) * 299_792.458,
            epsilon = 1e-4
        );
        assert_approx_eq!(
            f64,
            msm.phase_range_cycles(cell).unwrap(),
            (81.5 + 2000.0 / SCALE_2_31) * 299_792.458 / L1_WAVELENGTH,
            epsilon = 1e-3
        );
        assert_approx_eq!(f64, msm.phase_range_rate(cell).unwrap(), 500.25, epsilon = 1e-9);
        assert_approx_eq!(
            f64,
            msm.doppler_hz(cell).unwrap(),
            -500.25 / L1_WAVELENGTH,
            epsilon = 1e-6
        );

        // second cell: range delta negative, phase delta and rate delta
        // at their sentinels contribute nothing
        let cell = &msm.signals[1];
        assert_eq!(cell.phase_range_delta, None);
        assert_eq!(cell.phase_range_rate_delta, None);
        assert_approx_eq!(
            f64,
            msm.range_metres(cell).unwrap(),
            (81.5 - 1000.0 / SCALE_2_29) * 299_792.458,
            epsilon = 1e-4
        );
        assert_approx_eq!(
            f64,
            msm.phase_range_cycles(cell).unwrap(),
            81.5 * 299_792.458 / L2_WAVELENGTH,
            epsilon = 1e-3
        );
        assert_approx_eq!(f64, msm.phase_range_rate(cell).unwrap(), 500.0, epsilon = 1e-9);

        // satellite 9's rough range and rate are absent
        for cell in &msm.signals[2..] {
            assert_eq!(msm.range_metres(cell), None);
            assert_eq!(msm.phase_range_cycles(cell), None);
            assert_eq!(msm.phase_range_rate(cell), None);
            assert_eq!(msm.doppler_hz(cell), None);
        }
    }

    #[test]
    fn msm7_utc_timestamp() {
        let mut writer = msm7_writer(0);
        push_signal_stripes(&mut writer, 4);
        let frame = writer.finish();
        let msm = decode(&frame, MsmKind::Msm7).unwrap();
        // seeded on a Sunday: week starts 18 leap seconds early
        assert_eq!(
            msm.utc,
            Some(Utc.with_ymd_and_hms(2023, 5, 14, 0, 59, 42).unwrap())
        );
    }

    #[test]
    fn multiple_message_takes_what_fits() {
        let mut writer = msm7_writer(1);
        push_signal_stripes(&mut writer, 2);
        let frame = writer.finish();
        let msm = decode(&frame, MsmKind::Msm7).unwrap();
        assert_eq!(msm.header.cell_count(), 4);
        assert_eq!(msm.signals.len(), 2);
        assert_eq!(msm.signals[0].satellite_id, 4);
        assert_eq!(msm.signals[1].signal_id, 15);
    }

    #[test]
    fn multiple_message_strips_trailing_zero_cells() {
        let mut writer = msm7_writer(1);
        // three cells fit, but the third is all zeros: it reads as
        // padding and is stripped
        for &delta in &[1000i64, -1000, 0] {
            writer.push_i(delta, 20);
        }
        for &delta in &[2000i64, -8_388_608, 0] {
            writer.push_i(delta, 24);
        }
        for &lock in &[5u64, 6, 0] {
            writer.push(lock, 10);
        }
        for &half in &[1u64, 0, 0] {
            writer.push(half, 1);
        }
        for &cnr in &[300u64, 301, 0] {
            writer.push(cnr, 10);
        }
        for &delta in &[2500i64, -16_384, 0] {
            writer.push_i(delta, 15);
        }
        let frame = writer.finish();
        let msm = decode(&frame, MsmKind::Msm7).unwrap();
        assert_eq!(msm.signals.len(), 2);
    }

    #[test]
    fn complete_message_with_short_stripes_is_an_overrun() {
        let mut writer = msm7_writer(0);
        push_signal_stripes(&mut writer, 2);
        let frame = writer.finish();
        assert!(matches!(
            decode(&frame, MsmKind::Msm7),
            Err(DecodeError::Overrun { .. })
        ));
    }

    #[test]
    fn msm4_deltas_are_normalised() {
        let mut writer = BitWriter::new();
        writer
            .push(0xD3, 8)
            .push(0, 16)
            .push(1074, 12)
            .push(2, 12)
            .push(3_600_000, 30)
            .push(0, 1)
            .push(0, 3)
            .push(0, 7)
            .push(0, 2)
            .push(0, 2)
            .push(0, 1)
            .push(0, 3)
            .push(1 << 60, 64) // satellite 4 only
            .push(1 << 30, 32) // signal 2 only
            .push(1, 1);
        writer.push(81, 8).push(512, 10); // satellite stripes
        writer.push_i(40, 15); // range delta
        writer.push_i(-50, 22); // phase range delta
        writer.push(9, 4); // lock
        writer.push(0, 1);
        writer.push(40, 6); // CNR
        let frame = writer.finish();
        let msm = decode(&frame, MsmKind::Msm4).unwrap();
        assert_eq!(msm.signals.len(), 1);
        let cell = &msm.signals[0];
        assert_eq!(cell.range_delta, Some(40 << 5));
        assert_eq!(cell.phase_range_delta, Some(-50 << 2));
        assert_eq!(cell.phase_range_rate_delta, None);
        assert_eq!(msm.phase_range_rate(cell), None);
        assert_eq!(msm.doppler_hz(cell), None);
        assert_approx_eq!(
            f64,
            msm.range_metres(cell).unwrap(),
            (81.5 + f64::from(40 << 5) / SCALE_2_29) * 299_792.458,
            epsilon = 1e-4
        );
    }

    #[test]
    fn msm4_sentinels_decode_to_none() {
        let mut writer = BitWriter::new();
        writer
            .push(0xD3, 8)
            .push(0, 16)
            .push(1074, 12)
            .push(2, 12)
            .push(1000, 30)
            .push(0, 1)
            .push(0, 3)
            .push(0, 7)
            .push(0, 2)
            .push(0, 2)
            .push(0, 1)
            .push(0, 3)
            .push(1 << 60, 64)
            .push(1 << 30, 32)
            .push(1, 1);
        writer.push(81, 8).push(0, 10);
        writer.push_i(-16_384, 15); // range delta sentinel
        writer.push_i(-2_097_152, 22); // phase delta sentinel
        writer.push(0, 4).push(0, 1).push(0, 6);
        let frame = writer.finish();
        let msm = decode(&frame, MsmKind::Msm4).unwrap();
        let cell = &msm.signals[0];
        assert_eq!(cell.range_delta, None);
        assert_eq!(cell.phase_range_delta, None);
        // sentinel deltas contribute zero, the rough range survives
        assert_approx_eq!(
            f64,
            msm.range_metres(cell).unwrap(),
            81.0 * 299_792.458,
            epsilon = 1e-4
        );
    }
}
