/*
Carrier frequencies for the signals an MSM can report, keyed on the
constellation and the 1-based signal ID from the MSM signal mask.
Signal IDs the protocol leaves reserved map to 0.0; callers treat a
zero wavelength as the cue to skip cycle and Doppler computations.
*/
use super::Constellation;

/// Speed of light in m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Metres light travels in one millisecond. Ranges arrive as transit
/// times in milliseconds.
pub const RANGE_MILLISECOND: f64 = SPEED_OF_LIGHT * 1.0e-3;

const FREQ_L1: f64 = 1.57542e9; /* L1/E1/B1C */
const FREQ_L2: f64 = 1.22760e9; /* L2 */
const FREQ_L5: f64 = 1.17645e9; /* L5/E5a/B2a */
const FREQ_E6: f64 = 1.27875e9; /* E6/L6 */
const FREQ_E5B: f64 = 1.20714e9; /* E5b/B2I/B2b */
const FREQ_E5AB: f64 = 1.191795e9; /* E5a+b */
const FREQ_G1: f64 = 1.60200e9; /* GLONASS G1 base */
const FREQ_G2: f64 = 1.24600e9; /* GLONASS G2 base */
const FREQ_B1: f64 = 1.561098e9; /* Beidou B1I */
const FREQ_B3: f64 = 1.26852e9; /* Beidou B3 */

fn gps(signal_id: u8) -> f64 {
    match signal_id {
        2..=4 | 30..=32 => FREQ_L1,
        8..=10 | 15..=17 => FREQ_L2,
        22..=24 => FREQ_L5,
        _ => 0.0,
    }
}

fn glonass(signal_id: u8) -> f64 {
    match signal_id {
        2 | 3 => FREQ_G1,
        8 | 9 => FREQ_G2,
        _ => 0.0,
    }
}

fn galileo(signal_id: u8) -> f64 {
    match signal_id {
        2..=6 => FREQ_L1,
        8..=12 => FREQ_E6,
        14..=16 => FREQ_E5B,
        18..=20 => FREQ_E5AB,
        22..=24 => FREQ_L5,
        _ => 0.0,
    }
}

fn sbas(signal_id: u8) -> f64 {
    match signal_id {
        2 => FREQ_L1,
        22..=24 => FREQ_L5,
        _ => 0.0,
    }
}

fn qzss(signal_id: u8) -> f64 {
    match signal_id {
        2 | 30..=32 => FREQ_L1,
        9..=11 => FREQ_E6,
        15..=17 => FREQ_L2,
        22..=24 => FREQ_L5,
        _ => 0.0,
    }
}

fn beidou(signal_id: u8) -> f64 {
    match signal_id {
        2..=4 => FREQ_B1,
        8..=10 => FREQ_B3,
        14..=16 | 25 => FREQ_E5B,
        22..=24 => FREQ_L5,
        30..=32 => FREQ_L1,
        _ => 0.0,
    }
}

fn navic(signal_id: u8) -> f64 {
    match signal_id {
        22..=24 => FREQ_L5,
        _ => 0.0,
    }
}

/// Carrier frequency in Hz, or 0.0 for signal IDs the protocol does
/// not map for the constellation.
pub fn carrier_frequency(constellation: Constellation, signal_id: u8) -> f64 {
    match constellation {
        Constellation::Gps => gps(signal_id),
        Constellation::Glonass => glonass(signal_id),
        Constellation::Galileo => galileo(signal_id),
        Constellation::Sbas => sbas(signal_id),
        Constellation::Qzss => qzss(signal_id),
        Constellation::Beidou => beidou(signal_id),
        Constellation::NavIc => navic(signal_id),
    }
}

/// Carrier wavelength in metres; 0.0 propagates from unmapped signals.
pub fn wavelength(constellation: Constellation, signal_id: u8) -> f64 {
    let frequency = carrier_frequency(constellation, signal_id);
    if frequency == 0.0 {
        0.0
    } else {
        SPEED_OF_LIGHT / frequency
    }
}
