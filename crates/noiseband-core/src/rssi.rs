//! Raw RSSI units
//!
//! The transceiver reports RSSI as an unsigned byte in half-dB steps. Two raw
//! units equal 1 dB, and raw 0 sits at -134 dBm.

/// Offset between raw units and dBm once the half-dB scale is removed.
pub const RSSI_DBM_OFFSET: f32 = 134.0;

/// Readings are clipped to this floor after gain compensation (-129 dBm).
pub const MINIMUM_RSSI: u8 = 10;

/// Marker for a reading the hardware could not vouch for.
pub const INVALID_RSSI: u8 = 0xFF;

/// Convert a raw reading (or any value on the raw scale) to dBm.
pub fn raw_to_dbm(raw: f32) -> f32 {
    raw / 2.0 - RSSI_DBM_OFFSET
}

/// Convert dBm back to the raw half-dB scale.
pub fn dbm_to_raw(dbm: f32) -> f32 {
    (dbm + RSSI_DBM_OFFSET) * 2.0
}

/// Apply the front end gain to every reading, clipping to the valid range.
///
/// Sample sources call this on each acquired buffer before handing it to the
/// statistics engine.
pub fn compensate_front_end_gain(samples: &mut [u8], gain: i8) {
    for sample in samples.iter_mut() {
        let adjusted = i16::from(*sample) + i16::from(gain);
        *sample = adjusted.clamp(i16::from(MINIMUM_RSSI), 255) as u8;
    }
}
