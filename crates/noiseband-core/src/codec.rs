//! Single-byte quantization of the channel average and spread
//!
//! Both codecs are lossy but invertible to within one quantization step, which
//! keeps a channel summary at 10 bytes across a 1601 channel sweep.
//!
//! - The average is scaled linearly into the channel's own `[min, max]` range,
//!   so its resolution is `(max - min) / 256` raw units.
//! - The spread is compressed logarithmically with `log10(1 + K * spread)`,
//!   independent of the channel range, giving fine resolution near zero.

use crate::math;

/// Spread scale constant `K`
pub const SPREAD_SCALE: f32 = 3.0;

/// Average codec levels across `[min, max]`
const AVERAGE_LEVELS: f32 = 256.0;

/// Spread codec levels per decade of `1 + K * spread`
const SPREAD_LEVELS_PER_DECADE: f32 = 100.0;

fn saturate(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// Encode a raw-unit average relative to the channel range.
///
/// A channel that only ever showed one level encodes as 0.
pub fn encode_average(average: f32, min: u8, max: u8) -> u8 {
    if min >= max {
        return 0;
    }
    let range = f32::from(max - min);
    saturate(math::round((average - f32::from(min)) / range * AVERAGE_LEVELS))
}

/// Decode an average byte back to raw units, never above `max`.
pub fn decode_average(byte: u8, min: u8, max: u8) -> f32 {
    if min >= max {
        return f32::from(min);
    }
    let range = f32::from(max - min);
    let average = f32::from(min) + f32::from(byte) / AVERAGE_LEVELS * range;
    average.min(f32::from(max))
}

/// Encode a spread in dB.
pub fn encode_spread(spread: f32) -> u8 {
    let spread = spread.max(0.0);
    saturate(math::round(
        math::log10(1.0 + spread * SPREAD_SCALE) * SPREAD_LEVELS_PER_DECADE,
    ))
}

/// Decode a spread byte back to dB.
pub fn decode_spread(byte: u8) -> f32 {
    spread_level(f32::from(byte))
}

/// Spread represented by a (possibly fractional) codec level.
fn spread_level(level: f32) -> f32 {
    (math::exp10(level / SPREAD_LEVELS_PER_DECADE) - 1.0) / SPREAD_SCALE
}

/// Largest spread the codec represents without saturating.
pub fn max_spread() -> f32 {
    decode_spread(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-4;

    #[test]
    fn test_average_round_trip_within_one_step() {
        for (min, max) in [(10u8, 40u8), (10, 11), (0, 255), (57, 130)] {
            let step = f32::from(max - min) / 256.0;
            for i in 0..=1000 {
                let average = f32::from(min) + f32::from(max - min) * i as f32 / 1000.0;
                let decoded = decode_average(encode_average(average, min, max), min, max);
                assert!(
                    libm::fabsf(decoded - average) <= step + TOLERANCE,
                    "min={min} max={max} avg={average} decoded={decoded}"
                );
                assert!(decoded <= f32::from(max));
            }
        }
    }

    #[test]
    fn test_average_at_ceiling_saturates() {
        assert_eq!(encode_average(40.0, 10, 40), 255);
        assert!(decode_average(255, 10, 40) < 40.0);
        assert_eq!(encode_average(10.0, 10, 40), 0);
        assert_eq!(decode_average(0, 10, 40), 10.0);
    }

    #[test]
    fn test_degenerate_channel() {
        assert_eq!(encode_average(42.0, 42, 42), 0);
        assert_eq!(encode_average(50.0, 42, 42), 0);
        assert_eq!(decode_average(0, 42, 42), 42.0);
        assert_eq!(decode_average(200, 42, 42), 42.0);
    }

    #[test]
    fn test_spread_round_trip_within_one_step() {
        let mut spread = 0.0f32;
        while spread < max_spread() - 1.0 {
            let byte = encode_spread(spread);
            let step = spread_level(f32::from(byte) + 1.0) - decode_spread(byte);
            let decoded = decode_spread(byte);
            assert!(
                libm::fabsf(decoded - spread) <= step + TOLERANCE,
                "spread={spread} byte={byte} decoded={decoded}"
            );
            spread += 0.05;
        }
    }

    #[test]
    fn test_spread_codec_is_monotonic() {
        for byte in 0..u8::MAX {
            assert!(decode_spread(byte + 1) > decode_spread(byte));
        }
        let mut previous = 0;
        for tenth in 0..1000 {
            let byte = encode_spread(tenth as f32 / 10.0);
            assert!(byte >= previous);
            previous = byte;
        }
    }

    #[test]
    fn test_spread_reference_points() {
        assert_eq!(encode_spread(0.0), 0);
        assert_eq!(decode_spread(0), 0.0);
        assert_eq!(encode_spread(-1.0), 0);
        // log10(1 + 3 * 3) * 100 = 100
        assert_eq!(encode_spread(3.0), 100);
        assert!(libm::fabsf(decode_spread(100) - 3.0) < TOLERANCE);
        assert_eq!(encode_spread(10_000.0), 255);
        assert!(max_spread() > 100.0);
    }
}
