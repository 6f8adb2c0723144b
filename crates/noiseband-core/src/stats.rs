//! Statistics engine
//!
//! Reduces one channel's raw RSSI readings to order statistics, a power
//! average and a spread. Readings are logarithmic in half-dB steps, so the
//! average is taken over linear power (`10^(s/20)`) and converted back, while
//! the spread is a standard-deviation analogue in dB around that average.

use crate::math;

/// Percentiles reported per channel, as fractions in thousandths.
pub const PERCENTILES_PER_MILLE: [u32; 5] = [900, 950, 990, 995, 999];

/// Upper tail of a channel's readings, in raw units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Percentiles {
    pub p90: u8,
    pub p95: u8,
    pub p99: u8,
    pub p995: u8,
    pub p999: u8,
}

impl Percentiles {
    pub fn as_array(&self) -> [u8; 5] {
        [self.p90, self.p95, self.p99, self.p995, self.p999]
    }
}

/// Full-precision reduction of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelStats {
    pub min: u8,
    pub median: u8,
    pub max: u8,
    /// Power average on the raw half-dB scale
    pub average: f32,
    /// Spread around the average in dB
    pub spread: f32,
    pub percentiles: Percentiles,
}

/// Value at `floor((n - 1) * fraction)` of a sorted slice, no interpolation.
fn percentile(sorted: &[u8], per_mille: u32) -> u8 {
    let last = sorted.len() - 1;
    sorted[last * per_mille as usize / 1000]
}

/// Sort the readings in place and reduce them.
///
/// Returns `None` for an empty slice.
pub fn reduce(samples: &mut [u8]) -> Option<ChannelStats> {
    samples.sort_unstable();
    reduce_sorted(samples)
}

/// Reduce readings already sorted in ascending order.
pub fn reduce_sorted(sorted: &[u8]) -> Option<ChannelStats> {
    let (&min, &max) = (sorted.first()?, sorted.last()?);
    let n = sorted.len() as f32;

    let power_sum: f32 = sorted
        .iter()
        .map(|&s| math::exp10(f32::from(s) / 20.0))
        .sum();
    let average = 20.0 * math::log10(power_sum / n);

    // Halve each deviation to go from half-dB steps to dB.
    let square_sum: f32 = sorted
        .iter()
        .map(|&s| {
            let d = (average - f32::from(s)) / 2.0;
            d * d
        })
        .sum();
    let spread = math::sqrt(square_sum / n);

    let [p90, p95, p99, p995, p999] = PERCENTILES_PER_MILLE.map(|f| percentile(sorted, f));

    Some(ChannelStats {
        min,
        median: sorted[(sorted.len() - 1) / 2],
        max,
        average,
        spread,
        percentiles: Percentiles {
            p90,
            p95,
            p99,
            p995,
            p999,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn closed_form(samples: &[u8]) -> (f64, f64) {
        let n = samples.len() as f64;
        let power: f64 = samples
            .iter()
            .map(|&s| libm::pow(10.0, s as f64 / 20.0))
            .sum();
        let avg = 20.0 * libm::log10(power / n);
        let sq: f64 = samples
            .iter()
            .map(|&s| {
                let d = (avg - s as f64) / 2.0;
                d * d
            })
            .sum();
        (avg, libm::sqrt(sq / n))
    }

    #[test]
    fn test_reference_sequence() {
        let mut samples = [40, 20, 10, 30, 20];
        let stats = reduce(&mut samples).unwrap();

        assert_eq!(samples, [10, 20, 20, 30, 40]);
        assert_eq!(stats.min, 10);
        assert_eq!(stats.median, 20);
        assert_eq!(stats.max, 40);

        let (avg, spread) = closed_form(&samples);
        assert!(libm::fabs(stats.average as f64 - avg) < 1e-3, "{} vs {}", stats.average, avg);
        assert!(libm::fabs(stats.spread as f64 - spread) < 1e-3, "{} vs {}", stats.spread, spread);
        // Power averaging is pulled toward the loudest reading.
        assert!(stats.average > 24.0);
    }

    #[test]
    fn test_percentile_index_on_long_slice() {
        // (n - 1) * 999 no longer fits in a u32 here.
        let mut sorted = alloc::vec![0u8; 5_000_001];
        sorted[4_995_000..].fill(1);
        assert_eq!(percentile(&sorted, 999), 1);
        assert_eq!(percentile(&sorted, 995), 0);
        assert_eq!(percentile(&sorted, 1000), 1);
    }

    #[test]
    fn test_single_sample() {
        let stats = reduce(&mut [77]).unwrap();
        assert_eq!(stats.min, 77);
        assert_eq!(stats.median, 77);
        assert_eq!(stats.max, 77);
        assert_eq!(stats.percentiles.as_array(), [77; 5]);
        assert!(libm::fabsf(stats.average - 77.0) < 1e-3);
        assert!(stats.spread < 1e-3);
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(reduce(&mut []), None);
    }

    #[test]
    fn test_even_length_takes_lower_middle() {
        let stats = reduce(&mut [1, 2, 3, 4]).unwrap();
        assert_eq!(stats.median, 2);
    }

    #[test]
    fn test_percentile_indices() {
        let mut samples: Vec<u8> = (0..=200).collect();
        let stats = reduce(&mut samples).unwrap();
        // floor(200 * f)
        assert_eq!(stats.percentiles.as_array(), [180, 190, 198, 199, 199]);
    }

    #[test]
    fn test_percentiles_monotonic() {
        let mut seed = 0x2545_f491u32;
        for len in [1usize, 2, 7, 100, 1000, 20_000] {
            let mut samples: Vec<u8> = (0..len)
                .map(|_| {
                    seed ^= seed << 13;
                    seed ^= seed >> 17;
                    seed ^= seed << 5;
                    (seed % 120) as u8 + 10
                })
                .collect();
            let stats = reduce(&mut samples).unwrap();
            let p = stats.percentiles.as_array();
            assert!(p.windows(2).all(|w| w[0] <= w[1]), "{p:?}");
            assert!(p[4] <= stats.max);
            assert!(stats.min <= stats.median && stats.median <= stats.max);
        }
    }
}
