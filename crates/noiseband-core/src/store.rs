//! Result store
//!
//! One [`ChannelSummary`] per surveyed channel, indexed by position in the
//! sweep. The table is owned by whoever holds the [`ResultStore`]; a new
//! survey builds a fresh one.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::request::SweepPlan;
use crate::rssi;
use crate::source::PinProfile;
use crate::stats::{ChannelStats, Percentiles};

/// Compressed statistics of one channel, all in raw RSSI units except the
/// two quantized bytes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSummary {
    pub min: u8,
    pub median: u8,
    pub max: u8,
    /// Average, quantized against `[min, max]`
    pub average: u8,
    /// Spread, log-quantized
    pub spread: u8,
    pub p90: u8,
    pub p95: u8,
    pub p99: u8,
    pub p995: u8,
    pub p999: u8,
}

impl ChannelSummary {
    /// Packed size in bytes.
    pub const SIZE: usize = 10;

    pub fn from_stats(stats: &ChannelStats) -> Self {
        let Percentiles {
            p90,
            p95,
            p99,
            p995,
            p999,
        } = stats.percentiles;
        Self {
            min: stats.min,
            median: stats.median,
            max: stats.max,
            average: codec::encode_average(stats.average, stats.min, stats.max),
            spread: codec::encode_spread(stats.spread),
            p90,
            p95,
            p99,
            p995,
            p999,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [
            self.min,
            self.median,
            self.max,
            self.average,
            self.spread,
            self.p90,
            self.p95,
            self.p99,
            self.p995,
            self.p999,
        ]
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        let [min, median, max, average, spread, p90, p95, p99, p995, p999] = bytes;
        Self {
            min,
            median,
            max,
            average,
            spread,
            p90,
            p95,
            p99,
            p995,
            p999,
        }
    }

    pub fn percentiles(&self) -> Percentiles {
        Percentiles {
            p90: self.p90,
            p95: self.p95,
            p99: self.p99,
            p995: self.p995,
            p999: self.p999,
        }
    }

    /// Decoded average in raw units.
    pub fn average_raw(&self) -> f32 {
        codec::decode_average(self.average, self.min, self.max)
    }

    /// Decoded spread in dB.
    pub fn spread_db(&self) -> f32 {
        codec::decode_spread(self.spread)
    }

    pub fn min_dbm(&self) -> f32 {
        rssi::raw_to_dbm(f32::from(self.min))
    }

    pub fn median_dbm(&self) -> f32 {
        rssi::raw_to_dbm(f32::from(self.median))
    }

    pub fn max_dbm(&self) -> f32 {
        rssi::raw_to_dbm(f32::from(self.max))
    }

    pub fn average_dbm(&self) -> f32 {
        rssi::raw_to_dbm(self.average_raw())
    }

    pub fn percentiles_dbm(&self) -> [f32; 5] {
        self.percentiles()
            .as_array()
            .map(|p| rssi::raw_to_dbm(f32::from(p)))
    }
}

/// Summaries of one completed survey.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultStore {
    plan: SweepPlan,
    summaries: Vec<ChannelSummary>,
    lowest_capacitor_voltage: Option<f32>,
    previous_pins: Option<PinProfile>,
}

impl ResultStore {
    /// Wrap a table that has already been reserved for the whole sweep.
    pub(crate) fn new(plan: SweepPlan, summaries: Vec<ChannelSummary>) -> Self {
        Self {
            plan,
            summaries,
            lowest_capacitor_voltage: None,
            previous_pins: None,
        }
    }

    /// Append the next channel. The table never grows past its reservation.
    pub(crate) fn push(&mut self, summary: ChannelSummary) {
        debug_assert!(self.summaries.len() < usize::from(self.plan.channel_count));
        self.summaries.push(summary);
    }

    pub(crate) fn record_voltage(&mut self, voltage: f32) {
        self.lowest_capacitor_voltage = Some(match self.lowest_capacitor_voltage {
            Some(lowest) => lowest.min(voltage),
            None => voltage,
        });
    }

    pub(crate) fn set_previous_pins(&mut self, pins: PinProfile) {
        self.previous_pins = Some(pins);
    }

    pub fn plan(&self) -> &SweepPlan {
        &self.plan
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChannelSummary> {
        self.summaries.get(index)
    }

    /// `(channel number, summary)` pairs in sweep order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &ChannelSummary)> + '_ {
        self.summaries
            .iter()
            .enumerate()
            .map(|(i, summary)| (self.plan.channel_at(i), summary))
    }

    /// Lowest capacitor voltage seen by any boosted acquisition.
    pub fn lowest_capacitor_voltage(&self) -> Option<f32> {
        self.lowest_capacitor_voltage
    }

    /// Pin setting that was active before the survey applied its own.
    pub fn previous_pins(&self) -> Option<PinProfile> {
        self.previous_pins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RadioLimits;
    use crate::request::{PowerMode, SurveyRequest};
    use crate::stats;

    fn summary_of(samples: &mut [u8]) -> ChannelSummary {
        ChannelSummary::from_stats(&stats::reduce(samples).unwrap())
    }

    #[test]
    fn test_packs_to_ten_bytes() {
        let summary = summary_of(&mut [40, 20, 10, 30, 20]);
        let bytes = summary.to_bytes();
        assert_eq!(bytes.len(), ChannelSummary::SIZE);
        assert_eq!(&bytes[..3], &[10, 20, 40]);
        assert_eq!(ChannelSummary::from_bytes(bytes), summary);

        let wire = postcard::to_allocvec(&summary).unwrap();
        assert_eq!(wire.len(), ChannelSummary::SIZE);
        assert_eq!(wire, bytes);
        assert_eq!(postcard::from_bytes::<ChannelSummary>(&wire).unwrap(), summary);
    }

    #[test]
    fn test_decoded_values_stay_in_range() {
        let summary = summary_of(&mut [40, 20, 10, 30, 20]);
        let average = summary.average_raw();
        assert!((10.0..=40.0).contains(&average));
        assert!(summary.spread_db() > 0.0);
    }

    #[test]
    fn test_dbm_accessors() {
        let summary = summary_of(&mut [10, 10, 10]);
        assert_eq!(summary.min_dbm(), -129.0);
        assert_eq!(summary.max_dbm(), -129.0);
        assert_eq!(summary.average_dbm(), -129.0);
        assert_eq!(summary.percentiles_dbm(), [-129.0; 5]);
    }

    #[test]
    fn test_store_indexes_by_sweep_position() {
        let plan = SurveyRequest {
            radio: 0,
            wait_secs: 0,
            samples: 4,
            sampling_rate_us: 100,
            first_channel: 100,
            last_channel: 104,
            step: 2,
            power_mode: PowerMode::Normal,
            pins: None,
        }
        .validate(&RadioLimits::default())
        .unwrap();

        let mut store = ResultStore::new(plan, Vec::with_capacity(3));
        assert!(store.is_empty());
        for level in [20u8, 30, 40] {
            store.push(summary_of(&mut [level; 4]));
        }
        store.record_voltage(2.8);
        store.record_voltage(2.6);
        store.record_voltage(2.7);

        let channels: Vec<u16> = store.iter().map(|(channel, _)| channel).collect();
        assert_eq!(channels, [100, 102, 104]);
        assert_eq!(store.get(2).unwrap().max, 40);
        assert_eq!(store.lowest_capacitor_voltage(), Some(2.6));
        assert_eq!(store.previous_pins(), None);
    }
}
