//! Survey configuration
//!
//! Limits, timing overheads and the capacitor power budget for the reference
//! endpoint. The whole structure is serde-serializable so it can be kept in the
//! mode-configuration partition with postcard.

use alloc::vec::Vec;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct SurveyConfig {
    pub radio: RadioLimits,
    pub timing: SurveyTiming,
    pub power: PowerBudget,
}

impl SurveyConfig {
    /// Decode a configuration stored with [`SurveyConfig::to_vec`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    /// Encode the configuration for persistent storage.
    pub fn to_vec(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }
}

/// Bounds a survey request is validated against.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioLimits {
    /// Number of receivers fitted (1 on an endpoint, 9 on a collector)
    pub radio_count: u8,
    /// First channel number that is not a real channel (450 MHz band: 3201)
    pub invalid_channel: u16,
    /// Largest sweep the result table may hold
    pub max_channels: u16,
    /// Largest number of samples per channel
    pub max_samples: u16,
    /// Longest post-trigger wait in seconds
    pub max_wait_secs: u16,
}

impl Default for RadioLimits {
    fn default() -> Self {
        Self {
            radio_count: 1,
            invalid_channel: 3201,
            max_channels: 1601,
            max_samples: 20_000,
            max_wait_secs: 600,
        }
    }
}

/// Fixed costs used to estimate how long a survey takes.
///
/// Per-sample costs are in nanoseconds because they are multiplied by up to
/// 20000 samples; everything else is in micro- or milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyTiming {
    /// RSSI settling time before the first reading (4 symbols at 4800 baud)
    pub settle_us: u32,
    /// Locking and releasing the PHY around one channel
    pub lock_unlock_us: u32,
    /// Sorting cost per sample
    pub sort_ns_per_sample: u32,
    /// Linear-domain average and spread cost per sample
    pub statistics_ns_per_sample: u32,
    /// Building and storing one channel summary
    pub tabulate_us: u32,
    /// Voluntary sleep after every channel
    pub channel_yield_ms: u32,
    /// Time the boost converter needs before the rail is usable
    pub boost_switch_us: u32,
    /// Pause inserted to let the capacitor recharge during boosted surveys
    pub recovery_pause_ms: u32,
    /// Poll increment while waiting for the capacitor to charge
    pub wait_poll_ms: u32,
}

impl Default for SurveyTiming {
    fn default() -> Self {
        Self {
            settle_us: 1_000,
            lock_unlock_us: 500,
            sort_ns_per_sample: 400,
            statistics_ns_per_sample: 2_500,
            tabulate_us: 200,
            channel_yield_ms: 5,
            boost_switch_us: 5_000,
            recovery_pause_ms: 10_000,
            wait_poll_ms: 100,
        }
    }
}

impl SurveyTiming {
    pub fn channel_yield(&self) -> Duration {
        Duration::from_millis(u64::from(self.channel_yield_ms))
    }

    pub fn recovery_pause(&self) -> Duration {
        Duration::from_millis(u64::from(self.recovery_pause_ms))
    }

    pub fn wait_poll(&self) -> Duration {
        Duration::from_millis(u64::from(self.wait_poll_ms))
    }
}

/// Capacitor limits for boosted surveys.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PowerBudget {
    /// Capacitor voltage below which boosted sampling must not start
    pub boost_min_voltage: f32,
    /// Supercapacitor minimum; the radio resets if boost drains it further
    pub brown_out_voltage: f32,
    /// Boost-on time the capacitor sustains before it needs a recovery pause
    pub boost_energy_budget_us: u64,
}

impl Default for PowerBudget {
    fn default() -> Self {
        Self {
            boost_min_voltage: 2.3,
            brown_out_voltage: 2.1,
            boost_energy_budget_us: 3_000_000,
        }
    }
}
