//! Survey requests and their validation
//!
//! A [`SurveyRequest`] is what the operator typed. [`SurveyRequest::validate`]
//! applies the coercions (zero samples becomes one, step is raised to two) and
//! the range checks, and yields a [`SweepPlan`] the controller can execute
//! without further checks.

use core::fmt::{self, Display};

use embassy_time::Duration;
use thiserror_no_std::Error;

use crate::config::RadioLimits;
use crate::source::PinProfile;

/// Smallest channel step a sweep may use
pub const MIN_CHANNEL_STEP: u16 = 2;

/// How the radio is powered while sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerMode {
    /// Steady-state regulator only
    #[default]
    Normal,
    /// Boost, refusing to start when the capacitor is below threshold
    BoostAbortIfLow,
    /// Boost regardless of the capacitor voltage
    BoostIgnore,
    /// Boost, waiting for the capacitor to charge to threshold first
    BoostWaitForThreshold,
}

impl PowerMode {
    /// Map the console's `boost` argument to a mode.
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(Self::Normal),
            1 => Some(Self::BoostAbortIfLow),
            2 => Some(Self::BoostIgnore),
            3 => Some(Self::BoostWaitForThreshold),
            _ => None,
        }
    }

    pub const fn selector(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::BoostAbortIfLow => 1,
            Self::BoostIgnore => 2,
            Self::BoostWaitForThreshold => 3,
        }
    }

    pub const fn is_boost(self) -> bool {
        !matches!(self, Self::Normal)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::BoostAbortIfLow => "boost-abort-if-low",
            Self::BoostIgnore => "boost-ignore",
            Self::BoostWaitForThreshold => "boost-wait",
        }
    }
}

/// Raw survey parameters as entered on the console.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurveyRequest {
    pub radio: u8,
    pub wait_secs: u16,
    pub samples: u16,
    /// Requested microseconds between samples
    pub sampling_rate_us: u16,
    pub first_channel: u16,
    pub last_channel: u16,
    pub step: u16,
    pub power_mode: PowerMode,
    /// Port pin setting to apply before the sweep
    pub pins: Option<PinProfile>,
}

/// Reasons a request is rejected before anything is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("radio {radio} out of range (radios: {count})")]
    RadioOutOfRange { radio: u8, count: u8 },
    #[error("wait of {secs} s exceeds {max} s")]
    WaitTooLong { secs: u16, max: u16 },
    #[error("{samples} samples exceeds {max}")]
    TooManySamples { samples: u16, max: u16 },
    #[error("channel {channel} must be below {invalid}")]
    ChannelOutOfRange { channel: u16, invalid: u16 },
    #[error("end channel {last} is below start channel {first}")]
    ReversedSweep { first: u16, last: u16 },
    #[error("sweep covers {channels} channels, at most {max} allowed")]
    TooManyChannels { channels: u32, max: u16 },
    #[error("expected {expected} arguments, got {given}")]
    WrongArgumentCount { given: usize, expected: &'static str },
    #[error("argument '{name}' is not a valid number")]
    Malformed { name: &'static str },
    #[error("boost selector {selector} is not a known power mode")]
    UnknownPowerMode { selector: u8 },
}

/// A validated request, ready to execute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPlan {
    pub radio: u8,
    pub wait: Duration,
    pub samples: u16,
    pub sampling_rate_us: u16,
    pub first_channel: u16,
    pub last_channel: u16,
    pub step: u16,
    pub channel_count: u16,
    pub power_mode: PowerMode,
    pub pins: Option<PinProfile>,
}

/// Number of channels visited by a sweep, `floor((last - first) / step) + 1`.
pub fn channel_count(first: u16, last: u16, step: u16) -> u32 {
    u32::from(last.saturating_sub(first)) / u32::from(step.max(1)) + 1
}

impl SurveyRequest {
    /// Check the request against the radio limits.
    ///
    /// Nothing is allocated and no hardware is touched here, so a rejected
    /// request leaves the system exactly as it was.
    pub fn validate(&self, limits: &RadioLimits) -> Result<SweepPlan, ArgumentError> {
        if self.radio >= limits.radio_count {
            return Err(ArgumentError::RadioOutOfRange {
                radio: self.radio,
                count: limits.radio_count,
            });
        }
        if self.wait_secs > limits.max_wait_secs {
            return Err(ArgumentError::WaitTooLong {
                secs: self.wait_secs,
                max: limits.max_wait_secs,
            });
        }
        let samples = self.samples.max(1);
        if samples > limits.max_samples {
            return Err(ArgumentError::TooManySamples {
                samples,
                max: limits.max_samples,
            });
        }
        for channel in [self.first_channel, self.last_channel] {
            if channel >= limits.invalid_channel {
                return Err(ArgumentError::ChannelOutOfRange {
                    channel,
                    invalid: limits.invalid_channel,
                });
            }
        }
        if self.last_channel < self.first_channel {
            return Err(ArgumentError::ReversedSweep {
                first: self.first_channel,
                last: self.last_channel,
            });
        }

        let step = self.step.max(MIN_CHANNEL_STEP);
        let channels = channel_count(self.first_channel, self.last_channel, step);
        if channels > u32::from(limits.max_channels) {
            return Err(ArgumentError::TooManyChannels {
                channels,
                max: limits.max_channels,
            });
        }

        Ok(SweepPlan {
            radio: self.radio,
            wait: Duration::from_secs(u64::from(self.wait_secs)),
            samples,
            sampling_rate_us: self.sampling_rate_us,
            first_channel: self.first_channel,
            last_channel: self.last_channel,
            step,
            channel_count: channels as u16,
            power_mode: self.power_mode,
            pins: self.pins,
        })
    }
}

impl SweepPlan {
    /// Channel number at a position in the sweep.
    pub fn channel_at(&self, index: usize) -> u16 {
        self.first_channel + self.step * index as u16
    }

    /// Channels in sweep order.
    pub fn channels(&self) -> impl Iterator<Item = u16> + '_ {
        (0..usize::from(self.channel_count)).map(|i| self.channel_at(i))
    }
}

impl Display for SweepPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "radio={}, sampling={}, samples={}, start={}, end={}, step={}, channels={}, boost={}",
            self.radio,
            self.sampling_rate_us,
            self.samples,
            self.first_channel,
            self.last_channel,
            self.step,
            self.channel_count,
            self.power_mode.label()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(first: u16, last: u16, step: u16) -> SurveyRequest {
        SurveyRequest {
            radio: 0,
            wait_secs: 0,
            samples: 100,
            sampling_rate_us: 100,
            first_channel: first,
            last_channel: last,
            step,
            power_mode: PowerMode::Normal,
            pins: None,
        }
    }

    #[test]
    fn test_channel_count_formula() {
        let limits = RadioLimits::default();
        let plan = request(0, 3200, 2).validate(&limits).unwrap();
        assert_eq!(plan.channel_count, 1601);

        let plan = request(100, 109, 3).validate(&limits).unwrap();
        assert_eq!(plan.channel_count, 4);
        assert_eq!(plan.channels().collect::<alloc::vec::Vec<_>>(), [100, 103, 106, 109]);

        let plan = request(7, 7, 2).validate(&limits).unwrap();
        assert_eq!(plan.channel_count, 1);
    }

    #[test]
    fn test_sweep_beyond_table_rejected() {
        let limits = RadioLimits {
            invalid_channel: 6561,
            ..RadioLimits::default()
        };
        let err = request(0, 3202, 2).validate(&limits).unwrap_err();
        assert_eq!(
            err,
            ArgumentError::TooManyChannels {
                channels: 1602,
                max: 1601
            }
        );
    }

    #[test]
    fn test_coercions() {
        let limits = RadioLimits::default();
        let mut req = request(10, 20, 0);
        req.samples = 0;
        let plan = req.validate(&limits).unwrap();
        assert_eq!(plan.samples, 1);
        assert_eq!(plan.step, MIN_CHANNEL_STEP);
        assert_eq!(plan.channel_count, 6);
    }

    #[test]
    fn test_rejections() {
        let limits = RadioLimits::default();

        let mut req = request(0, 10, 2);
        req.radio = 1;
        assert!(matches!(
            req.validate(&limits),
            Err(ArgumentError::RadioOutOfRange { radio: 1, count: 1 })
        ));

        let mut req = request(0, 10, 2);
        req.wait_secs = 601;
        assert!(matches!(
            req.validate(&limits),
            Err(ArgumentError::WaitTooLong { .. })
        ));

        let mut req = request(0, 10, 2);
        req.samples = 20_001;
        assert!(matches!(
            req.validate(&limits),
            Err(ArgumentError::TooManySamples { .. })
        ));

        assert!(matches!(
            request(0, 3201, 2).validate(&limits),
            Err(ArgumentError::ChannelOutOfRange { channel: 3201, .. })
        ));
        assert!(matches!(
            request(20, 10, 2).validate(&limits),
            Err(ArgumentError::ReversedSweep { first: 20, last: 10 })
        ));
    }

    #[test]
    fn test_power_mode_selector() {
        for selector in 0..=3 {
            let mode = PowerMode::from_selector(selector).unwrap();
            assert_eq!(mode.selector(), selector);
        }
        assert_eq!(PowerMode::from_selector(4), None);
        assert!(!PowerMode::Normal.is_boost());
        assert!(PowerMode::BoostIgnore.is_boost());
    }
}
