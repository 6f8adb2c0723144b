//! Hardware collaborators of the survey
//!
//! The survey never programs the radio, reads the ADC or walks the heap
//! itself. It reaches those through the traits below, implemented by the
//! firmware HAL on the endpoint and by synthetic models in the simulator.

use core::ops::{Deref, DerefMut};

use embassy_time::Duration;
use thiserror_no_std::Error;

/// Errors reported by hardware collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SampleError {
    #[error("radio {radio} is held by another task")]
    RadioBusy { radio: u8 },
    #[error("capacitor fell to {voltage} V during a boosted acquisition")]
    BrownOut { voltage: f32 },
    #[error("hardware failure during {operation}: {details}")]
    Hardware {
        operation: &'static str,
        details: &'static str,
    },
}

/// Everything the sample source needs to read one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionPlan {
    pub radio: u8,
    pub channel: u16,
    /// Delay inserted between readings on top of the hardware floor
    pub inter_sample_delay: Duration,
    /// Run the radio from the capacitor boost rail
    pub boost: bool,
}

/// What the sample source observed while acquiring.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AcquisitionReport {
    /// Lowest capacitor voltage seen during the acquisition, when measured
    pub lowest_capacitor_voltage: Option<f32>,
}

/// Produces raw RSSI readings for one channel at a time.
///
/// Acquisition is bracketed by [`SampleSource::lock`] and
/// [`SampleSource::unlock`]; use [`RadioLease`] so the unlock happens on every
/// exit path.
pub trait SampleSource {
    /// Time one reading takes on the hardware, regardless of requested delay.
    fn sample_floor(&self) -> Duration;

    /// Present capacitor (power rail) voltage.
    fn capacitor_voltage(&mut self) -> f32;

    /// Take exclusive use of the radio.
    fn lock(&mut self, radio: u8) -> Result<(), SampleError>;

    /// Give the radio back. Must be infallible.
    fn unlock(&mut self, radio: u8);

    /// Fill `samples` with consecutive readings of `plan.channel`.
    ///
    /// The sequence is not restartable: a failed acquisition has to be issued
    /// again from the start.
    fn acquire(
        &mut self,
        plan: &AcquisitionPlan,
        samples: &mut [u8],
    ) -> impl Future<Output = Result<AcquisitionReport, SampleError>>;
}

/// Exclusive use of one radio, released when dropped.
pub struct RadioLease<'a, S: SampleSource> {
    source: &'a mut S,
    radio: u8,
}

impl<'a, S: SampleSource> RadioLease<'a, S> {
    pub fn take(source: &'a mut S, radio: u8) -> Result<Self, SampleError> {
        source.lock(radio)?;
        Ok(Self { source, radio })
    }
}

impl<S: SampleSource> Deref for RadioLease<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.source
    }
}

impl<S: SampleSource> DerefMut for RadioLease<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.source
    }
}

impl<S: SampleSource> Drop for RadioLease<'_, S> {
    fn drop(&mut self) {
        self.source.unlock(self.radio);
    }
}

/// Allocator introspection.
pub trait HeapStats {
    /// Size of the largest contiguous block that can currently be allocated.
    fn largest_free_block(&self) -> usize;
}

impl<T: HeapStats + ?Sized> HeapStats for &T {
    fn largest_free_block(&self) -> usize {
        T::largest_free_block(self)
    }
}

/// Drive level of a port pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
    /// High impedance
    Input,
}

/// A port pin setting applied around a survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinProfile {
    pub port: u8,
    pub pin: u8,
    pub level: PinLevel,
}

/// Port pin control next to the radio front end.
///
/// Implemented by the board support package; the survey only asks for a
/// profile to be applied and carries the previous one back to the caller.
pub trait RadioPinProfile {
    /// Apply `profile` and return the setting it replaced.
    fn apply(&mut self, profile: PinProfile) -> Result<PinProfile, SampleError>;
}

/// Pin control for boards without configurable front end pins.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPinControl;

impl RadioPinProfile for NoPinControl {
    fn apply(&mut self, _profile: PinProfile) -> Result<PinProfile, SampleError> {
        Err(SampleError::Hardware {
            operation: "pin profile",
            details: "board has no configurable front end pins",
        })
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockSource;
    use super::*;

    #[test]
    fn test_lease_unlocks_on_drop() {
        let mut source = MockSource::new(&[50]);
        {
            let lease = RadioLease::take(&mut source, 0).unwrap();
            assert!(lease.locked);
        }
        assert!(!source.locked);
        assert_eq!(source.lock_count, 1);
        assert_eq!(source.unlock_count, 1);
    }

    #[test]
    fn test_busy_radio_is_not_unlocked() {
        let mut source = MockSource::new(&[50]);
        source.locked = true;
        assert!(matches!(
            RadioLease::take(&mut source, 0),
            Err(SampleError::RadioBusy { radio: 0 })
        ));
        assert_eq!(source.unlock_count, 0);
    }

    #[test]
    fn test_no_pin_control_refuses() {
        let profile = PinProfile {
            port: 1,
            pin: 4,
            level: PinLevel::High,
        };
        assert!(NoPinControl.apply(profile).is_err());
    }
}
