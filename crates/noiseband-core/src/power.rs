//! Capacitor power budget
//!
//! Boosted sampling runs the radio from the supercapacitor instead of the
//! regulator. [`PowerBudgetMonitor`] decides, per channel, whether sampling
//! may go ahead given the capacitor voltage, and how often the survey has to
//! pause so the capacitor can recharge. It never switches the rail itself;
//! sample sources do that through [`BoostRail`].

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::Duration;
use log::{debug, warn};

use crate::config::PowerBudget;
use crate::request::PowerMode;

/// Recommendation for the next channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerDecision {
    Proceed,
    /// Sleep this long, read the voltage again and ask again
    Wait(Duration),
    Abort,
}

#[derive(Debug, Clone, Copy)]
pub struct PowerBudgetMonitor {
    budget: PowerBudget,
    poll: Duration,
}

impl PowerBudgetMonitor {
    pub fn new(budget: PowerBudget, poll: Duration) -> Self {
        Self { budget, poll }
    }

    /// Decide whether the next channel may be sampled.
    pub fn prepare_channel(&self, mode: PowerMode, capacitor_voltage: f32) -> PowerDecision {
        let charged = capacitor_voltage >= self.budget.boost_min_voltage;
        match mode {
            PowerMode::Normal | PowerMode::BoostIgnore => PowerDecision::Proceed,
            PowerMode::BoostAbortIfLow if charged => PowerDecision::Proceed,
            PowerMode::BoostAbortIfLow => {
                warn!(
                    "Capacitor at {} V is below {} V; use boost-ignore or boost-wait instead",
                    capacitor_voltage, self.budget.boost_min_voltage
                );
                PowerDecision::Abort
            }
            PowerMode::BoostWaitForThreshold if charged => PowerDecision::Proceed,
            PowerMode::BoostWaitForThreshold => {
                debug!("Capacitor at {} V, waiting for charge", capacitor_voltage);
                PowerDecision::Wait(self.poll)
            }
        }
    }

    /// Channels that may be sampled back to back before a recovery pause.
    ///
    /// `per_channel_draw_us` is the boost-on time of one channel. Returns
    /// `None` when no pause is needed: normal power, or a sweep whose total
    /// draw fits in the capacitor budget.
    pub fn recovery_interval(
        &self,
        mode: PowerMode,
        per_channel_draw_us: u64,
        channels: u16,
    ) -> Option<u16> {
        if !mode.is_boost() {
            return None;
        }
        let total = per_channel_draw_us.saturating_mul(u64::from(channels));
        if total <= self.budget.boost_energy_budget_us {
            return None;
        }
        let interval = self.budget.boost_energy_budget_us / per_channel_draw_us.max(1);
        Some(interval.clamp(1, u64::from(u16::MAX)) as u16)
    }
}

/// Number of recovery pauses in a sweep; none after the last channel.
pub fn recovery_pauses(channels: u16, interval: Option<u16>) -> u16 {
    match interval {
        Some(interval) if channels > 0 => (channels - 1) / interval.max(1),
        _ => 0,
    }
}

/// Supply feeding the radio power amplifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supply {
    /// Steady-state regulator
    Ldo,
    /// Supercapacitor boost converter
    Boost,
}

/// Switches the radio supply. Implemented by the power HAL.
pub trait SupplySwitch {
    fn select(&mut self, supply: Supply);
}

/// The boost rail, shared by every consumer of the capacitor.
///
/// Only one holder can engage boost at a time; the rail returns to the
/// regulator when the guard is dropped.
pub struct BoostRail<M: RawMutex, S: SupplySwitch> {
    switch: Mutex<M, S>,
}

impl<M: RawMutex, S: SupplySwitch> BoostRail<M, S> {
    pub const fn new(switch: S) -> Self {
        Self {
            switch: Mutex::new(switch),
        }
    }

    /// Wait for the rail and switch it to boost.
    pub async fn engage(&self) -> BoostGuard<'_, M, S> {
        let mut switch = self.switch.lock().await;
        switch.select(Supply::Boost);
        BoostGuard { switch }
    }
}

pub struct BoostGuard<'a, M: RawMutex, S: SupplySwitch> {
    switch: MutexGuard<'a, M, S>,
}

impl<M: RawMutex, S: SupplySwitch> Drop for BoostGuard<'_, M, S> {
    fn drop(&mut self) {
        self.switch.select(Supply::Ldo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    fn monitor() -> PowerBudgetMonitor {
        PowerBudgetMonitor::new(PowerBudget::default(), Duration::from_millis(100))
    }

    #[test]
    fn test_abort_if_low() {
        let monitor = monitor();
        assert_eq!(
            monitor.prepare_channel(PowerMode::BoostAbortIfLow, 2.0),
            PowerDecision::Abort
        );
        assert_eq!(
            monitor.prepare_channel(PowerMode::BoostAbortIfLow, 2.5),
            PowerDecision::Proceed
        );
    }

    #[test]
    fn test_wait_for_threshold() {
        let monitor = monitor();
        assert_eq!(
            monitor.prepare_channel(PowerMode::BoostWaitForThreshold, 1.9),
            PowerDecision::Wait(Duration::from_millis(100))
        );
        assert_eq!(
            monitor.prepare_channel(PowerMode::BoostWaitForThreshold, 2.3),
            PowerDecision::Proceed
        );
    }

    #[test]
    fn test_ignore_and_normal_always_proceed() {
        let monitor = monitor();
        for voltage in [0.0, 1.5, 2.9] {
            assert_eq!(
                monitor.prepare_channel(PowerMode::BoostIgnore, voltage),
                PowerDecision::Proceed
            );
            assert_eq!(
                monitor.prepare_channel(PowerMode::Normal, voltage),
                PowerDecision::Proceed
            );
        }
    }

    #[test]
    fn test_recovery_interval() {
        let monitor = monitor();
        // 1000 samples at 100 us draw 100 ms of boost per channel.
        assert_eq!(monitor.recovery_interval(PowerMode::Normal, 100_000, 100), None);
        assert_eq!(monitor.recovery_interval(PowerMode::BoostIgnore, 100_000, 30), None);
        assert_eq!(
            monitor.recovery_interval(PowerMode::BoostIgnore, 100_000, 31),
            Some(30)
        );
        // A single channel larger than the whole budget still gets one at a time.
        assert_eq!(
            monitor.recovery_interval(PowerMode::BoostAbortIfLow, 5_000_000, 4),
            Some(1)
        );
    }

    #[test]
    fn test_recovery_pause_count() {
        assert_eq!(recovery_pauses(100, None), 0);
        assert_eq!(recovery_pauses(31, Some(30)), 1);
        assert_eq!(recovery_pauses(60, Some(30)), 1);
        assert_eq!(recovery_pauses(61, Some(30)), 2);
        assert_eq!(recovery_pauses(4, Some(1)), 3);
    }

    struct LoggingSwitch(Vec<Supply>);

    impl SupplySwitch for LoggingSwitch {
        fn select(&mut self, supply: Supply) {
            self.0.push(supply);
        }
    }

    #[test]
    fn test_boost_guard_restores_regulator() {
        let rail: BoostRail<NoopRawMutex, _> = BoostRail::new(LoggingSwitch(Vec::new()));
        embassy_futures::block_on(async {
            let guard = rail.engage().await;
            drop(guard);
            let _again = rail.engage().await;
        });
        let switch = rail.switch.try_lock().unwrap();
        assert_eq!(switch.0, [Supply::Boost, Supply::Ldo, Supply::Boost, Supply::Ldo]);
    }
}
