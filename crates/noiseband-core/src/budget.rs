//! Memory and time budgets
//!
//! Both are computed from the validated plan before any buffer is allocated
//! or the radio is touched, so the operator sees how long the survey will run
//! and a survey that cannot fit in the heap is refused up front.

use core::fmt::{self, Display};

use embassy_time::Duration;

use crate::config::SurveyTiming;
use crate::power::{PowerBudgetMonitor, recovery_pauses};
use crate::request::SweepPlan;
use crate::store::ChannelSummary;

/// Bytes needed for the scratch buffer plus the result table.
pub fn required_bytes(plan: &SweepPlan) -> usize {
    usize::from(plan.samples) + usize::from(plan.channel_count) * ChannelSummary::SIZE
}

/// Microseconds to wait between readings once the hardware floor is taken out.
pub fn inter_sample_delay(plan: &SweepPlan, floor: Duration) -> Duration {
    Duration::from_micros(u64::from(plan.sampling_rate_us))
        .checked_sub(floor)
        .unwrap_or(Duration::from_ticks(0))
}

/// Time one reading actually takes: the requested rate, but never faster than
/// the hardware.
pub fn effective_sample_time(plan: &SweepPlan, floor: Duration) -> Duration {
    Duration::from_micros(u64::from(plan.sampling_rate_us)).max(floor)
}

/// Pre-computed duration of a survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyEstimate {
    pub total: Duration,
    /// Time spent per channel, overheads included
    pub per_channel: Duration,
    /// Channels between recovery pauses, for boosted sweeps that need them
    pub recovery_interval: Option<u16>,
    pub recovery_pauses: u16,
}

impl SurveyEstimate {
    pub fn compute(
        plan: &SweepPlan,
        floor: Duration,
        timing: &SurveyTiming,
        monitor: &PowerBudgetMonitor,
    ) -> Self {
        let samples = u64::from(plan.samples);
        let sampling = effective_sample_time(plan, floor).as_micros() * samples;

        let reduce_ns =
            u64::from(timing.sort_ns_per_sample) + u64::from(timing.statistics_ns_per_sample);

        let mut overhead_us = u64::from(timing.settle_us)
            + u64::from(timing.lock_unlock_us)
            + u64::from(timing.tabulate_us)
            + u64::from(timing.channel_yield_ms) * 1_000
            + samples * reduce_ns / 1_000;
        if plan.power_mode.is_boost() {
            overhead_us += u64::from(timing.boost_switch_us);
        }
        let per_channel = Duration::from_micros(sampling + overhead_us);

        let recovery_interval =
            monitor.recovery_interval(plan.power_mode, sampling, plan.channel_count);
        let recovery_pauses = recovery_pauses(plan.channel_count, recovery_interval);

        let total = plan.wait
            + per_channel * u32::from(plan.channel_count)
            + timing.recovery_pause() * u32::from(recovery_pauses);

        Self {
            total,
            per_channel,
            recovery_interval,
            recovery_pauses,
        }
    }

    /// Milliseconds a finished survey ran over (positive) or under the estimate.
    pub fn drift_ms(&self, elapsed: Duration) -> i64 {
        elapsed.as_millis() as i64 - self.total.as_millis() as i64
    }
}

impl Display for SurveyEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Round to the nearest second.
        let secs = (self.total.as_millis() + 500) / 1000;
        write!(
            f,
            "Noiseband will take about {:02}:{:02}:{:02}",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )?;
        if let Some(interval) = self.recovery_interval {
            write!(
                f,
                " ({} recharge pauses, one every {} channels)",
                self.recovery_pauses, interval
            )?;
        }
        Ok(())
    }
}
