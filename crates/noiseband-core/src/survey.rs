//! Survey controller
//!
//! [`SurveySession`] owns the hardware collaborators. [`SurveySession::run`]
//! validates the request, checks the heap and the capacitor before touching
//! the radio, then walks the sweep one channel at a time: acquire, reduce,
//! encode, store, yield. The finished [`ResultStore`] is handed to the caller,
//! who keeps it for reporting and drops it before (or by) running the next
//! survey.
//!
//! The scratch buffer and the result table are plain owned values; every
//! early return drops them, and the radio is always unlocked by
//! [`RadioLease`].

use alloc::vec::Vec;

use embassy_time::{Duration, Instant};
use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info, warn};
use thiserror_no_std::Error;

use crate::budget::{self, SurveyEstimate};
use crate::config::SurveyConfig;
use crate::power::{PowerBudgetMonitor, PowerDecision};
use crate::request::{ArgumentError, PowerMode, SurveyRequest, SweepPlan};
use crate::source::{
    AcquisitionPlan, HeapStats, NoPinControl, RadioLease, RadioPinProfile, SampleError,
    SampleSource,
};
use crate::stats;
use crate::store::{ChannelSummary, ResultStore};

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SurveyError {
    #[error("invalid argument: {0}")]
    InvalidArgument(ArgumentError),
    #[error("not enough memory: need {needed} bytes, largest free block is {available}")]
    ResourceExhausted { needed: usize, available: usize },
    #[error("capacitor at {voltage} V is too low to boost channel {channel}")]
    PowerBudgetAbort { voltage: f32, channel: u16 },
    #[error("acquisition failed on channel {channel}: {error}")]
    Acquisition { channel: u16, error: SampleError },
    #[error("could not apply pin profile: {0}")]
    PinControl(SampleError),
}

/// The survey and everything it needs from the platform.
pub struct SurveySession<S, H, D, P = NoPinControl> {
    source: S,
    heap: H,
    delay: D,
    pins: P,
    config: SurveyConfig,
    monitor: PowerBudgetMonitor,
}

impl<S, H, D> SurveySession<S, H, D, NoPinControl>
where
    S: SampleSource,
    H: HeapStats,
    D: DelayNs,
{
    pub fn new(source: S, heap: H, delay: D, config: SurveyConfig) -> Self {
        Self::with_pin_control(source, heap, delay, NoPinControl, config)
    }
}

impl<S, H, D, P> SurveySession<S, H, D, P>
where
    S: SampleSource,
    H: HeapStats,
    D: DelayNs,
    P: RadioPinProfile,
{
    pub fn with_pin_control(source: S, heap: H, delay: D, pins: P, config: SurveyConfig) -> Self {
        Self {
            source,
            heap,
            delay,
            pins,
            monitor: PowerBudgetMonitor::new(config.power, config.timing.wait_poll()),
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Validate `request` and compute how long it would take.
    pub fn estimate(
        &self,
        request: &SurveyRequest,
    ) -> Result<(SweepPlan, SurveyEstimate), SurveyError> {
        let plan = request
            .validate(&self.config.radio)
            .map_err(SurveyError::InvalidArgument)?;
        let estimate = self.estimate_plan(&plan);
        Ok((plan, estimate))
    }

    fn estimate_plan(&self, plan: &SweepPlan) -> SurveyEstimate {
        SurveyEstimate::compute(
            plan,
            self.source.sample_floor(),
            &self.config.timing,
            &self.monitor,
        )
    }

    /// Run a complete survey and hand back its results.
    ///
    /// Invalid arguments, a heap that is too small and a discharged capacitor
    /// in abort mode are all reported before anything is allocated or the
    /// radio is touched. Any later failure drops everything allocated for
    /// this survey.
    ///
    /// The heap check sees whatever the caller still holds, so a caller that
    /// keeps the previous [`ResultStore`] resident should drop it first when
    /// memory is tight.
    pub async fn run(&mut self, request: &SurveyRequest) -> Result<ResultStore, SurveyError> {
        let (plan, estimate) = self.estimate(request).inspect_err(|e| {
            warn!("Noiseband rejected: {}", e);
        })?;
        info!("{}", estimate);
        info!("{}", plan);

        let needed = budget::required_bytes(&plan);
        let available = self.heap.largest_free_block();
        if needed > available {
            error!(
                "Noiseband needs {} bytes but the largest free block is {}",
                needed, available
            );
            return Err(SurveyError::ResourceExhausted { needed, available });
        }

        if plan.power_mode == PowerMode::BoostAbortIfLow {
            let voltage = self.source.capacitor_voltage();
            if self.monitor.prepare_channel(plan.power_mode, voltage) == PowerDecision::Abort {
                return Err(SurveyError::PowerBudgetAbort {
                    voltage,
                    channel: plan.first_channel,
                });
            }
        }

        let (mut scratch, mut store) = self.allocate(&plan, needed)?;

        if let Some(profile) = plan.pins {
            let previous = self.pins.apply(profile).map_err(|e| {
                error!("Noiseband pin profile failed: {}", e);
                SurveyError::PinControl(e)
            })?;
            store.set_previous_pins(previous);
        }

        let started = Instant::now();
        self.sweep(&plan, &estimate, &mut scratch, &mut store).await?;
        let elapsed = started.elapsed();

        info!(
            "Noiseband complete, {} channels in {} ms ({:+} ms against the estimate)",
            store.len(),
            elapsed.as_millis(),
            estimate.drift_ms(elapsed)
        );
        Ok(store)
    }

    fn allocate(
        &self,
        plan: &SweepPlan,
        needed: usize,
    ) -> Result<(Vec<u8>, ResultStore), SurveyError> {
        let exhausted = |_| {
            let available = self.heap.largest_free_block();
            error!("Noiseband allocation of {} bytes failed", needed);
            SurveyError::ResourceExhausted { needed, available }
        };

        let mut scratch = Vec::new();
        scratch
            .try_reserve_exact(usize::from(plan.samples))
            .map_err(exhausted)?;
        scratch.resize(usize::from(plan.samples), 0);

        let mut summaries = Vec::new();
        summaries
            .try_reserve_exact(usize::from(plan.channel_count))
            .map_err(exhausted)?;

        Ok((scratch, ResultStore::new(*plan, summaries)))
    }

    async fn sweep(
        &mut self,
        plan: &SweepPlan,
        estimate: &SurveyEstimate,
        scratch: &mut [u8],
        store: &mut ResultStore,
    ) -> Result<(), SurveyError> {
        let timing = self.config.timing;
        let acquisition = AcquisitionPlan {
            radio: plan.radio,
            channel: plan.first_channel,
            inter_sample_delay: budget::inter_sample_delay(plan, self.source.sample_floor()),
            boost: plan.power_mode.is_boost(),
        };

        if plan.wait.as_ticks() > 0 {
            info!("Noiseband waiting {} s", plan.wait.as_secs());
            sleep(&mut self.delay, plan.wait).await;
        }
        sleep(&mut self.delay, timing.channel_yield()).await;

        for (index, channel) in plan.channels().enumerate() {
            if let Some(interval) = estimate.recovery_interval
                && index > 0
                && index % usize::from(interval) == 0
            {
                self.recover(timing.recovery_pause()).await;
            }

            self.wait_for_power(plan.power_mode, channel).await?;

            let report = {
                let mut lease = RadioLease::take(&mut self.source, plan.radio)
                    .map_err(|error| acquisition_failed(channel, error))?;
                lease
                    .acquire(&AcquisitionPlan { channel, ..acquisition }, scratch)
                    .await
                    .map_err(|error| acquisition_failed(channel, error))?
            };
            if let Some(voltage) = report.lowest_capacitor_voltage {
                store.record_voltage(voltage);
            }

            // The scratch buffer always holds at least one sample.
            let summary = stats::reduce(scratch)
                .map(|stats| ChannelSummary::from_stats(&stats))
                .unwrap_or_default();
            debug!(
                "Channel {}: min={} median={} max={}",
                channel, summary.min, summary.median, summary.max
            );
            store.push(summary);

            sleep(&mut self.delay, timing.channel_yield()).await;
        }
        Ok(())
    }

    async fn wait_for_power(&mut self, mode: PowerMode, channel: u16) -> Result<(), SurveyError> {
        loop {
            let voltage = self.source.capacitor_voltage();
            match self.monitor.prepare_channel(mode, voltage) {
                PowerDecision::Proceed => return Ok(()),
                PowerDecision::Wait(poll) => sleep(&mut self.delay, poll).await,
                PowerDecision::Abort => {
                    error!("Noiseband aborted at channel {} ({} V)", channel, voltage);
                    return Err(SurveyError::PowerBudgetAbort { voltage, channel });
                }
            }
        }
    }

    async fn recover(&mut self, pause: Duration) {
        let before = self.source.capacitor_voltage();
        sleep(&mut self.delay, pause).await;
        let after = self.source.capacitor_voltage();
        info!(
            "Recovery pause of {} ms: capacitor {} V -> {} V",
            pause.as_millis(),
            before,
            after
        );
    }
}

fn acquisition_failed(channel: u16, error: SampleError) -> SurveyError {
    error!("Noiseband acquisition failed on channel {}: {}", channel, error);
    SurveyError::Acquisition { channel, error }
}

/// Sleep for `duration`, split into chunks `delay_us` can take.
async fn sleep<D: DelayNs>(delay: &mut D, duration: Duration) {
    let mut remaining = duration.as_micros();
    while remaining > 0 {
        let chunk = u32::try_from(remaining).unwrap_or(u32::MAX);
        delay.delay_us(chunk).await;
        remaining -= u64::from(chunk);
    }
}
