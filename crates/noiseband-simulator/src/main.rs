//! Desktop simulator for the noiseband survey console command.
//!
//! Runs `noiseband-core` against a synthetic radio so surveys can be tried
//! without an endpoint. Time is simulated: delays advance a shared clock
//! instead of sleeping, so a survey estimated at hours finishes in seconds.
//!
//! ```text
//! noiseband-simulator radio waittime nSamples samplingRate start end step [boost]
//! ```
//!
//! | Variable              | Meaning                                   |
//! |-----------------------|-------------------------------------------|
//! | `RUST_LOG`            | log filter (`info`, `debug`, ...)         |
//! | `NOISEBAND_HEAP`      | largest free heap block in bytes          |
//! | `NOISEBAND_CAP_VOLTS` | capacitor voltage at start                |

use std::cell::Cell;
use std::process::ExitCode;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use noiseband_core::command::Command;
use noiseband_core::power::{BoostRail, Supply, SupplySwitch};
use noiseband_core::report;
use noiseband_core::rssi;
use noiseband_core::source::{
    AcquisitionPlan, AcquisitionReport, HeapStats, SampleError, SampleSource,
};
use noiseband_core::{SurveyConfig, SurveySession};

// ---------------------------------------------------------------------------
// Hardware constants
// ---------------------------------------------------------------------------

/// Fastest the simulated modem returns one RSSI reading.
const SAMPLE_FLOOR: Duration = Duration::from_micros(60);

/// RSSI settling time after tuning.
const SETTLE_TIME: Duration = Duration::from_micros(1_000);

/// Boost converter start-up time.
const BOOST_SWITCH_TIME: Duration = Duration::from_millis(5);

/// Gain of the simulated front end, removed from every reading.
const FRONT_END_GAIN: i8 = -4;

const DEFAULT_HEAP_BYTES: usize = 48 * 1024;

const CAPACITOR_FULL_VOLTS: f32 = 3.0;
const DEFAULT_CAPACITOR_VOLTS: f32 = 2.8;
const CHARGE_VOLTS_PER_SEC: f32 = 0.05;
const DRAIN_VOLTS_PER_SEC: f32 = 0.2;

// ---------------------------------------------------------------------------
// Simulated time
// ---------------------------------------------------------------------------

/// Microseconds of simulated time, shared by the delay and the radio.
#[derive(Clone, Default)]
struct SimClock(Rc<Cell<u64>>);

impl SimClock {
    fn now_us(&self) -> u64 {
        self.0.get()
    }

    fn advance(&self, duration: Duration) {
        self.0.set(self.0.get() + duration.as_micros());
    }
}

/// Delay that advances the simulated clock and returns at once.
struct SimDelay(SimClock);

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.advance(Duration::from_nanos(u64::from(ns)));
    }
}

// ---------------------------------------------------------------------------
// Power
// ---------------------------------------------------------------------------

struct SimSupply;

impl SupplySwitch for SimSupply {
    fn select(&mut self, supply: Supply) {
        debug!("Radio supply: {:?}", supply);
    }
}

static BOOST_RAIL: BoostRail<CriticalSectionRawMutex, SimSupply> = BoostRail::new(SimSupply);

/// Supercapacitor charged from the regulator and drained by boosted sampling.
struct Capacitor {
    voltage: f32,
    updated_us: u64,
}

impl Capacitor {
    /// Bring the voltage up to `now_us`, charging or draining in between.
    fn settle(&mut self, now_us: u64, boosting: bool) -> f32 {
        let secs = (now_us - self.updated_us) as f32 / 1_000_000.0;
        self.updated_us = now_us;
        self.voltage = if boosting {
            self.voltage - secs * DRAIN_VOLTS_PER_SEC
        } else {
            (self.voltage + secs * CHARGE_VOLTS_PER_SEC).min(CAPACITOR_FULL_VOLTS)
        };
        self.voltage
    }
}

// ---------------------------------------------------------------------------
// Radio
// ---------------------------------------------------------------------------

/// Radio producing a noise floor per channel with a few bursty interferers.
struct SyntheticRadio {
    clock: SimClock,
    capacitor: Capacitor,
    rail: &'static BoostRail<CriticalSectionRawMutex, SimSupply>,
    /// Below this the radio resets during a boosted acquisition
    brown_out_volts: f32,
    locked: bool,
    seed: u32,
}

impl SyntheticRadio {
    fn new(clock: SimClock, capacitor_volts: f32, brown_out_volts: f32) -> Self {
        Self {
            capacitor: Capacitor {
                voltage: capacitor_volts,
                updated_us: clock.now_us(),
            },
            clock,
            rail: &BOOST_RAIL,
            brown_out_volts,
            locked: false,
            seed: 0x9e37_79b9,
        }
    }

    fn next_random(&mut self) -> u32 {
        self.seed ^= self.seed << 13;
        self.seed ^= self.seed >> 17;
        self.seed ^= self.seed << 5;
        self.seed
    }

    /// One raw reading on `channel`, before front end gain compensation.
    fn reading(&mut self, channel: u16) -> u8 {
        // Floor between -114 and -104.5 dBm, varying slowly across the band.
        let floor_dbm = -114.0 + f32::from((channel / 160) % 20) / 2.0;
        let floor = rssi::dbm_to_raw(floor_dbm) as u16;
        // Sum of uniforms gives a rough bell around the floor.
        let noise: u16 = (0..4).map(|_| (self.next_random() % 4) as u16).sum();
        let mut raw = floor + noise;
        if channel % 97 == 0 && self.next_random() % 10 == 0 {
            raw += 40 + (self.next_random() % 30) as u16;
        }
        raw.min(u16::from(rssi::INVALID_RSSI - 1)) as u8
    }
}

impl SampleSource for SyntheticRadio {
    fn sample_floor(&self) -> Duration {
        SAMPLE_FLOOR
    }

    fn capacitor_voltage(&mut self) -> f32 {
        self.capacitor.settle(self.clock.now_us(), false)
    }

    fn lock(&mut self, radio: u8) -> Result<(), SampleError> {
        if self.locked {
            return Err(SampleError::RadioBusy { radio });
        }
        self.locked = true;
        Ok(())
    }

    fn unlock(&mut self, _radio: u8) {
        self.locked = false;
    }

    async fn acquire(
        &mut self,
        plan: &AcquisitionPlan,
        samples: &mut [u8],
    ) -> Result<AcquisitionReport, SampleError> {
        let voltage = self.capacitor.settle(self.clock.now_us(), false);
        let rail = self.rail;
        let boost = if plan.boost && voltage < self.brown_out_volts {
            warn!(
                "Capacitor at {:.2} V on channel {}, sampling on the LDO",
                voltage, plan.channel
            );
            None
        } else if plan.boost {
            let guard = rail.engage().await;
            self.clock.advance(BOOST_SWITCH_TIME);
            Some(guard)
        } else {
            None
        };

        self.clock.advance(SETTLE_TIME);
        let per_sample = SAMPLE_FLOOR + plan.inter_sample_delay;
        let mut lowest: Option<f32> = None;
        for sample in samples.iter_mut() {
            *sample = self.reading(plan.channel);
            self.clock.advance(per_sample);
            if boost.is_some() {
                let voltage = self.capacitor.settle(self.clock.now_us(), true);
                lowest = Some(lowest.map_or(voltage, |l| l.min(voltage)));
                if voltage < self.brown_out_volts {
                    warn!("Brown-out on channel {} at {:.2} V", plan.channel, voltage);
                    return Err(SampleError::BrownOut { voltage });
                }
            }
        }
        drop(boost);

        rssi::compensate_front_end_gain(samples, FRONT_END_GAIN);
        Ok(AcquisitionReport {
            lowest_capacitor_voltage: lowest,
        })
    }
}

// ---------------------------------------------------------------------------
// Heap
// ---------------------------------------------------------------------------

struct SimHeap(usize);

impl HeapStats for SimHeap {
    fn largest_free_block(&self) -> usize {
        self.0
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={}", name, value);
            default
        }),
        Err(_) => default,
    }
}

fn main() -> ExitCode {
    env_logger::init();
    info!("Starting noiseband simulator");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let mut out = String::new();

    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("noiseband: {}", e);
            let _ = report::write_usage(&mut out);
            eprint!("{}", out);
            return ExitCode::FAILURE;
        }
    };

    let request = match command {
        Command::Show => {
            // A fresh process has no resident results.
            let _ = report::show(&mut out, None);
            print!("{}", out);
            return ExitCode::SUCCESS;
        }
        Command::Run(request) => request,
    };

    let config = SurveyConfig::default();
    let clock = SimClock::default();
    let radio = SyntheticRadio::new(
        clock.clone(),
        env_or("NOISEBAND_CAP_VOLTS", DEFAULT_CAPACITOR_VOLTS),
        config.power.brown_out_voltage,
    );
    let heap = SimHeap(env_or("NOISEBAND_HEAP", DEFAULT_HEAP_BYTES));
    let mut session = SurveySession::new(radio, heap, SimDelay(clock.clone()), config);

    match session.estimate(&request) {
        Ok((plan, estimate)) => {
            let _ = report::write_banner(&mut out, &plan, &estimate);
            print!("{}", out);
            out.clear();
        }
        Err(e) => {
            eprintln!("noiseband: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match embassy_futures::block_on(session.run(&request)) {
        Ok(store) => {
            let _ = report::write_results(&mut out, &store);
            print!("{}", out);
        }
        Err(e) => {
            eprintln!("noiseband: {}", e);
            return ExitCode::FAILURE;
        }
    }

    info!(
        "Simulated survey time {:.1} s",
        clock.now_us() as f64 / 1_000_000.0
    );
    ExitCode::SUCCESS
}
