//! Hardware-independent core library for the noiseband survey
//!
//! This crate contains the RF channel noise survey engine of the mesh
//! endpoint: request validation, memory and time budgeting, the per-channel
//! statistics reduction, the single-byte quantization codecs, the capacitor
//! power budget and the result table consumed by the console report.
//!
//! The radio, the capacitor ADC, the heap and the port pins are reached only
//! through the narrow traits in [`source`], so the numeric core builds on the
//! endpoint MCU as well as on desktop hosts (for the simulator and tests).
//!
//! It is `#![no_std]` with `extern crate alloc`.

#![no_std]

extern crate alloc;

pub mod budget;
pub mod codec;
pub mod command;
pub mod config;
pub mod math;
pub mod power;
pub mod report;
pub mod request;
pub mod rssi;
pub mod source;
pub mod stats;
pub mod store;
pub mod survey;

pub use config::SurveyConfig;
pub use request::{PowerMode, SurveyRequest, SweepPlan};
pub use store::{ChannelSummary, ResultStore};
pub use survey::{SurveyError, SurveySession};
