//! Console report
//!
//! Formats the estimate banner and the per-channel results in dBm. Lines are
//! assembled in a fixed-capacity buffer so the writer works on the endpoint
//! console as well as on a host `String`.

use core::fmt::{self, Write};

use heapless::String;

use crate::budget::SurveyEstimate;
use crate::command::USAGE;
use crate::request::SweepPlan;
use crate::store::{ChannelSummary, ResultStore};

/// Longest report line: channel plus ten numeric columns.
const MAX_LINE_LENGTH: usize = 96;

pub const HEADER: &str = "chan,min,median,max,avg,spread,p90,p95,p99,p99.5,p99.9";

/// Banner printed before the sweep starts.
pub fn write_banner<W: Write>(
    out: &mut W,
    plan: &SweepPlan,
    estimate: &SurveyEstimate,
) -> fmt::Result {
    writeln!(out, "{}", estimate)?;
    writeln!(out, "{}", plan)
}

/// One channel as a report line, without the line terminator.
pub fn format_channel(
    channel: u16,
    summary: &ChannelSummary,
) -> Result<String<MAX_LINE_LENGTH>, fmt::Error> {
    let mut line = String::new();
    write!(
        line,
        "{},{:.1},{:.1},{:.1},{:.1},{:.2}",
        channel,
        summary.min_dbm(),
        summary.median_dbm(),
        summary.max_dbm(),
        summary.average_dbm(),
        summary.spread_db()
    )?;
    for p in summary.percentiles_dbm() {
        write!(line, ",{:.1}", p)?;
    }
    Ok(line)
}

pub fn write_results<W: Write>(out: &mut W, store: &ResultStore) -> fmt::Result {
    writeln!(out, "{}", store.plan())?;
    writeln!(out, "{}", HEADER)?;
    for (channel, summary) in store.iter() {
        writeln!(out, "{}", format_channel(channel, summary)?)?;
    }
    if let Some(voltage) = store.lowest_capacitor_voltage() {
        writeln!(out, "lowest capacitor voltage: {:.2} V", voltage)?;
    }
    Ok(())
}

pub fn write_usage<W: Write>(out: &mut W) -> fmt::Result {
    writeln!(out, "{}", USAGE)
}

/// Output of `noiseband` without arguments.
pub fn show<W: Write>(out: &mut W, results: Option<&ResultStore>) -> fmt::Result {
    match results {
        Some(store) => write_results(out, store),
        None => write_usage(out),
    }
}
