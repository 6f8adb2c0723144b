//! The `noiseband` console command
//!
//! ```text
//! noiseband radio waittime nSamples samplingRate start end step [boost]
//! ```
//!
//! With no arguments the command shows the resident results (or the usage
//! text when there are none).

use core::str::FromStr;

use heapless::Vec;

use crate::request::{ArgumentError, PowerMode, SurveyRequest};

pub const COMMAND_NAME: &str = "noiseband";

pub const USAGE: &str = "\
noiseband radio waittime nSamples samplingRate start end step [boost]
  radio         radio index
  waittime      seconds to wait before starting (0-600)
  nSamples      samples per channel (1-20000)
  samplingRate  microseconds between samples
  start end     first and last channel
  step          channel step (at least 2)
  boost         0 normal, 1 boost (abort if capacitor low),
                2 boost (ignore capacitor), 3 boost (wait for capacitor)
noiseband       show the last results";

const ARGUMENT_NAMES: [&str; 8] = [
    "radio",
    "waittime",
    "nSamples",
    "samplingRate",
    "start",
    "end",
    "step",
    "boost",
];

/// Parsed form of one `noiseband` invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Print the resident results, or the usage text
    Show,
    Run(SurveyRequest),
}

impl Command {
    /// Parse the arguments following the command name.
    pub fn parse(args: &[&str]) -> Result<Self, ArgumentError> {
        match args.len() {
            0 => return Ok(Self::Show),
            7 | 8 => {}
            given => {
                return Err(ArgumentError::WrongArgumentCount {
                    given,
                    expected: "0, 7 or 8",
                });
            }
        }

        let power_mode = match args.get(7) {
            Some(token) => {
                let selector = number(token, ARGUMENT_NAMES[7])?;
                PowerMode::from_selector(selector)
                    .ok_or(ArgumentError::UnknownPowerMode { selector })?
            }
            None => PowerMode::Normal,
        };

        Ok(Self::Run(SurveyRequest {
            radio: number(args[0], ARGUMENT_NAMES[0])?,
            wait_secs: number(args[1], ARGUMENT_NAMES[1])?,
            samples: number(args[2], ARGUMENT_NAMES[2])?,
            sampling_rate_us: number(args[3], ARGUMENT_NAMES[3])?,
            first_channel: number(args[4], ARGUMENT_NAMES[4])?,
            last_channel: number(args[5], ARGUMENT_NAMES[5])?,
            step: number(args[6], ARGUMENT_NAMES[6])?,
            power_mode,
            pins: None,
        }))
    }

    /// Parse a whole console line, command name included.
    pub fn parse_line(line: &str) -> Result<Self, ArgumentError> {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some(COMMAND_NAME) {
            return Err(ArgumentError::Malformed { name: "command" });
        }

        let mut args: Vec<&str, 8> = Vec::new();
        for token in tokens {
            args.push(token)
                .map_err(|_| ArgumentError::WrongArgumentCount {
                    given: args.len() + 1,
                    expected: "0, 7 or 8",
                })?;
        }
        Self::parse(&args)
    }
}

fn number<T: FromStr>(token: &str, name: &'static str) -> Result<T, ArgumentError> {
    token.parse().map_err(|_| ArgumentError::Malformed { name })
}
