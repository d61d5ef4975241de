//! Log verbosity and output format.
//!
//! Verbosity is a `-v` count or a level name in `CHATGATE_LOG_LEVEL`; both
//! collapse to the same count so `error` equals no `-v` at all.

use clap::{Arg, ArgAction, ArgMatches, Command, builder::ValueParser};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_FORMAT: &str = "log-format";

const LEVELS: [Level; 5] = [
    Level::ERROR,
    Level::WARN,
    Level::INFO,
    Level::DEBUG,
    Level::TRACE,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for log shippers.
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// `None` keeps the subscriber default (errors only).
    pub level: Option<Level>,
    pub format: LogFormat,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let count = matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0);
        let format = match matches.get_one::<String>(ARG_LOG_FORMAT).map(String::as_str) {
            Some("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        Self {
            level: level_for_count(count),
            format,
        }
    }
}

const fn level_for_count(count: u8) -> Option<Level> {
    match count {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

fn verbosity_parser() -> ValueParser {
    ValueParser::from(|value: &str| -> Result<u8, String> {
        if let Ok(count) = value.parse::<u8>() {
            return Ok(count.min(4));
        }

        let level: Level = value
            .parse()
            .map_err(|_| format!("unknown log level '{value}'"))?;

        LEVELS
            .iter()
            .position(|candidate| *candidate == level)
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("unknown log level '{value}'"))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Increase verbosity (-v warn, -vv info, -vvv debug, -vvvv trace)")
                .env("CHATGATE_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(verbosity_parser()),
        )
        .arg(
            Arg::new(ARG_LOG_FORMAT)
                .long(ARG_LOG_FORMAT)
                .help("Log output format")
                .env("CHATGATE_LOG_FORMAT")
                .value_parser(["json", "pretty"])
                .default_value("json"),
        )
}
