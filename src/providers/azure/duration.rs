use chrono::{NaiveDateTime, TimeDelta};

use crate::error::{ExporterError, Result};

/// Azure DevOps timestamps: UTC, `Z`-designated, optional fractional seconds.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Outcome of resolving the time between two timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elapsed {
    Finished(TimeDelta),
    /// The end timestamp is missing or unparsable, i.e. still running.
    Unfinished,
}

impl Elapsed {
    /// Seconds elapsed; the unfinished sentinel is `-1`.
    pub fn seconds(self) -> f64 {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Finished(delta) => delta.num_milliseconds() as f64 / 1000.0,
            Self::Unfinished => -1.0,
        }
    }

    /// Seconds elapsed when strictly positive, `None` otherwise.
    pub fn positive_seconds(self) -> Option<f64> {
        match self {
            Self::Finished(delta) if delta > TimeDelta::zero() => Some(self.seconds()),
            _ => None,
        }
    }

    /// Label rendering: two decimals, or `-1` for the sentinel.
    pub fn label_value(self) -> String {
        match self {
            Self::Finished(_) => format!("{:.2}", self.seconds()),
            Self::Unfinished => "-1".to_string(),
        }
    }
}

fn parse_timestamp(value: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
}

/// Resolves `end - start`.
///
/// An unparsable `start` is an error; an empty or unparsable `end` yields
/// [`Elapsed::Unfinished`].
pub fn resolve(start: &str, end: &str) -> Result<Elapsed> {
    let started = parse_timestamp(start).map_err(|source| ExporterError::Timestamp {
        value: start.to_string(),
        source,
    })?;

    Ok(match parse_timestamp(end) {
        Ok(finished) => Elapsed::Finished(finished.and_utc() - started.and_utc()),
        Err(_) => Elapsed::Unfinished,
    })
}

/// [`resolve`] over optional wire fields; `None` behaves as an empty string.
pub fn resolve_opt(start: Option<&str>, end: Option<&str>) -> Result<Elapsed> {
    resolve(start.unwrap_or_default(), end.unwrap_or_default())
}
