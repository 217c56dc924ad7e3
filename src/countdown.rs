//! Countdown to the expiry of a signed media URL.
//!
//! Provider image URLs carry their expiry in the `se` query parameter. The
//! [Countdown] turns that into a remaining-time readout that ticks once per
//! second until it hits zero.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use url::Url;

use crate::constants::EXPIRY_QUERY_PARAM;

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Remaining time split into display units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeLeft {
    /// Total remaining milliseconds, never negative.
    pub total_ms: u64,
    /// Whole days.
    pub days: u64,
    /// Hours within the day.
    pub hours: u64,
    /// Minutes within the hour.
    pub minutes: u64,
    /// Seconds within the minute.
    pub seconds: u64,
}

impl TimeLeft {
    /// Splits a millisecond count by integer division.
    pub fn from_millis(total_ms: u64) -> Self {
        Self {
            total_ms,
            days: total_ms / MS_PER_DAY,
            hours: (total_ms / MS_PER_HOUR) % 24,
            minutes: (total_ms / MS_PER_MINUTE) % 60,
            seconds: (total_ms / MS_PER_SECOND) % 60,
        }
    }
}

impl std::fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.days > 0 {
            write!(f, "{}d ", self.days)?;
        }
        write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
    }
}

/// What the countdown shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownState {
    /// The URL has no usable expiry. Terminal.
    Invalid,
    /// Time remains.
    Running(TimeLeft),
    /// The link has expired. Terminal.
    Expired,
}

impl CountdownState {
    /// No further updates follow a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CountdownState::Running(_))
    }
}

impl std::fmt::Display for CountdownState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid => write!(f, "Invalid or missing expiry time in URL"),
            Self::Running(left) => write!(f, "Time left until expiry: {left}"),
            Self::Expired => write!(f, "Link expired"),
        }
    }
}

/// Parses an expiry value: RFC 3339, or a bare date meaning midnight UTC.
pub fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reads the `se` parameter from a URL.
pub fn expiry_from_url(url: &str) -> Option<DateTime<Utc>> {
    let parsed = Url::parse(url).ok()?;
    let (_, value) = parsed
        .query_pairs()
        .find(|(key, _)| key == EXPIRY_QUERY_PARAM)?;
    parse_expiry(&value)
}

/// A countdown bound to one URL. Build a new one to restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    expiry: Option<DateTime<Utc>>,
}

impl Countdown {
    /// Extracts the expiry from `url`.
    pub fn from_url(url: &str) -> Self {
        Self {
            expiry: expiry_from_url(url),
        }
    }

    /// Countdown to a known instant.
    pub fn until(expiry: DateTime<Utc>) -> Self {
        Self {
            expiry: Some(expiry),
        }
    }

    /// The parsed expiry, if any.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// State as of `now`.
    pub fn state_at(&self, now: DateTime<Utc>) -> CountdownState {
        let Some(expiry) = self.expiry else {
            return CountdownState::Invalid;
        };
        let remaining = (expiry - now).num_milliseconds().max(0);
        let remaining = u64::try_from(remaining).unwrap_or_default();
        if remaining == 0 {
            CountdownState::Expired
        } else {
            CountdownState::Running(TimeLeft::from_millis(remaining))
        }
    }

    /// Ticks once per second, reporting each state, until a terminal one.
    ///
    /// An invalid URL is reported once and returns without starting a timer.
    /// The first tick lands one second after the call.
    pub async fn run<C, R>(&self, clock: C, mut report: R) -> CountdownState
    where
        C: Fn() -> DateTime<Utc>,
        R: FnMut(&CountdownState),
    {
        if self.expiry.is_none() {
            report(&CountdownState::Invalid);
            return CountdownState::Invalid;
        }

        let period = Duration::from_secs(1);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            let state = self.state_at(clock());
            report(&state);
            if state.is_terminal() {
                return state;
            }
        }
    }
}
