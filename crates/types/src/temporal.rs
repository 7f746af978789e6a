//! Temporal value parsing and arithmetic: DATE, TIME, DATETIME/TIMESTAMP, INTERVAL.
//!
//! Grounded in `chrono`, the temporal crate the wider example pack reaches
//! for (see harborgrid-justin-rusty-db's `Cargo.toml`) — the teacher repo
//! has no date/time support at all, so this module is net-new per the
//! expression engine's arithmetic requirements.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A signed calendar interval: whole months (for YEAR/MONTH units, which
/// must respect variable month lengths) plus an exact microsecond duration
/// (for WEEK/DAY/HOUR/MINUTE/SECOND units).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub months: i32,
    pub micros: i64,
}

impl Interval {
    pub const ZERO: Interval = Interval {
        months: 0,
        micros: 0,
    };

    pub fn months(n: i32) -> Self {
        Self {
            months: n,
            micros: 0,
        }
    }

    pub fn micros(n: i64) -> Self {
        Self {
            months: 0,
            micros: n,
        }
    }

    pub fn negate(self) -> Self {
        Self {
            months: -self.months,
            micros: -self.micros,
        }
    }

    /// Parse `"<signed-int> <unit>[s]"`, unit in
    /// {year, month, week, day, hour, minute, second}.
    pub fn parse(s: &str) -> Option<Interval> {
        let s = s.trim();
        let mut parts = s.splitn(2, char::is_whitespace);
        let amount: i64 = parts.next()?.parse().ok()?;
        let unit = parts.next()?.trim().to_ascii_lowercase();
        let unit = unit.strip_suffix('s').unwrap_or(&unit);

        Some(match unit {
            "year" => Interval::months(amount as i32 * 12),
            "month" => Interval::months(amount as i32),
            "week" => Interval::micros(amount * 7 * 24 * 3_600_000_000),
            "day" => Interval::micros(amount * 24 * 3_600_000_000),
            "hour" => Interval::micros(amount * 3_600_000_000),
            "minute" => Interval::micros(amount * 60_000_000),
            "second" => Interval::micros(amount * 1_000_000),
            _ => return None,
        })
    }
}

/// Add an interval to a date, clamping the day-of-month when a month-based
/// shift lands on a day past the target month's end (e.g. Jan 31 + 1 month
/// clamps to Feb 28/29 rather than overflowing into March).
pub fn add_interval_to_date(date: NaiveDate, iv: Interval) -> Option<NaiveDate> {
    let shifted = if iv.months != 0 {
        shift_months(date, iv.months)?
    } else {
        date
    };
    if iv.micros == 0 {
        Some(shifted)
    } else {
        let dt = shifted.and_hms_opt(0, 0, 0)?;
        Some((dt + Duration::microseconds(iv.micros)).date())
    }
}

pub fn add_interval_to_datetime(dt: NaiveDateTime, iv: Interval) -> Option<NaiveDateTime> {
    let shifted = if iv.months != 0 {
        let date = shift_months(dt.date(), iv.months)?;
        date.and_time(dt.time())
    } else {
        dt
    };
    Some(shifted + Duration::microseconds(iv.micros))
}

fn shift_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let total = date.year() * 12 + date.month() as i32 - 1 + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let last_day = days_in_month(year, month);
    NaiveDate::from_ymd_opt(year, month, date.day().min(last_day))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Parse a DATE literal: ISO-8601 (`YYYY-MM-DD`) or `dd MMM yyyy` / `MMM dd yyyy`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d %b %Y") {
        return Some(d);
    }
    NaiveDate::parse_from_str(s, "%b %d %Y").ok()
}

/// Parse a TIME literal: ISO-8601 or `h:mm[:ss[.SSS]][ AM/PM]`.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    for fmt in [
        "%H:%M:%S%.f",
        "%H:%M:%S",
        "%H:%M",
        "%I:%M:%S%.f %p",
        "%I:%M:%S %p",
        "%I:%M %p",
    ] {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Some(t);
        }
    }
    None
}

/// Parse a DATETIME/TIMESTAMP literal: ISO-8601 `date[ T]time`.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0))
}
