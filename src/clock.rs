//! Business-timezone calendar: "now"/"today", valid booking days,
//! the business slot grid, and the date display formats used by the views.
//!
//! Every date and time-of-day in the crate is local to one fixed IANA zone.
//! Field extraction goes through `chrono-tz`, never through a fixed offset.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::limits::*;
use crate::model::{Minutes, Span};

pub const DEFAULT_TZ: Tz = chrono_tz::America::Sao_Paulo;

pub trait Clock: Send + Sync {
    /// Current instant in the business timezone.
    fn now(&self) -> DateTime<Tz>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Minutes elapsed since local midnight.
    fn minutes_now(&self) -> Minutes {
        let now = self.now();
        now.hour() * 60 + now.minute()
    }
}

/// Wall clock evaluated in a fixed zone regardless of the host's local timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(DEFAULT_TZ)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

/// A clock frozen at one local instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Tz>,
}

impl FixedClock {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self { now }
    }

    /// Local `date` at `minutes` past midnight in `tz`.
    ///
    /// Falls back to interpreting the wall time as UTC if it does not exist locally.
    pub fn at(tz: Tz, date: NaiveDate, minutes: Minutes) -> Self {
        let naive =
            date.and_hms_opt(0, 0, 0).unwrap_or_default() + Duration::minutes(minutes as i64);
        let now = tz
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| naive.and_utc().with_timezone(&tz));
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.now
    }
}

// ── Valid booking days ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidDay {
    pub date: NaiveDate,
    pub weekday: &'static str,
    /// `dd/mm`
    pub label: String,
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Segunda",
        Weekday::Tue => "Terça",
        Weekday::Wed => "Quarta",
        Weekday::Thu => "Quinta",
        Weekday::Fri => "Sexta",
        Weekday::Sat => "Sábado",
        Weekday::Sun => "Domingo",
    }
}

/// The next `n` calendar days starting today, skipping Sundays.
pub fn next_valid_days(clock: &dyn Clock, n: usize) -> Vec<ValidDay> {
    clock
        .today()
        .iter_days()
        .filter(|d| d.weekday() != Weekday::Sun)
        .take(n)
        .map(|date| ValidDay {
            date,
            weekday: weekday_name(date.weekday()),
            label: format_short(date),
        })
        .collect()
}

// ── Business slot grid ───────────────────────────────────────────

/// True if `[start, start + duration)` fits the business window and misses lunch.
pub fn fits_business_window(start: Minutes, duration: Minutes) -> bool {
    let Some(end) = start.checked_add(duration) else {
        return false;
    };
    start >= OPEN && end <= CLOSE && !(start < LUNCH_END && end > LUNCH_START)
}

/// Every start time on a `step`-minute grid from opening whose window fits
/// the business day without touching the lunch blackout.
pub fn business_slots(duration: Minutes, step: Minutes) -> Vec<Minutes> {
    if step == 0 || duration > CLOSE - OPEN {
        return Vec::new();
    }
    (OPEN..CLOSE)
        .step_by(step as usize)
        .filter(|&start| fits_business_window(start, duration))
        .collect()
}

/// `business_slots` with the default 15-minute step, as spans.
pub fn business_spans(duration: Minutes) -> Vec<Span> {
    if duration == 0 {
        return Vec::new();
    }
    business_slots(duration, SLOT_STEP_MINUTES)
        .into_iter()
        .filter_map(|start| Span::starting_at(start, duration))
        .collect()
}

// ── Time-of-day formats ──────────────────────────────────────────

/// Parse a zero-padded 24h `HH:mm`.
pub fn parse_time(s: &str) -> Option<Minutes> {
    let (h, m) = s.split_once(':')?;
    if !is_two_digits(h) || !is_two_digits(m) {
        return None;
    }
    let h: Minutes = h.parse().ok()?;
    let m: Minutes = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// `HH:mm`. Values past midnight are rendered as-is (`24:00` for end of day).
pub fn format_time(minutes: Minutes) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn is_two_digits(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit())
}

// ── Date formats ─────────────────────────────────────────────────

/// Parse ISO `yyyy-mm-dd`.
pub fn parse_iso(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse long `dd/mm/yyyy`.
pub fn parse_long(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()
}

/// Parse short `dd/mm`, which carries no year.
pub fn parse_short(s: &str, year: i32) -> Option<NaiveDate> {
    let (d, m) = s.split_once('/')?;
    if !is_two_digits(d) || !is_two_digits(m) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, m.parse().ok()?, d.parse().ok()?)
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_short(date: NaiveDate) -> String {
    date.format("%d/%m").to_string()
}

pub fn format_long(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn iso_to_short(iso: &str) -> Option<String> {
    parse_iso(iso).map(format_short)
}

pub fn iso_to_long(iso: &str) -> Option<String> {
    parse_iso(iso).map(format_long)
}

pub fn long_to_iso(long: &str) -> Option<String> {
    parse_long(long).map(format_iso)
}

pub fn short_to_iso(short: &str, year: i32) -> Option<String> {
    parse_short(short, year).map(format_iso)
}
