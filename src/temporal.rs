//! Temporal value subsystem (spec §4.9): Date / LocalTime / Time /
//! LocalDateTime / DateTime / Duration, ISO-8601 round-tripping, and
//! `Europe/Stockholm` DST handling via `chrono-tz`.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DateValue {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateValue {
    fn naive(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).expect("validated on construction")
    }

    pub fn quarter(&self) -> u32 {
        (self.month - 1) / 3 + 1
    }

    pub fn ordinal_day(&self) -> u32 {
        self.naive().ordinal()
    }

    pub fn week_day(&self) -> u32 {
        self.naive().weekday().number_from_monday()
    }

    pub fn day_of_quarter(&self) -> u32 {
        let quarter_start_month = (self.quarter() - 1) * 3 + 1;
        let quarter_start = NaiveDate::from_ymd_opt(self.year, quarter_start_month, 1).unwrap();
        (self.naive() - quarter_start).num_days() as u32 + 1
    }

    pub fn week(&self) -> u32 {
        self.naive().iso_week().week()
    }

    pub fn week_year(&self) -> i32 {
        self.naive().iso_week().year()
    }

    pub fn to_iso(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }

    pub fn parse(s: &str) -> Option<Self> {
        let naive = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
        Some(Self {
            year: naive.year(),
            month: naive.month(),
            day: naive.day(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LocalTimeValue {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub nanosecond: u32,
}

impl LocalTimeValue {
    pub fn millisecond(&self) -> u32 {
        self.nanosecond / 1_000_000
    }

    pub fn microsecond(&self) -> u32 {
        self.nanosecond / 1_000
    }

    pub fn nanos_of_day(&self) -> i64 {
        (self.hour as i64 * 3_600 + self.minute as i64 * 60 + self.second as i64) * 1_000_000_000
            + self.nanosecond as i64
    }

    pub fn to_iso(&self) -> String {
        if self.nanosecond == 0 {
            format!("{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
        } else {
            format!(
                "{:02}:{:02}:{:02}.{:09}",
                self.hour, self.minute, self.second, self.nanosecond
            )
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let naive = parse_naive_time(s)?;
        Some(Self {
            hour: naive.hour(),
            minute: naive.minute(),
            second: naive.second(),
            nanosecond: naive.nanosecond(),
        })
    }
}

fn parse_naive_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f").ok().or_else(|| NaiveTime::parse_from_str(s, "%H:%M").ok())
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TimeValue {
    pub time: LocalTimeValue,
    pub offset_minutes: i32,
    pub zone: Option<String>,
}

impl TimeValue {
    pub fn to_iso(&self) -> String {
        format!("{}{}", self.time.to_iso(), format_offset(self.offset_minutes))
    }

    pub fn parse(s: &str) -> Option<Self> {
        let offset_idx = find_offset_split(s)?;
        let (time_part, offset_part) = s.split_at(offset_idx);
        Some(Self {
            time: LocalTimeValue::parse(time_part)?,
            offset_minutes: parse_offset(offset_part)?,
            zone: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LocalDateTimeValue {
    pub date: DateValue,
    pub time: LocalTimeValue,
}

impl LocalDateTimeValue {
    pub fn naive(&self) -> NaiveDateTime {
        self.date
            .naive()
            .and_hms_nano_opt(self.time.hour, self.time.minute, self.time.second, self.time.nanosecond)
            .expect("validated on construction")
    }

    pub fn from_naive(naive: NaiveDateTime) -> Self {
        Self {
            date: DateValue {
                year: naive.year(),
                month: naive.month(),
                day: naive.day(),
            },
            time: LocalTimeValue {
                hour: naive.hour(),
                minute: naive.minute(),
                second: naive.second(),
                nanosecond: naive.nanosecond(),
            },
        }
    }

    pub fn to_iso(&self) -> String {
        format!("{}T{}", self.date.to_iso(), self.time.to_iso())
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (date_part, time_part) = s.split_once('T').or_else(|| s.split_once(' '))?;
        Some(Self {
            date: DateValue::parse(date_part)?,
            time: LocalTimeValue::parse(time_part)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DateTimeValue {
    pub local: LocalDateTimeValue,
    pub offset_minutes: i32,
    pub zone: Option<String>,
}

impl DateTimeValue {
    pub fn epoch_seconds(&self) -> i64 {
        self.local.naive().and_utc().timestamp() - self.offset_minutes as i64 * 60
    }

    pub fn epoch_millis(&self) -> i64 {
        self.epoch_seconds() * 1000 + (self.local.time.nanosecond / 1_000_000) as i64
    }

    pub fn to_iso(&self) -> String {
        let base = format!("{}{}", self.local.to_iso(), format_offset(self.offset_minutes));
        match &self.zone {
            Some(zone) => format!("{base}[{zone}]"),
            None => base,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (zone, rest) = if let Some(stripped) = s.strip_suffix(']') {
            let bracket = stripped.rfind('[')?;
            (Some(stripped[bracket + 1..].to_string()), &s[..bracket])
        } else {
            (None, s)
        };
        let offset_idx = find_offset_split(rest)?;
        let (dt_part, offset_part) = rest.split_at(offset_idx);
        let local = LocalDateTimeValue::parse(dt_part)?;
        let offset_minutes = parse_offset(offset_part)?;
        Some(Self {
            local,
            offset_minutes,
            zone,
        })
    }

    pub fn with_zone(local: LocalDateTimeValue, tz_name: &str) -> Self {
        let offset_minutes = zone_offset_minutes(tz_name, local.naive());
        Self {
            local,
            offset_minutes,
            zone: Some(tz_name.to_string()),
        }
    }

    pub fn from_epoch(seconds: i64, nanos: u32) -> Self {
        let naive = chrono::DateTime::from_timestamp(seconds, nanos)
            .expect("valid unix timestamp")
            .naive_utc();
        Self {
            local: LocalDateTimeValue::from_naive(naive),
            offset_minutes: 0,
            zone: None,
        }
    }

    pub fn from_epoch_millis(millis: i64) -> Self {
        Self::from_epoch(millis.div_euclid(1000), (millis.rem_euclid(1000) * 1_000_000) as u32)
    }
}

/// Resolves the UTC offset for a named zone at the given local wall-clock
/// instant. Only `Europe/Stockholm` honors real DST rules (spec §4.9); any
/// other name falls back to a fixed UTC+0 offset.
fn zone_offset_minutes(tz_name: &str, naive_local: NaiveDateTime) -> i32 {
    if tz_name.eq_ignore_ascii_case("Europe/Stockholm") {
        let tz: Tz = chrono_tz::Europe::Stockholm;
        match tz.from_local_datetime(&naive_local).single() {
            Some(dt) => dt.offset().fix().local_minus_utc() / 60,
            None => 0,
        }
    } else {
        0
    }
}

fn format_offset(minutes: i32) -> String {
    if minutes == 0 {
        return "Z".to_string();
    }
    let sign = if minutes < 0 { '-' } else { '+' };
    let abs = minutes.unsigned_abs();
    format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
}

fn find_offset_split(s: &str) -> Option<usize> {
    if s.ends_with('Z') {
        return Some(s.len() - 1);
    }
    // offsets look like +HH:MM / -HH:MM; search after the date/time part.
    let bytes = s.as_bytes();
    for i in (1..bytes.len()).rev() {
        if bytes[i] == b'+' || (bytes[i] == b'-' && i > 10) {
            return Some(i);
        }
    }
    None
}

fn parse_offset(s: &str) -> Option<i32> {
    if s == "Z" || s.is_empty() {
        return Some(0);
    }
    let sign = if s.starts_with('-') { -1 } else { 1 };
    let rest = &s[1..];
    let (h, m) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = h.parse().ok()?;
    let minutes: i32 = m.parse().ok()?;
    Some(sign * (hours * 60 + minutes))
}

/// Normalized (months, days, seconds, nanoseconds) duration, each field
/// independently signed per spec §4.9 (nanoseconds kept in `[0, 1e9)` by
/// borrowing from seconds, matching chrono's own normalization contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct DurationValue {
    pub months: i64,
    pub days: i64,
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl DurationValue {
    /// Builds a duration from raw component totals, normalizing nanoseconds
    /// into `[0, 1e9)` by borrowing whole seconds (spec §4.9).
    pub fn normalized(months: i64, days: i64, seconds: i64, nanoseconds: i64) -> Self {
        let extra_seconds = nanoseconds.div_euclid(1_000_000_000);
        let nanoseconds = nanoseconds.rem_euclid(1_000_000_000) as u32;
        Self {
            months,
            days,
            seconds: seconds + extra_seconds,
            nanoseconds,
        }
    }

    /// Parses the canonical ISO-8601 duration form (`P1Y2M3DT1H1M1S`).
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix('P')?;
        let (date_part, time_part) = match rest.split_once('T') {
            Some((d, t)) => (d, Some(t)),
            None => (rest, None),
        };
        let mut months = 0i64;
        let mut days = 0i64;
        let mut num = String::new();
        for c in date_part.chars() {
            if c.is_ascii_digit() || c == '-' {
                num.push(c);
                continue;
            }
            let n: i64 = num.parse().ok()?;
            num.clear();
            match c {
                'Y' => months += n * 12,
                'M' => months += n,
                'W' => days += n * 7,
                'D' => days += n,
                _ => return None,
            }
        }
        let mut seconds = 0i64;
        let mut nanoseconds = 0i64;
        if let Some(time_part) = time_part {
            let mut num = String::new();
            for c in time_part.chars() {
                if c.is_ascii_digit() || c == '-' || c == '.' {
                    num.push(c);
                    continue;
                }
                match c {
                    'H' => {
                        seconds += num.parse::<i64>().ok()? * 3_600;
                        num.clear();
                    }
                    'M' => {
                        seconds += num.parse::<i64>().ok()? * 60;
                        num.clear();
                    }
                    'S' => {
                        let value: f64 = num.parse().ok()?;
                        seconds += value.trunc() as i64;
                        nanoseconds += (value.fract() * 1_000_000_000.0).round() as i64;
                        num.clear();
                    }
                    _ => return None,
                }
            }
        }
        Some(Self::normalized(months, days, seconds, nanoseconds))
    }

    pub fn years(&self) -> i64 {
        self.months / 12
    }

    pub fn quarters(&self) -> i64 {
        self.months / 3
    }

    pub fn weeks(&self) -> i64 {
        self.days / 7
    }

    pub fn hours(&self) -> i64 {
        self.seconds / 3_600
    }

    pub fn minutes(&self) -> i64 {
        self.seconds / 60
    }

    pub fn months_of_year(&self) -> i64 {
        self.months % 12
    }

    pub fn days_of_week(&self) -> i64 {
        self.days % 7
    }

    pub fn minutes_of_hour(&self) -> i64 {
        (self.seconds / 60) % 60
    }

    pub fn seconds_of_minute(&self) -> i64 {
        self.seconds % 60
    }

    pub fn to_iso(&self) -> String {
        let mut out = String::from("P");
        let years = self.months / 12;
        let months = self.months % 12;
        if years != 0 {
            out.push_str(&format!("{years}Y"));
        }
        if months != 0 {
            out.push_str(&format!("{months}M"));
        }
        if self.days != 0 {
            out.push_str(&format!("{}D", self.days));
        }
        let has_time = self.seconds != 0 || self.nanoseconds != 0;
        if has_time {
            out.push('T');
            let hours = self.seconds / 3_600;
            let minutes = (self.seconds % 3_600) / 60;
            let secs = self.seconds % 60;
            if hours != 0 {
                out.push_str(&format!("{hours}H"));
            }
            if minutes != 0 {
                out.push_str(&format!("{minutes}M"));
            }
            if secs != 0 || self.nanoseconds != 0 || out.ends_with('T') {
                if self.nanoseconds != 0 {
                    out.push_str(&format!("{secs}.{:09}S", self.nanoseconds));
                } else {
                    out.push_str(&format!("{secs}S"));
                }
            }
        }
        if out == "P" {
            out.push_str("T0S");
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum TemporalValue {
    Date(DateValue),
    LocalTime(LocalTimeValue),
    Time(TimeValue),
    LocalDateTime(LocalDateTimeValue),
    DateTime(DateTimeValue),
    Duration(DurationValue),
}

impl TemporalValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TemporalValue::Date(_) => "date",
            TemporalValue::LocalTime(_) => "localtime",
            TemporalValue::Time(_) => "time",
            TemporalValue::LocalDateTime(_) => "localdatetime",
            TemporalValue::DateTime(_) => "datetime",
            TemporalValue::Duration(_) => "duration",
        }
    }

    pub fn to_iso(&self) -> String {
        match self {
            TemporalValue::Date(d) => d.to_iso(),
            TemporalValue::LocalTime(t) => t.to_iso(),
            TemporalValue::Time(t) => t.to_iso(),
            TemporalValue::LocalDateTime(dt) => dt.to_iso(),
            TemporalValue::DateTime(dt) => dt.to_iso(),
            TemporalValue::Duration(d) => d.to_iso(),
        }
    }

    /// A same-kind-comparable integer rank (spec §4.8: "temporal kinds
    /// compare within kind using canonical ordering"). Kinds are never
    /// compared against each other; the comparator falls back to string
    /// form for cross-kind pairs.
    pub fn order_rank(&self) -> i128 {
        match self {
            TemporalValue::Date(d) => d.naive().and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp() as i128,
            TemporalValue::LocalTime(t) => t.nanos_of_day() as i128,
            TemporalValue::Time(t) => t.time.nanos_of_day() as i128 - t.offset_minutes as i128 * 60_000_000_000,
            TemporalValue::LocalDateTime(dt) => dt.naive().and_utc().timestamp_nanos_opt().unwrap_or_default() as i128,
            TemporalValue::DateTime(dt) => dt.epoch_millis() as i128,
            TemporalValue::Duration(d) => {
                d.months as i128 * 2_629_800_000_000_000i128
                    + d.days as i128 * 86_400_000_000_000i128
                    + d.seconds as i128 * 1_000_000_000i128
                    + d.nanoseconds as i128
            }
        }
    }

    /// UTC-normalized instant used for cross-kind comparisons of zoned
    /// values (spec §4.9: "comparisons go through a UTC normalization for
    /// zoned kinds").
    pub fn canonical_key(&self) -> String {
        match self {
            TemporalValue::Date(d) => format!("date:{}", d.to_iso()),
            TemporalValue::LocalTime(t) => format!("localtime:{:020}", t.nanos_of_day()),
            TemporalValue::Time(t) => {
                let utc_nanos = t.time.nanos_of_day() - t.offset_minutes as i64 * 60_000_000_000;
                format!("time:{utc_nanos:020}")
            }
            TemporalValue::LocalDateTime(dt) => format!("localdatetime:{}", dt.naive().and_utc().timestamp_nanos_opt().unwrap_or_default()),
            TemporalValue::DateTime(dt) => format!("datetime:{}", dt.epoch_millis()),
            TemporalValue::Duration(d) => format!("duration:{}:{}:{}:{}", d.months, d.days, d.seconds, d.nanoseconds),
        }
    }
}

impl fmt::Display for TemporalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iso())
    }
}

/// `duration.between(a, b)`: aligns months first, then days, then the
/// sub-day remainder (spec §4.9). Calendar month alignment walks whole
/// months via clamped year/month arithmetic (mirroring `java.time.Period`'s
/// "largest whole unit first" rule) before the remaining days and the
/// sub-day instant are taken from the leftover.
pub fn duration_between(a: &LocalDateTimeValue, b: &LocalDateTimeValue) -> DurationValue {
    let a_naive = a.naive();
    let b_naive = b.naive();
    if b_naive < a_naive {
        let forward = duration_between_ordered(b_naive, a_naive);
        return DurationValue::normalized(-forward.months, -forward.days, -forward.seconds, -(forward.nanoseconds as i64));
    }
    duration_between_ordered(a_naive, b_naive)
}

fn duration_between_ordered(start: NaiveDateTime, end: NaiveDateTime) -> DurationValue {
    let start_date = start.date();
    let end_date = end.date();
    let mut months = (end_date.year() as i64 - start_date.year() as i64) * 12
        + (end_date.month() as i64 - start_date.month() as i64);
    let mut anchor_date = add_months_clamped(start_date, months);
    if anchor_date > end_date || (anchor_date == end_date && start.time() > end.time()) {
        months -= 1;
        anchor_date = add_months_clamped(start_date, months);
    }
    let anchor = NaiveDateTime::new(anchor_date, start.time());
    let remaining = end - anchor;
    let days = remaining.num_days();
    let sub = remaining - chrono::Duration::days(days);
    let seconds = sub.num_seconds();
    let nanoseconds = (sub - chrono::Duration::seconds(seconds)).num_nanoseconds().unwrap_or(0);
    DurationValue::normalized(months, days, seconds, nanoseconds)
}

/// Adds `months` to `date`, clamping the day-of-month to the target
/// month's length (e.g. Jan 31 + 1 month = Feb 28/29).
fn add_months_clamped(date: NaiveDate, months: i64) -> NaiveDate {
    let total = date.year() as i64 * 12 + (date.month() as i64 - 1) + months;
    let year = total.div_euclid(12) as i32;
    let month = (total.rem_euclid(12) + 1) as u32;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid calendar date");
    (next - NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar date")).num_days() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_round_trips_through_iso() {
        let d = DateValue::parse("2024-03-05").unwrap();
        assert_eq!(d.to_iso(), "2024-03-05");
        assert_eq!(d.quarter(), 1);
    }

    #[test]
    fn duration_iso_renders_compound_form() {
        let d = DurationValue {
            months: 14,
            days: 3,
            seconds: 3661,
            nanoseconds: 0,
        };
        assert_eq!(d.to_iso(), "P1Y2M3DT1H1M1S");
    }

    #[test]
    fn duration_between_aligns_whole_months_before_days() {
        let a = LocalDateTimeValue::parse("2024-01-01T00:00:00").unwrap();
        let b = LocalDateTimeValue::parse("2024-03-01T00:00:00").unwrap();
        let d = duration_between(&a, &b);
        assert_eq!(d.months, 2);
        assert_eq!(d.days, 0);
        assert_eq!(d.seconds, 0);
    }

    #[test]
    fn duration_between_leaves_partial_month_as_days() {
        let a = LocalDateTimeValue::parse("2024-01-15T00:00:00").unwrap();
        let b = LocalDateTimeValue::parse("2024-03-01T00:00:00").unwrap();
        let d = duration_between(&a, &b);
        // Jan 15 -> Feb 15 is one whole month; Feb 15 -> Mar 1 is 15 days.
        assert_eq!(d.months, 1);
        assert_eq!(d.days, 15);
    }

    #[test]
    fn duration_between_leaves_sub_day_remainder() {
        let a = LocalDateTimeValue::parse("2024-01-01T10:00:00").unwrap();
        let b = LocalDateTimeValue::parse("2024-01-02T08:00:00").unwrap();
        let d = duration_between(&a, &b);
        assert_eq!(d.months, 0);
        assert_eq!(d.days, 0);
        assert_eq!(d.seconds, 22 * 3600);
    }

    #[test]
    fn duration_between_is_negative_when_a_is_after_b() {
        let a = LocalDateTimeValue::parse("2024-03-01T00:00:00").unwrap();
        let b = LocalDateTimeValue::parse("2024-01-01T00:00:00").unwrap();
        let d = duration_between(&a, &b);
        assert_eq!(d.months, -2);
        assert_eq!(d.days, 0);
    }

    #[test]
    fn datetime_with_stockholm_zone_applies_dst_offset() {
        let local = LocalDateTimeValue {
            date: DateValue {
                year: 2024,
                month: 7,
                day: 1,
            },
            time: LocalTimeValue {
                hour: 12,
                minute: 0,
                second: 0,
                nanosecond: 0,
            },
        };
        let dt = DateTimeValue::with_zone(local, "Europe/Stockholm");
        assert_eq!(dt.offset_minutes, 120);
    }

    #[test]
    fn epoch_millis_round_trips() {
        let dt = DateTimeValue::from_epoch_millis(1_700_000_000_123);
        assert_eq!(dt.epoch_millis(), 1_700_000_000_123);
    }
}
