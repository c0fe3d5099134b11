//! Natural-language date resolution
//!
//! Understands relative days ("today", "yesterday", "3 days ago", "last
//! friday", Hebrew equivalents) and absolute dates ("March 3rd", "3 march
//! 2024", "2024-03-03", "3/3/2024" read day-first). When several expressions
//! occur, the one that appears first in the text wins. Absolute dates
//! resolve to noon UTC; relative ones keep the reference time of day.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use lazy_static::lazy_static;
use regex::Regex;

pub(crate) const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";
pub(crate) const WEEKDAYS: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";

lazy_static! {
    static ref DAYS_AGO_RE: Regex = Regex::new(r"\b(\d{1,3})\s+days?\s+ago\b").unwrap();
    static ref HEBREW_DAYS_AGO_RE: Regex = Regex::new(r"לפני\s+(\d{1,3})\s+ימים").unwrap();
    static ref WEEKDAY_RE: Regex =
        Regex::new(&format!(r"\b(last\s+)?({})\b", WEEKDAYS)).unwrap();
    static ref ISO_RE: Regex = Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap();
    static ref SLASH_RE: Regex = Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b").unwrap();
    static ref MONTH_DAY_RE: Regex = Regex::new(&format!(
        r"\b({})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?(?:,?\s+(\d{{4}}))?\b",
        MONTHS
    ))
    .unwrap();
    static ref DAY_MONTH_RE: Regex = Regex::new(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({})\b(?:,?\s+(\d{{4}}))?",
        MONTHS
    ))
    .unwrap();
}

/// Fixed phrases and their offset in days from the reference time
const RELATIVE_PHRASES: &[(&str, i64)] = &[
    ("day before yesterday", -2),
    ("שלשום", -2),
    ("yesterday", -1),
    ("אתמול", -1),
    ("today", 0),
    ("tonight", 0),
    ("this morning", 0),
    ("היום", 0),
    ("tomorrow", 1),
    ("מחר", 1),
];

/// Resolve the first date expression in the lower-cased `text`
pub fn resolve(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut candidates: Vec<(usize, DateTime<Utc>)> = Vec::new();

    // Longer phrases are listed first so "day before yesterday" shadows "yesterday"
    let mut claimed: Vec<std::ops::Range<usize>> = Vec::new();
    for (phrase, offset) in RELATIVE_PHRASES {
        for (start, _) in text.match_indices(phrase) {
            let range = start..start + phrase.len();
            if claimed.iter().any(|r| r.start < range.end && range.start < r.end) {
                continue;
            }
            claimed.push(range);
            candidates.push((start, now + Duration::days(*offset)));
        }
    }

    for re in [&*DAYS_AGO_RE, &*HEBREW_DAYS_AGO_RE] {
        if let Some(caps) = re.captures(text) {
            if let Ok(days) = caps[1].parse::<i64>() {
                candidates.push((caps.get(0).map_or(0, |m| m.start()), now - Duration::days(days)));
            }
        }
    }

    if let Some(caps) = WEEKDAY_RE.captures(text) {
        if let Some(weekday) = parse_weekday(&caps[2]) {
            let strictly_before = caps.get(1).is_some();
            let date = previous_weekday(now.date_naive(), weekday, strictly_before);
            let start = caps.get(0).map_or(0, |m| m.start());
            candidates.push((start, with_time_of(date, now)));
        }
    }

    if let Some(caps) = ISO_RE.captures(text) {
        let parsed = (
            caps[1].parse::<i32>(),
            caps[2].parse::<u32>(),
            caps[3].parse::<u32>(),
        );
        if let (Ok(year), Ok(month), Ok(day)) = parsed {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                candidates.push((caps.get(0).map_or(0, |m| m.start()), at_noon(date)));
            }
        }
    }

    if let Some(caps) = SLASH_RE.captures(text) {
        let day = caps[1].parse::<u32>().ok();
        let month = caps[2].parse::<u32>().ok();
        let year = caps.get(3).and_then(|y| y.as_str().parse::<i32>().ok());
        if let (Some(day), Some(month)) = (day, month) {
            if let Some(date) = build_date(day, month, year, now) {
                candidates.push((caps.get(0).map_or(0, |m| m.start()), at_noon(date)));
            }
        }
    }

    if let Some(caps) = MONTH_DAY_RE.captures(text) {
        let month = month_number(&caps[1]);
        let day = caps[2].parse::<u32>().ok();
        let year = caps.get(3).and_then(|y| y.as_str().parse::<i32>().ok());
        if let (Some(month), Some(day)) = (month, day) {
            if let Some(date) = build_date(day, month, year, now) {
                candidates.push((caps.get(0).map_or(0, |m| m.start()), at_noon(date)));
            }
        }
    }

    if let Some(caps) = DAY_MONTH_RE.captures(text) {
        let day = caps[1].parse::<u32>().ok();
        let month = month_number(&caps[2]);
        let year = caps.get(3).and_then(|y| y.as_str().parse::<i32>().ok());
        if let (Some(day), Some(month)) = (day, month) {
            if let Some(date) = build_date(day, month, year, now) {
                candidates.push((caps.get(0).map_or(0, |m| m.start()), at_noon(date)));
            }
        }
    }

    candidates
        .into_iter()
        .min_by_key(|(start, _)| *start)
        .map(|(_, date)| date)
}

fn month_number(name: &str) -> Option<u32> {
    let month = match &name[..3.min(name.len())] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    name.parse::<Weekday>().ok()
}

/// Most recent `weekday` on or before `today` (strictly before when asked)
fn previous_weekday(today: NaiveDate, weekday: Weekday, strictly_before: bool) -> NaiveDate {
    let today_idx = today.weekday().num_days_from_monday() as i64;
    let target_idx = weekday.num_days_from_monday() as i64;
    let mut back = (today_idx - target_idx).rem_euclid(7);
    if back == 0 && strictly_before {
        back = 7;
    }
    today - Duration::days(back)
}

/// Dates without a year land in the past: this year, or last year if that is still ahead
fn build_date(day: u32, month: u32, year: Option<i32>, now: DateTime<Utc>) -> Option<NaiveDate> {
    match year {
        Some(y) => {
            let y = if y < 100 { 2000 + y } else { y };
            NaiveDate::from_ymd_opt(y, month, day)
        }
        None => {
            let this_year = NaiveDate::from_ymd_opt(now.year(), month, day)?;
            if this_year > now.date_naive() {
                NaiveDate::from_ymd_opt(now.year() - 1, month, day)
            } else {
                Some(this_year)
            }
        }
    }
}

fn at_noon(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap_or_default())
}

fn with_time_of(date: NaiveDate, reference: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(reference.time()))
}
