//! Date-phrase resolution for attendance queries.
//!
//! The model passes a `date_type` such as `today`, `this_month` or
//! `month_04_2025`; this module turns it into an inclusive date range.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

const DATE_FORMAT: &str = "%Y-%m-%d";
const RECENT_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(serialize_with = "serialize_date")]
    pub start_date: NaiveDate,
    #[serde(serialize_with = "serialize_date")]
    pub end_date: NaiveDate,
}

fn serialize_date<S: serde::Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format(DATE_FORMAT))
}

impl DateRange {
    pub const fn single(day: NaiveDate) -> Self {
        Self {
            start_date: day,
            end_date: day,
        }
    }

    /// Resolves a date phrase against `today`. Unrecognised phrases fall back
    /// to the last seven days.
    pub fn resolve(phrase: &str, today: NaiveDate) -> Self {
        let phrase = phrase.trim().to_ascii_lowercase();
        match phrase.as_str() {
            "today" => Self::single(today),
            "yesterday" => Self::single(today - Duration::days(1)),
            "recent" | "" => Self::recent(today),
            "this_month" => Self {
                start_date: first_of_month(today),
                end_date: today,
            },
            "previous_month" => {
                let end_date = first_of_month(today) - Duration::days(1);
                Self {
                    start_date: first_of_month(end_date),
                    end_date,
                }
            }
            other => Self::parse_explicit(other).unwrap_or_else(|| Self::recent(today)),
        }
    }

    fn recent(today: NaiveDate) -> Self {
        Self {
            start_date: today - Duration::days(RECENT_DAYS),
            end_date: today,
        }
    }

    fn parse_explicit(phrase: &str) -> Option<Self> {
        if let Some(rest) = phrase.strip_prefix("month_") {
            let (month, year) = rest.split_once('_')?;
            let start_date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)?;
            return Some(Self {
                start_date,
                end_date: last_of_month(start_date),
            });
        }

        if let Some((from, to)) = phrase.split_once(':') {
            let a = NaiveDate::parse_from_str(from.trim(), DATE_FORMAT).ok()?;
            let b = NaiveDate::parse_from_str(to.trim(), DATE_FORMAT).ok()?;
            return Some(Self {
                start_date: a.min(b),
                end_date: a.max(b),
            });
        }

        NaiveDate::parse_from_str(phrase, DATE_FORMAT)
            .ok()
            .map(Self::single)
    }

    pub fn start(&self) -> String {
        self.start_date.format(DATE_FORMAT).to_string()
    }

    pub fn end(&self) -> String {
        self.end_date.format(DATE_FORMAT).to_string()
    }

    /// Human description used as the report heading.
    pub fn describe(&self, today: NaiveDate) -> String {
        if self.start_date == self.end_date {
            return format!("today ({})", self.start());
        }
        if self.start_date.year() == today.year() && self.start_date.month() == today.month() {
            return format!("this month ({})", self.start_date.format("%B %Y"));
        }
        format!("from {} to {}", self.start(), self.end())
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start(), self.end())
    }
}

fn first_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

fn last_of_month(first: NaiveDate) -> NaiveDate {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    next.map_or(first, |n| n - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn relative_phrases() {
        let today = d(2025, 4, 16);
        assert_eq!(DateRange::resolve("today", today), DateRange::single(today));
        assert_eq!(DateRange::resolve("Yesterday", today), DateRange::single(d(2025, 4, 15)));

        let recent = DateRange::resolve("recent", today);
        assert_eq!(recent.start_date, d(2025, 4, 9));
        assert_eq!(recent.end_date, today);

        let month = DateRange::resolve("this_month", today);
        assert_eq!(month.start(), "2025-04-01");
        assert_eq!(month.end(), "2025-04-16");
    }

    #[test]
    fn previous_month_crosses_year_boundary() {
        let range = DateRange::resolve("previous_month", d(2025, 1, 10));
        assert_eq!(range.start_date, d(2024, 12, 1));
        assert_eq!(range.end_date, d(2024, 12, 31));
    }

    #[test]
    fn explicit_dates_months_and_ranges() {
        let today = d(2025, 4, 16);
        assert_eq!(
            DateRange::resolve("2025-03-03", today),
            DateRange::single(d(2025, 3, 3))
        );

        let feb = DateRange::resolve("month_02_2024", today);
        assert_eq!(feb.start_date, d(2024, 2, 1));
        assert_eq!(feb.end_date, d(2024, 2, 29));

        let dec = DateRange::resolve("month_12_2024", today);
        assert_eq!(dec.end_date, d(2024, 12, 31));

        let reversed = DateRange::resolve("2025-03-10:2025-03-01", today);
        assert_eq!(reversed.start_date, d(2025, 3, 1));
        assert_eq!(reversed.end_date, d(2025, 3, 10));
    }

    #[test]
    fn garbage_falls_back_to_recent() {
        let today = d(2025, 4, 16);
        for phrase in ["", "last fortnight", "month_13_2025", "2025-02-30"] {
            assert_eq!(DateRange::resolve(phrase, today), DateRange::recent(today), "{phrase}");
        }
    }

    #[test]
    fn descriptions() {
        let today = d(2025, 4, 16);
        assert_eq!(DateRange::single(today).describe(today), "today (2025-04-16)");
        assert_eq!(
            DateRange::resolve("this_month", today).describe(today),
            "this month (April 2025)"
        );
        assert_eq!(
            DateRange::resolve("month_02_2025", today).describe(today),
            "from 2025-02-01 to 2025-02-28"
        );
    }

    #[test]
    fn serializes_as_plain_dates() {
        let json = serde_json::to_value(DateRange::single(d(2025, 4, 1))).unwrap();
        assert_eq!(json["start_date"], "2025-04-01");
        assert_eq!(json["end_date"], "2025-04-01");
    }
}
