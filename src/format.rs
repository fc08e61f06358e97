//! Plain-text attendance reports.
//!
//! Tool results carry this text in `formatted_response`; the browser client
//! turns its `*` / `**` markers into HTML.

use std::{collections::HashMap, fmt::Write as _};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use serde_json::Value;

use crate::dates::DateRange;

const TEAM_LIST_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "checkIn")]
    pub checkin: Option<String>,
    #[serde(default, alias = "checkOut")]
    pub checkout: Option<String>,
    #[serde(default)]
    pub shift_start_time: Option<String>,
}

/// Extracts records from either a bare array or an object wrapping one in
/// `data`. Entries that are not records are ignored.
pub fn parse_records(data: &Value) -> Vec<AttendanceRecord> {
    let items = match data {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => obj
            .get("data")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice),
        _ => &[],
    };
    items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct LateDay {
    pub date: NaiveDate,
    pub late_minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceStats {
    pub present_days: Vec<(NaiveDate, f64)>,
    pub absent_days: Vec<NaiveDate>,
    pub missing_check_in_out: Vec<NaiveDate>,
    pub late_comings: Vec<LateDay>,
    pub total_work_hours: f64,
}

impl AttendanceStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Self {
        let mut stats = Self::default();

        for record in records {
            let Some(date) = record_date(record) else {
                continue;
            };
            let status = record.status.as_deref().unwrap_or("Unknown").to_ascii_lowercase();

            if status == "absent" {
                stats.absent_days.push(date);
                continue;
            }
            if status != "present" {
                continue;
            }

            let punches = record
                .checkin
                .as_deref()
                .and_then(parse_timestamp)
                .zip(record.checkout.as_deref().and_then(parse_timestamp));

            let Some((checkin, checkout)) = punches else {
                stats.missing_check_in_out.push(date);
                continue;
            };

            #[allow(clippy::cast_precision_loss)]
            let hours = (checkout - checkin).num_seconds() as f64 / 3600.0;
            stats.total_work_hours += hours;

            if let Some(shift_start) = record
                .shift_start_time
                .as_deref()
                .and_then(parse_time)
                .map(|t| date.and_time(t))
            {
                if checkin > shift_start {
                    #[allow(clippy::cast_possible_truncation)]
                    let late_minutes =
                        ((checkin - shift_start).num_seconds() as f64 / 60.0).round() as i64;
                    if late_minutes > 0 {
                        stats.late_comings.push(LateDay { date, late_minutes });
                    }
                }
            }

            stats.present_days.push((date, hours));
        }

        stats
    }

    fn tracked_days(&self) -> usize {
        self.present_days.len() + self.absent_days.len()
    }

    /// Present days over present plus absent days, if any were tracked.
    #[allow(clippy::cast_precision_loss)]
    pub fn attendance_rate(&self) -> Option<f64> {
        let total = self.tracked_days();
        (total > 0).then(|| self.present_days.len() as f64 / total as f64)
    }
}

fn record_date(record: &AttendanceRecord) -> Option<NaiveDate> {
    let raw = record
        .date
        .as_deref()
        .filter(|d| !d.is_empty())
        .or(record.checkin.as_deref())?;
    let day = raw.split('T').next()?;
    NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d").ok()
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn day_line(date: NaiveDate) -> String {
    format!("   * {} - {}\n", date.format("%Y-%m-%d"), date.format("%A"))
}

fn push_days(out: &mut String, days: &[NaiveDate], limit: Option<usize>) {
    let shown = limit.map_or(days.len(), |l| l.min(days.len()));
    for date in &days[..shown] {
        out.push_str(&day_line(*date));
    }
    if days.len() > shown {
        let _ = writeln!(out, "   * ... and {} more days", days.len() - shown);
    }
}

fn push_stats(out: &mut String, stats: &AttendanceStats, limit: Option<usize>) {
    let _ = writeln!(out, "* Total Present Days: {}", stats.present_days.len());

    let _ = writeln!(out, "* Total Absent Days: {}", stats.absent_days.len());
    push_days(out, &stats.absent_days, limit);

    let _ = writeln!(
        out,
        "* Total Missing Check In/Out: {}",
        stats.missing_check_in_out.len()
    );
    push_days(out, &stats.missing_check_in_out, limit);

    let _ = writeln!(out, "* Late Comings: {}", stats.late_comings.len());
    let late = &stats.late_comings;
    let shown = limit.map_or(late.len(), |l| l.min(late.len()));
    for day in &late[..shown] {
        let _ = writeln!(
            out,
            "   * {} - {} - {} min",
            day.date.format("%Y-%m-%d"),
            day.date.format("%A"),
            day.late_minutes
        );
    }
    if late.len() > shown {
        let _ = writeln!(out, "   * ... and {} more days", late.len() - shown);
    }
}

pub fn format_personal(records: &[AttendanceRecord], range: &DateRange, today: NaiveDate) -> String {
    if records.is_empty() {
        return "No attendance data available for the requested period.".to_string();
    }

    let stats = AttendanceStats::from_records(records);
    let mut out = format!(
        "Here's your attendance record for {}:\n",
        range.describe(today)
    );
    push_stats(&mut out, &stats, None);
    out.push_str(&personal_analysis(&stats));
    out
}

fn personal_analysis(stats: &AttendanceStats) -> String {
    let mut out = String::from("\nAttendance Analysis:\n");

    if let Some(rate) = stats.attendance_rate() {
        let pct = (rate * 100.0).round();
        let _ = match pct {
            p if p >= 90.0 => writeln!(
                out,
                "✅ Excellent attendance rate! You've been present for {p}% of working days."
            ),
            p if p >= 80.0 => writeln!(out, "👍 Good attendance rate at {p}% of working days."),
            p if p >= 70.0 => writeln!(
                out,
                "⚠️ Your attendance rate is {p}%, which could be improved."
            ),
            p => writeln!(
                out,
                "❗ Your attendance rate is low at {p}%. Please try to improve."
            ),
        };
    }

    match stats.late_comings.len() {
        0 if !stats.present_days.is_empty() => {
            out.push_str("✅ Great job arriving on time every day!\n");
        }
        0 => {}
        n if n > 3 => {
            let _ = writeln!(out, "❗ You have {n} late arrivals. Please try to arrive on time.");
        }
        n => {
            let _ = writeln!(out, "⚠️ You have {n} late arrival(s).");
        }
    }

    if !stats.missing_check_in_out.is_empty() {
        let _ = writeln!(
            out,
            "⚠️ You have {} day(s) with missing check-in or check-out records.",
            stats.missing_check_in_out.len()
        );
    }

    out
}

#[derive(Debug, Clone)]
struct MemberAttendance {
    employee_id: String,
    name: String,
    stats: AttendanceStats,
}

/// Groups records per team member, preserving first-seen order.
fn group_by_member(records: &[AttendanceRecord], team: &Value) -> Vec<MemberAttendance> {
    let names: HashMap<&str, String> = team
        .get("teamData")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|member| {
            let id = member.get("employeeId")?.as_str()?;
            let first = member.get("firstName")?.as_str()?;
            let last = member.get("lastName").and_then(Value::as_str).unwrap_or_default();
            Some((id, format!("{first} {last}").trim().to_string()))
        })
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<&AttendanceRecord>> = HashMap::new();
    for record in records {
        let id = record.employee_id.as_deref().unwrap_or("unknown");
        grouped
            .entry(id)
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push(record);
    }

    order
        .into_iter()
        .map(|id| MemberAttendance {
            employee_id: id.to_string(),
            name: names
                .get(id)
                .cloned()
                .unwrap_or_else(|| format!("Employee {id}")),
            stats: AttendanceStats::from_records(grouped.remove(id).unwrap_or_default()),
        })
        .collect()
}

pub fn format_team(
    records: &[AttendanceRecord],
    team: &Value,
    range: &DateRange,
    today: NaiveDate,
) -> String {
    if records.is_empty() {
        return "No team attendance data available for the requested period.".to_string();
    }

    let members = group_by_member(records, team);
    let mut out = format!(
        "Here's your team attendance record for {}:\n",
        range.describe(today)
    );
    for member in &members {
        let _ = writeln!(out, "** {} - {}", member.name, member.employee_id);
        push_stats(&mut out, &member.stats, Some(TEAM_LIST_LIMIT));
    }
    out.push_str(&team_analysis(&members));
    out
}

#[allow(clippy::cast_precision_loss)]
fn team_analysis(members: &[MemberAttendance]) -> String {
    if members.is_empty() {
        return String::new();
    }
    let mut out = String::from("\nTeam Attendance Analysis:\n");

    let present: usize = members.iter().map(|m| m.stats.present_days.len()).sum();
    let absent: usize = members.iter().map(|m| m.stats.absent_days.len()).sum();
    let late: usize = members.iter().map(|m| m.stats.late_comings.len()).sum();
    let count = members.len() as f64;

    if present + absent > 0 {
        let rate = (present as f64 / (present + absent) as f64 * 100.0).round();
        let _ = writeln!(out, "➡️ Overall team attendance rate: {rate}%");

        let avg_absences = (absent as f64 / count * 10.0).round() / 10.0;
        let _ = writeln!(out, "➡️ Average absences per team member: {avg_absences:.1} days");

        let avg_late = (late as f64 / count * 10.0).round() / 10.0;
        if avg_late > 0.0 {
            let _ = writeln!(out, "➡️ Average late arrivals per team member: {avg_late:.1}");
        }
    }

    if members.len() > 1 {
        let best = members
            .iter()
            .filter_map(|m| m.stats.attendance_rate().map(|r| (m, r)))
            .fold(None::<(&MemberAttendance, f64)>, |best, (m, r)| match best {
                Some((_, top)) if top >= r => best,
                _ => Some((m, r)),
            });
        if let Some((member, rate)) = best {
            if rate > 0.9 {
                let _ = writeln!(
                    out,
                    "🏆 {} has the best attendance record on your team.",
                    member.name
                );
            }
        }
    }

    out
}
