//! Organization-wide attendance report.
//!
//! Raw report rows are grouped company → branch → department → employee,
//! then summarised according to the requested [`ReportKind`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::dates::DateRange;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    #[default]
    All,
    Present,
    Absent,
    Late,
}

impl FromStr for ReportKind {
    type Err = std::convert::Infallible;

    /// Unknown kinds fall back to the full report.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "present" => Self::Present,
            "absent" => Self::Absent,
            "late" => Self::Late,
            _ => Self::All,
        })
    }
}

impl ReportKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
        }
    }

    fn counts(self, entry: &ReportEntry) -> bool {
        match self {
            Self::All => true,
            Self::Present => entry.status.eq_ignore_ascii_case("present"),
            Self::Absent => entry.status.eq_ignore_ascii_case("absent"),
            Self::Late => entry.late,
        }
    }
}

// Organization structure as returned by the HR API.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Company {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub branches: Vec<Branch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub branch_name: String,
    #[serde(default)]
    pub department_details: Vec<DepartmentGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentGroup {
    #[serde(default)]
    pub departments: Vec<Department>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[serde(default)]
    pub department_id: String,
    #[serde(default)]
    pub department_name: String,
}

impl Branch {
    fn departments(&self) -> impl Iterator<Item = &Department> {
        self.department_details.iter().flat_map(|g| g.departments.iter())
    }
}

/// Finds a company by id, or by case-insensitive name.
pub fn find_company<'a>(companies: &'a [Company], needle: &str) -> Option<&'a Company> {
    companies
        .iter()
        .find(|c| c.id == needle)
        .or_else(|| companies.iter().find(|c| c.name.eq_ignore_ascii_case(needle)))
}

fn find_branch<'a>(branches: &'a [Branch], needle: &str) -> Option<&'a Branch> {
    branches
        .iter()
        .find(|b| b.id == needle)
        .or_else(|| branches.iter().find(|b| b.branch_name.eq_ignore_ascii_case(needle)))
}

// One attendance row of the report endpoint.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(rename = "_id", default)]
    pub employee_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub punch_in: Option<Value>,
    #[serde(default)]
    pub punch_out: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub working_hours: Option<Value>,
    #[serde(default)]
    pub late: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub date: String,
    pub punch_in: Value,
    pub punch_out: Value,
    pub status: String,
    pub working_hours: f64,
    pub late: bool,
}

impl From<&ReportRow> for ReportEntry {
    fn from(row: &ReportRow) -> Self {
        let working_hours = match &row.working_hours {
            Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
            Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
            _ => 0.0,
        };
        Self {
            date: row.date.clone().unwrap_or_default(),
            punch_in: row.punch_in.clone().unwrap_or_else(|| json!("")),
            punch_out: row.punch_out.clone().unwrap_or_else(|| json!("")),
            status: row.status.clone().unwrap_or_default(),
            working_hours,
            late: row.late.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeAttendance {
    pub id: String,
    pub name: String,
    pub attendance: Vec<ReportEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentAttendance {
    pub id: String,
    pub name: String,
    pub employees: Vec<EmployeeAttendance>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchAttendance {
    pub id: String,
    pub name: String,
    pub departments: Vec<DepartmentAttendance>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyAttendance {
    pub id: String,
    pub name: String,
    pub branches: Vec<BranchAttendance>,
}

impl CompanyAttendance {
    fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.branches.iter().flat_map(BranchAttendance::entries)
    }
}

impl BranchAttendance {
    fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.departments.iter().flat_map(DepartmentAttendance::entries)
    }
}

impl DepartmentAttendance {
    fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.employees.iter().flat_map(|e| e.attendance.iter())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilters {
    pub company: Option<String>,
    pub branch: Option<String>,
    pub department: Option<String>,
}

/// Groups one company's rows by branch, department and employee.
///
/// Only branches matching `filters.branch` (id or name) are kept, and only
/// departments matching `filters.department` when given.
pub fn organize_company(company: &Company, rows: &[ReportRow], filters: &ReportFilters) -> CompanyAttendance {
    let selected: Vec<&Branch> = match filters.branch.as_deref() {
        Some(needle) => find_branch(&company.branches, needle).into_iter().collect(),
        None => company.branches.iter().collect(),
    };

    let mut branches: Vec<BranchAttendance> = selected
        .iter()
        .map(|b| BranchAttendance {
            id: b.id.clone(),
            name: non_empty(&b.branch_name, "Unknown Branch"),
            departments: Vec::new(),
        })
        .collect();

    let department_name = |department_id: &str| {
        company
            .branches
            .iter()
            .flat_map(Branch::departments)
            .find(|d| d.department_id == department_id)
            .map(|d| d.department_name.clone())
    };

    for row in rows {
        let Some(branch) = row
            .branch_id
            .as_deref()
            .and_then(|id| branches.iter_mut().find(|b| b.id == id))
        else {
            continue;
        };

        let department_id = row.department_id.clone().unwrap_or_default();
        let name = department_name(&department_id);
        if let Some(wanted) = filters.department.as_deref() {
            let matches = department_id == wanted
                || name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(wanted));
            if !matches {
                continue;
            }
        }

        let department = match branch.departments.iter().position(|d| d.id == department_id) {
            Some(idx) => &mut branch.departments[idx],
            None => {
                branch.departments.push(DepartmentAttendance {
                    id: department_id,
                    name: name.unwrap_or_else(|| "Unknown Department".to_string()),
                    employees: Vec::new(),
                });
                let last = branch.departments.len() - 1;
                &mut branch.departments[last]
            }
        };

        let employee = match department.employees.iter().position(|e| e.id == row.employee_id) {
            Some(idx) => &mut department.employees[idx],
            None => {
                department.employees.push(EmployeeAttendance {
                    id: row.employee_id.clone(),
                    name: row.name.clone().unwrap_or_else(|| "None".to_string()),
                    attendance: Vec::new(),
                });
                let last = department.employees.len() - 1;
                &mut department.employees[last]
            }
        };
        employee.attendance.push(ReportEntry::from(row));
    }

    // Drop branches without an id. Branches with an id but no rows stay, with no
    // departments.
    branches.retain(|b| !b.id.is_empty());

    CompanyAttendance {
        id: company.id.clone(),
        name: non_empty(&company.name, "Unknown Company"),
        branches,
    }
}

fn non_empty(value: &str, fallback: &str) -> String {
    if value.is_empty() { fallback.to_string() } else { value.to_string() }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn summarize(kind: ReportKind, companies: &[CompanyAttendance], range: &DateRange) -> Value {
    match kind {
        ReportKind::All => overall_summary(companies, range),
        other => status_summary(other, companies),
    }
}

fn overall_summary(companies: &[CompanyAttendance], range: &DateRange) -> Value {
    let mut status = [
        ("present", 0usize),
        ("absent", 0),
        ("half_day", 0),
        ("leave", 0),
        ("weekend", 0),
        ("holiday", 0),
        ("late", 0),
    ];
    let mut total_hours = 0.0;
    let mut records_with_hours = 0usize;
    let mut company_summaries = Vec::new();

    for company in companies {
        let mut present = 0;
        let mut absent = 0;
        let mut late = 0;
        let mut total = 0;

        for entry in company.entries() {
            total += 1;
            let key = match entry.status.to_ascii_lowercase().as_str() {
                "present" => {
                    present += 1;
                    Some("present")
                }
                "absent" => {
                    absent += 1;
                    Some("absent")
                }
                "half day" => Some("half_day"),
                "leave" => Some("leave"),
                "weekend" => Some("weekend"),
                "holiday" => Some("holiday"),
                _ => None,
            };
            if let Some(slot) = key.and_then(|k| status.iter_mut().find(|(name, _)| *name == k)) {
                slot.1 += 1;
            }
            if entry.late {
                late += 1;
                status[6].1 += 1;
            }
            if entry.working_hours != 0.0 {
                total_hours += entry.working_hours;
                records_with_hours += 1;
            }
        }

        let employees: usize = company
            .branches
            .iter()
            .flat_map(|b| b.departments.iter())
            .map(|d| d.employees.len())
            .sum();

        company_summaries.push(json!({
            "id": company.id,
            "name": company.name,
            "total_branches": company.branches.len(),
            "total_employees": employees,
            "attendance_rate": percentage(present, total),
            "late_percentage": percentage(late, total),
            "present_count": present,
            "absent_count": absent,
            "late_count": late,
        }));
    }

    let total_branches: usize = companies.iter().map(|c| c.branches.len()).sum();
    let departments = companies
        .iter()
        .flat_map(|c| c.branches.iter())
        .flat_map(|b| b.departments.iter());
    let total_departments = departments.clone().count();
    let total_employees: usize = departments.map(|d| d.employees.len()).sum();

    #[allow(clippy::cast_precision_loss)]
    let average_hours = if records_with_hours > 0 {
        round2(total_hours / records_with_hours as f64)
    } else {
        0.0
    };

    let status: Map<String, Value> = status
        .iter()
        .map(|(name, count)| ((*name).to_string(), json!(count)))
        .collect();

    json!({
        "total_companies": companies.len(),
        "total_branches": total_branches,
        "total_departments": total_departments,
        "total_employees": total_employees,
        "attendance_status": status,
        "companies": company_summaries,
        "average_working_hours": average_hours,
        "total_working_hours": round2(total_hours),
        "date_range": range,
    })
}

fn level_summary<'a>(
    kind: ReportKind,
    id: &str,
    name: &str,
    entries: impl Iterator<Item = &'a ReportEntry>,
) -> (Map<String, Value>, usize, usize) {
    let (hits, total) = entries.fold((0, 0), |(hits, total), e| {
        (hits + usize::from(kind.counts(e)), total + 1)
    });
    let label = kind.label();
    let mut map = Map::new();
    map.insert("id".into(), json!(id));
    map.insert("name".into(), json!(name));
    map.insert(format!("{label}_count"), json!(hits));
    map.insert("total_records".into(), json!(total));
    map.insert(format!("{label}_percentage"), json!(percentage(hits, total)));
    (map, hits, total)
}

/// Present / absent / late counts at every level of the hierarchy.
fn status_summary(kind: ReportKind, companies: &[CompanyAttendance]) -> Value {
    let label = kind.label();
    let mut grand_hits = 0;
    let mut grand_total = 0;
    let mut total_employees = 0;

    let company_values: Vec<Value> = companies
        .iter()
        .map(|company| {
            let branches: Vec<Value> = company
                .branches
                .iter()
                .map(|branch| {
                    let departments: Vec<Value> = branch
                        .departments
                        .iter()
                        .map(|department| {
                            total_employees += department.employees.len();
                            let (map, _, _) =
                                level_summary(kind, &department.id, &department.name, department.entries());
                            Value::Object(map)
                        })
                        .collect();
                    let (mut map, _, _) = level_summary(kind, &branch.id, &branch.name, branch.entries());
                    map.insert("departments".into(), Value::Array(departments));
                    Value::Object(map)
                })
                .collect();
            let (mut map, hits, total) =
                level_summary(kind, &company.id, &company.name, company.entries());
            grand_hits += hits;
            grand_total += total;
            map.insert("branches".into(), Value::Array(branches));
            Value::Object(map)
        })
        .collect();

    let mut summary = Map::new();
    summary.insert(format!("total_{label}"), json!(grand_hits));
    summary.insert(
        format!("{label}_percentage"),
        json!(percentage(grand_hits, grand_total)),
    );
    summary.insert("total_employees".into(), json!(total_employees));
    summary.insert("companies".into(), Value::Array(company_values));
    Value::Object(summary)
}
