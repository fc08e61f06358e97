//! Role-based scoping of HR data.
//!
//! Grades L0–L4 set the baseline; a handful of privileged roles lift an
//! employee to a higher access level regardless of grade.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::employee::{Employee, Grade};

/// Coarse tier quoted to the model in the prompt context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationLevel {
    Regular,
    Manager,
    Executive,
}

impl AuthorizationLevel {
    pub const fn for_grade(grade: Grade) -> Self {
        match grade {
            Grade::L0 | Grade::L1 => Self::Executive,
            Grade::L2 | Grade::L3 => Self::Manager,
            Grade::L4 => Self::Regular,
        }
    }
}

impl fmt::Display for AuthorizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Regular => "regular",
            Self::Manager => "manager",
            Self::Executive => "executive",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    BasicInfo,
    ContactInfo,
    SalaryInfo,
    LeaveData,
    AttendanceData,
    BankingInfo,
    FamilyInfo,
    Documents,
    ContractInfo,
    AssetsInfo,
    LoanInfo,
}

impl DataCategory {
    /// Record fields released by this category.
    const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::BasicInfo => &[
                "employeeInfo",
                "profession",
                "departmentId",
                "branchId",
                "organizationId",
                "role",
                "grade",
            ],
            Self::ContactInfo => &["email", "phoneNumber", "address"],
            Self::SalaryInfo => &["salaryInfo"],
            Self::LeaveData => &["leaveBalance"],
            Self::AttendanceData => &[],
            Self::BankingInfo => &["bankingInfo"],
            Self::FamilyInfo => &["familyInfo"],
            Self::Documents => &["documentsInfo"],
            Self::ContractInfo => &["contractInfo"],
            Self::AssetsInfo => &["assetsInfo"],
            Self::LoanInfo => &["loanInfo"],
        }
    }
}

const ALWAYS_VISIBLE: &[&str] = &["_id", "firstName", "lastName", "userName"];

const ALL_CATEGORIES: &[DataCategory] = &[
    DataCategory::BasicInfo,
    DataCategory::ContactInfo,
    DataCategory::SalaryInfo,
    DataCategory::LeaveData,
    DataCategory::AttendanceData,
    DataCategory::BankingInfo,
    DataCategory::FamilyInfo,
    DataCategory::Documents,
    DataCategory::ContractInfo,
    DataCategory::AssetsInfo,
    DataCategory::LoanInfo,
];

const HR_MANAGER_CATEGORIES: &[DataCategory] = &[
    DataCategory::BasicInfo,
    DataCategory::ContactInfo,
    DataCategory::SalaryInfo,
    DataCategory::LeaveData,
    DataCategory::AttendanceData,
    DataCategory::BankingInfo,
    DataCategory::FamilyInfo,
    DataCategory::ContractInfo,
    DataCategory::AssetsInfo,
];

const SUPERVISOR_CATEGORIES: &[DataCategory] = &[
    DataCategory::BasicInfo,
    DataCategory::ContactInfo,
    DataCategory::LeaveData,
    DataCategory::AttendanceData,
    DataCategory::SalaryInfo,
];

const EMPLOYEE_CATEGORIES: &[DataCategory] = &[
    DataCategory::BasicInfo,
    DataCategory::ContactInfo,
    DataCategory::LeaveData,
    DataCategory::AttendanceData,
];

const ORG_REPORT_ROLES: &[&str] = &["hr manager", "admin", "owner", "manager"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub can_access_all_employees: bool,
    pub categories: &'static [DataCategory],
}

/// Effective access level: the grade, unless a privileged role overrides it.
pub fn access_level(grade: Grade, role: &str) -> Grade {
    match role.trim().to_ascii_lowercase().as_str() {
        "admin" | "owner" => Grade::L0,
        "hr manager" | "hr_manager" => Grade::L2,
        _ => grade,
    }
}

pub const fn permissions(level: Grade) -> Permissions {
    match level {
        Grade::L0 | Grade::L1 => Permissions {
            can_access_all_employees: true,
            categories: ALL_CATEGORIES,
        },
        Grade::L2 => Permissions {
            can_access_all_employees: true,
            categories: HR_MANAGER_CATEGORIES,
        },
        Grade::L3 => Permissions {
            can_access_all_employees: false,
            categories: SUPERVISOR_CATEGORIES,
        },
        Grade::L4 => Permissions {
            can_access_all_employees: false,
            categories: EMPLOYEE_CATEGORIES,
        },
    }
}

/// L0–L3 manage a team; L4 only sees their own records.
pub const fn is_manager(grade: Grade) -> bool {
    !matches!(grade, Grade::L4)
}

pub fn can_view_org_report(grade: Grade, role: &str) -> bool {
    let role = role.trim().to_ascii_lowercase();
    matches!(grade, Grade::L0 | Grade::L1) && ORG_REPORT_ROLES.contains(&role.as_str())
}

/// The authenticated caller, as far as scoping decisions are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub employee_id: String,
    pub grade: Grade,
    pub role: String,
}

impl Requester {
    pub fn new(employee_id: impl Into<String>, grade: Grade, role: impl Into<String>) -> Self {
        Self {
            employee_id: employee_id.into(),
            grade,
            role: role.into(),
        }
    }

    pub fn from_employee(employee_id: impl Into<String>, employee: &Employee) -> Self {
        Self::new(employee_id, employee.grade(), employee.role())
    }

    pub fn level(&self) -> Grade {
        access_level(self.grade, &self.role)
    }

    pub const fn is_manager(&self) -> bool {
        is_manager(self.grade)
    }

    pub fn can_view_org_report(&self) -> bool {
        can_view_org_report(self.grade, &self.role)
    }

    /// Whether `target` is visible; supervisors need the team roster.
    pub fn can_access_employee(&self, target: &str, team: &[String]) -> bool {
        if self.employee_id.eq_ignore_ascii_case(target) {
            return true;
        }
        let level = self.level();
        if permissions(level).can_access_all_employees {
            return true;
        }
        level == Grade::L3 && team.iter().any(|member| member.eq_ignore_ascii_case(target))
    }

    /// Strips fields outside the requester's allowed categories.
    pub fn filter_employee_data(&self, record: &Value) -> Value {
        let Some(source) = record.as_object() else {
            return Value::Object(Map::new());
        };
        let categories = permissions(self.level()).categories;
        let allowed = ALWAYS_VISIBLE
            .iter()
            .chain(categories.iter().flat_map(|c| c.fields().iter()));

        let filtered = allowed
            .filter_map(|field| {
                source
                    .get(*field)
                    .map(|value| ((*field).to_string(), value.clone()))
            })
            .collect();
        Value::Object(filtered)
    }

    pub fn summary(&self) -> Value {
        let level = self.level();
        let permissions = permissions(level);
        serde_json::json!({
            "access_level": level,
            "can_access_all_employees": permissions.can_access_all_employees,
            "allowed_data_categories": permissions.categories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn authorization_levels() {
        assert_eq!(AuthorizationLevel::for_grade(Grade::L0), AuthorizationLevel::Executive);
        assert_eq!(AuthorizationLevel::for_grade(Grade::L3), AuthorizationLevel::Manager);
        assert_eq!(AuthorizationLevel::for_grade(Grade::L4).to_string(), "regular");
    }

    #[test]
    fn roles_override_grade() {
        assert_eq!(access_level(Grade::L4, "Admin"), Grade::L0);
        assert_eq!(access_level(Grade::L3, "hr_manager"), Grade::L2);
        assert_eq!(access_level(Grade::L3, "engineer"), Grade::L3);
    }

    #[test]
    fn employee_access_rules() {
        let team = vec!["EMP201".to_string()];

        let worker = Requester::new("EMP103", Grade::L4, "");
        assert!(worker.can_access_employee("emp103", &[]));
        assert!(!worker.can_access_employee("EMP201", &team));

        let supervisor = Requester::new("EMP150", Grade::L3, "");
        assert!(supervisor.can_access_employee("EMP201", &team));
        assert!(!supervisor.can_access_employee("EMP999", &team));

        let hr = Requester::new("EMP020", Grade::L3, "HR Manager");
        assert!(hr.can_access_employee("EMP999", &[]));
    }

    #[test]
    fn org_report_needs_grade_and_role() {
        assert!(can_view_org_report(Grade::L1, "HR Manager"));
        assert!(can_view_org_report(Grade::L0, "owner"));
        assert!(!can_view_org_report(Grade::L2, "admin"));
        assert!(!can_view_org_report(Grade::L0, "engineer"));
    }

    #[test]
    fn filter_keeps_only_allowed_fields() {
        let record = json!({
            "_id": "1",
            "firstName": "Sara",
            "email": "s@example.com",
            "salaryInfo": {"basic": 1},
            "loanInfo": {"amount": 5},
            "internalNotes": "x"
        });

        let worker = Requester::new("EMP1", Grade::L4, "");
        let seen = worker.filter_employee_data(&record);
        assert_eq!(seen["email"], "s@example.com");
        assert!(seen.get("salaryInfo").is_none());
        assert!(seen.get("internalNotes").is_none());

        let hr = Requester::new("EMP2", Grade::L2, "");
        let seen = hr.filter_employee_data(&record);
        assert!(seen.get("salaryInfo").is_some());
        assert!(seen.get("loanInfo").is_none());

        let exec = Requester::new("EMP3", Grade::L0, "");
        assert!(exec.filter_employee_data(&record).get("loanInfo").is_some());
    }

    #[test]
    fn summary_lists_categories() {
        let summary = Requester::new("EMP1", Grade::L4, "").summary();
        assert_eq!(summary["access_level"], "L4");
        assert_eq!(summary["allowed_data_categories"][0], "basic_info");
    }
}
