//! Employee record as returned by the HR API.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Seniority tier gating which HR data a user may query.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Grade {
    L0,
    L1,
    L2,
    L3,
    #[default]
    L4,
}

impl Grade {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L0 => "L0",
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::L4 => "L4",
        }
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L0" => Ok(Self::L0),
            "L1" => Ok(Self::L1),
            "L2" => Ok(Self::L2),
            "L3" => Ok(Self::L3),
            "L4" => Ok(Self::L4),
            other => Err(format!("unknown grade '{other}'")),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Database id; attendance and team lookups are keyed by it.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub db_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub employee_info: Vec<EmployeeInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Employee {
    /// Grade from the record, then the first `employeeInfo` entry, else L4.
    pub fn grade(&self) -> Grade {
        self.grade
            .as_deref()
            .or_else(|| self.employee_info.first().and_then(|i| i.grade.as_deref()))
            .and_then(|g| g.parse().ok())
            .unwrap_or_default()
    }

    pub fn role(&self) -> &str {
        self.role.as_deref().unwrap_or_default()
    }

    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }

    /// Name used in greetings; `there` when the record carries none.
    pub fn display_name(&self) -> String {
        let name = self.full_name();
        if name.is_empty() { "there".to_string() } else { name }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grade_prefers_top_level_then_employee_info() {
        let top: Employee = serde_json::from_value(json!({
            "grade": "l2",
            "employeeInfo": [{"grade": "L0"}]
        }))
        .unwrap();
        assert_eq!(top.grade(), Grade::L2);

        let nested: Employee =
            serde_json::from_value(json!({"employeeInfo": [{"grade": "L1"}]})).unwrap();
        assert_eq!(nested.grade(), Grade::L1);

        let none: Employee = serde_json::from_value(json!({"grade": "CEO"})).unwrap();
        assert_eq!(none.grade(), Grade::L4);
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = json!({
            "_id": "64f0c0ffee",
            "firstName": "Sara",
            "lastName": "Ali",
            "salaryInfo": {"basic": 9000},
            "email": "sara@example.com"
        });
        let employee: Employee = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(employee.db_id.as_deref(), Some("64f0c0ffee"));
        assert_eq!(employee.to_value(), raw);
    }

    #[test]
    fn display_name_falls_back() {
        let named: Employee =
            serde_json::from_value(json!({"firstName": "Omar", "lastName": ""})).unwrap();
        assert_eq!(named.display_name(), "Omar");
        assert_eq!(Employee::default().display_name(), "there");
    }
}
