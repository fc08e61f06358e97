//! HR data tools callable by the language model and over MCP.
//!
//! Each module implements one family of tools:
//! - `employee`: profile and team roster lookups
//! - `attendance`: personal and team attendance
//! - `report`: organization-wide attendance report
//!
//! Every call is checked against the authenticated [`Requester`] before any
//! HR data is fetched.

pub mod attendance;
pub mod employee;
pub mod report;

use schemars::{JsonSchema, schema_for};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    access::Requester,
    employee::Grade,
    error::{HrError, Result},
    hr::HrService,
    llm::ToolDefinition,
};
use attendance::{AttendanceRequest, PeriodRequest};
use employee::EmployeeRequest;
use report::ReportRequest;

/// Who a tool is offered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Audience {
    Everyone,
    Managers,
    OrgReport,
}

impl Audience {
    fn admits(self, requester: &Requester) -> bool {
        match self {
            Self::Everyone => true,
            Self::Managers => requester.is_manager(),
            Self::OrgReport => requester.can_view_org_report(),
        }
    }
}

struct ToolSpec {
    name: &'static str,
    description: &'static str,
    audience: Audience,
    parameters: fn() -> Value,
}

const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "get_employee_data",
        description: "Get detailed employee data using employee ID",
        audience: Audience::Everyone,
        parameters: parameters::<EmployeeRequest>,
    },
    ToolSpec {
        name: "get_attendance",
        description: "Get attendance records based on employee grade and date range",
        audience: Audience::Everyone,
        parameters: parameters::<AttendanceRequest>,
    },
    ToolSpec {
        name: "get_personal_attendance",
        description: "Get attendance records for a specific employee",
        audience: Audience::Everyone,
        parameters: parameters::<PeriodRequest>,
    },
    ToolSpec {
        name: "get_my_attendance",
        description: "Get the authenticated employee's own attendance records",
        audience: Audience::Everyone,
        parameters: parameters::<PeriodRequest>,
    },
    ToolSpec {
        name: "get_team_attendance",
        description: "Get attendance records for a manager's team",
        audience: Audience::Managers,
        parameters: parameters::<PeriodRequest>,
    },
    ToolSpec {
        name: "get_my_team_attendance",
        description: "Get attendance records for the authenticated manager's own team",
        audience: Audience::Managers,
        parameters: parameters::<PeriodRequest>,
    },
    ToolSpec {
        name: "get_team_data",
        description: "Get team members data for a manager",
        audience: Audience::Managers,
        parameters: parameters::<EmployeeRequest>,
    },
    ToolSpec {
        name: "get_attendance_report",
        description: "Get an organization-wide attendance report by company, branch and department. \
Only available to L0-L1 employees with HR Manager, admin, owner or manager roles.",
        audience: Audience::OrgReport,
        parameters: parameters::<ReportRequest>,
    },
];

/// JSON Schema for a request type, trimmed to what function calling expects.
fn parameters<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}

/// Wraps a tool result as `{"success": true, ...}`.
fn success(result: impl Serialize, message: &str) -> Result<Value> {
    let mut value = serde_json::to_value(result)?;
    let obj = match value.as_object_mut() {
        Some(obj) => obj,
        None => return Ok(json!({"success": true, "data": value, "message": message})),
    };
    obj.insert("success".to_string(), Value::Bool(true));
    obj.insert("message".to_string(), Value::String(message.to_string()));
    Ok(value)
}

fn parse_args<T: DeserializeOwned>(raw: Value) -> Result<T> {
    serde_json::from_value(raw).map_err(|e| HrError::InvalidParams(e.to_string()))
}

#[derive(Clone)]
pub struct ToolSet {
    hr: HrService,
}

impl ToolSet {
    pub const fn new(hr: HrService) -> Self {
        Self { hr }
    }

    pub const fn hr(&self) -> &HrService {
        &self.hr
    }

    /// Function definitions offered to this requester.
    pub fn definitions(requester: &Requester) -> Vec<ToolDefinition> {
        TOOLS
            .iter()
            .filter(|tool| tool.audience.admits(requester))
            .map(|tool| ToolDefinition::function(tool.name, tool.description, (tool.parameters)()))
            .collect()
    }

    /// Runs a tool call from the model. Failures become an error payload so
    /// the model can explain them to the employee.
    pub async fn dispatch(&self, name: &str, raw_arguments: &str, requester: &Requester) -> Value {
        let arguments = if raw_arguments.trim().is_empty() {
            Ok(json!({}))
        } else {
            serde_json::from_str(raw_arguments).map_err(|e| HrError::InvalidParams(e.to_string()))
        };

        let outcome = match arguments {
            Ok(arguments) => self.call(name, arguments, requester).await,
            Err(err) => Err(err),
        };

        outcome.unwrap_or_else(|err| {
            warn!(tool = name, employee_id = %requester.employee_id, error = %err, "tool call failed");
            err.to_tool_output()
        })
    }

    pub async fn call(&self, name: &str, arguments: Value, requester: &Requester) -> Result<Value> {
        info!(tool = name, employee_id = %requester.employee_id, "executing tool");
        let spec = TOOLS
            .iter()
            .find(|tool| tool.name == name)
            .ok_or_else(|| HrError::InvalidParams(format!("Unknown function: {name}")))?;
        if !spec.audience.admits(requester) {
            return Err(HrError::AccessDenied(format!(
                "{name} is not available at your access level"
            )));
        }

        match name {
            "get_employee_data" => self.employee_data(requester, parse_args(arguments)?).await,
            "get_team_data" => self.team_data(requester, parse_args(arguments)?).await,
            "get_attendance" => self.attendance(requester, parse_args(arguments)?).await,
            "get_personal_attendance" | "get_my_attendance" => {
                self.personal_attendance(requester, parse_args(arguments)?).await
            }
            "get_team_attendance" | "get_my_team_attendance" => {
                self.team_attendance(requester, parse_args(arguments)?).await
            }
            "get_attendance_report" => self.attendance_report(requester, parse_args(arguments)?).await,
            _ => Err(HrError::InvalidParams(format!("Unknown function: {name}"))),
        }
    }

    /// Fails unless `target` is the requester, visible at their level, or
    /// (for supervisors) on their team.
    async fn ensure_access(&self, requester: &Requester, target: &str) -> Result<()> {
        if target.trim().is_empty() {
            return Err(HrError::InvalidParams("employee_id cannot be empty".to_string()));
        }
        if requester.can_access_employee(target, &[]) {
            return Ok(());
        }
        if requester.level() == Grade::L3 {
            let team = self.hr.team(&requester.employee_id).await?;
            if requester.can_access_employee(target, &team.employee_ids) {
                return Ok(());
            }
        }
        warn!(employee_id = %requester.employee_id, target, "access denied");
        Err(HrError::AccessDenied(format!(
            "You do not have permission to access data for employee {target}"
        )))
    }
}
