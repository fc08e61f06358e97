//! Attendance tools.
//!
//! `date_type` accepts the phrases understood by [`crate::dates::DateRange`];
//! it defaults to the last seven days.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ToolSet, success};
use crate::{
    access::Requester,
    error::{HrError, Result},
};

const DEFAULT_DATE_TYPE: &str = "recent";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PeriodRequest {
    #[schemars(description = "The employee ID (e.g., EMP103)")]
    pub employee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "Type of date range - 'today', 'yesterday', 'recent', 'this_month', 'previous_month', a specific date 'YYYY-MM-DD', a range 'YYYY-MM-DD:YYYY-MM-DD', or month_MM_YYYY for a specific month"
    )]
    pub date_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AttendanceRequest {
    #[schemars(description = "The employee ID (e.g., EMP103)")]
    pub employee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "Type of date range - 'today', 'yesterday', 'recent', 'this_month', 'previous_month', a specific date 'YYYY-MM-DD', a range 'YYYY-MM-DD:YYYY-MM-DD', or month_MM_YYYY for a specific month"
    )]
    pub date_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "Override to include team data (if not provided, auto-detect based on grade)"
    )]
    pub include_team: Option<bool>,
}

fn date_type(raw: Option<&str>) -> &str {
    raw.filter(|d| !d.trim().is_empty()).unwrap_or(DEFAULT_DATE_TYPE)
}

impl ToolSet {
    pub async fn attendance(&self, requester: &Requester, args: AttendanceRequest) -> Result<Value> {
        self.ensure_access(requester, &args.employee_id).await?;
        let include_team = match (requester.is_manager(), args.include_team) {
            (false, Some(true)) => {
                return Err(HrError::AccessDenied(
                    "Team attendance is only available to managers".to_string(),
                ));
            }
            (false, _) => Some(false),
            (true, choice) => choice,
        };
        let result = self
            .hr
            .attendance(&args.employee_id, date_type(args.date_type.as_deref()), include_team)
            .await?;
        success(result, "Attendance data retrieved successfully")
    }

    pub async fn personal_attendance(&self, requester: &Requester, args: PeriodRequest) -> Result<Value> {
        self.ensure_access(requester, &args.employee_id).await?;
        let result = self
            .hr
            .personal_attendance(&args.employee_id, date_type(args.date_type.as_deref()))
            .await?;
        success(result, "Attendance data retrieved successfully")
    }

    pub async fn team_attendance(&self, requester: &Requester, args: PeriodRequest) -> Result<Value> {
        if !requester.is_manager() {
            return Err(HrError::AccessDenied(
                "Team attendance is only available to managers".to_string(),
            ));
        }
        self.ensure_access(requester, &args.employee_id).await?;
        let result = self
            .hr
            .team_attendance(&args.employee_id, date_type(args.date_type.as_deref()))
            .await?;
        success(result, "Team attendance data retrieved successfully")
    }
}
