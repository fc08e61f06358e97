//! Profile and team roster tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ToolSet, success};
use crate::{
    access::Requester,
    error::{HrError, Result},
};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EmployeeRequest {
    #[schemars(description = "The employee ID (e.g., EMP103)")]
    pub employee_id: String,
}

impl ToolSet {
    /// Profile of `employee_id`, limited to the requester's data categories.
    pub async fn employee_data(&self, requester: &Requester, args: EmployeeRequest) -> Result<Value> {
        self.ensure_access(requester, &args.employee_id).await?;
        let employee = self.hr.employee(&args.employee_id).await?;
        let data = requester.filter_employee_data(&employee.to_value());
        success(
            json!({
                "data": data,
                "access": requester.summary(),
            }),
            "Employee data retrieved successfully",
        )
    }

    pub async fn team_data(&self, requester: &Requester, args: EmployeeRequest) -> Result<Value> {
        if !requester.is_manager() {
            return Err(HrError::AccessDenied(
                "Team data is only available to managers".to_string(),
            ));
        }
        self.ensure_access(requester, &args.employee_id).await?;
        let team = self.hr.team(&args.employee_id).await?;
        success(
            json!({
                "data": team.data,
                "employee_ids": team.employee_ids,
            }),
            "Team data retrieved successfully",
        )
    }
}
