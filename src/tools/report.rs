//! Organization-wide attendance report tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ToolSet, success};
use crate::{
    access::Requester,
    error::{HrError, Result},
    hr::{ReportQuery, report::ReportFilters},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReportRequest {
    #[schemars(description = "The employee ID of the requester (e.g., EMP001)")]
    pub employee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "Date range - 'today' (default), 'yesterday', 'recent', 'this_month', 'previous_month', 'YYYY-MM-DD', 'YYYY-MM-DD:YYYY-MM-DD' or 'month_MM_YYYY'"
    )]
    pub date_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Optional company filter, by ID or name")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Optional branch filter, by ID or name")]
    pub branch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Optional department filter, by ID or name")]
    pub department_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Report type: 'all' (default), 'present', 'absent' or 'late'")]
    pub report_type: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<ReportRequest> for ReportQuery {
    fn from(req: ReportRequest) -> Self {
        Self {
            date_type: non_blank(req.date_type),
            filters: ReportFilters {
                company: non_blank(req.company_id),
                branch: non_blank(req.branch_id),
                department: non_blank(req.department_id),
            },
            kind: req
                .report_type
                .as_deref()
                .and_then(|kind| kind.parse().ok())
                .unwrap_or_default(),
        }
    }
}

impl ToolSet {
    /// The report is always produced for the requester, whatever
    /// `employee_id` the caller passed.
    pub async fn attendance_report(&self, requester: &Requester, args: ReportRequest) -> Result<Value> {
        if !requester.can_view_org_report() {
            return Err(HrError::AccessDenied(
                "You are not authorized to access the attendance report".to_string(),
            ));
        }
        let query = ReportQuery::from(args);
        let kind = query.kind;
        let report = self.hr.attendance_report(&requester.employee_id, &query).await?;
        success(report, &format!("Attendance report ({}) generated successfully", kind.label()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hr::report::ReportKind;

    #[test]
    fn request_maps_to_query() {
        let query = ReportQuery::from(ReportRequest {
            employee_id: "EMP001".to_string(),
            company_id: Some("Acme".to_string()),
            branch_id: Some(String::new()),
            report_type: Some("Late".to_string()),
            ..ReportRequest::default()
        });
        assert_eq!(query.filters.company.as_deref(), Some("Acme"));
        assert_eq!(query.filters.branch, None);
        assert_eq!(query.kind, ReportKind::Late);
        assert_eq!(query.date_type, None);
    }
}
