//! Endpoint table for the HR REST API.

use reqwest::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Login,
    EmployeeData,
    Attendance,
    TeamData,
    Organization,
    AttendanceReport,
}

impl Endpoint {
    const fn path(self) -> &'static str {
        match self {
            Self::Login => "/employee/login",
            Self::EmployeeData => "/employee/getDataByEMPId/{employee_id}",
            Self::Attendance => {
                "/c-emp-attendance/getDataByEmployeeId/{employee_ids}/{start_date}/{end_date}?page=0&limit=50"
            }
            Self::TeamData => "/branches/getTeamData/{branch_id}/{department_id}/{db_id}",
            Self::Organization => "/organization/getCompany&BranchData/{organization_id}",
            Self::AttendanceReport => {
                "/c-emp-attendance/getAttendanceReport/{company_id}?startDate={start_date}&endDate={end_date}&limit=1000&page=0"
            }
        }
    }

    pub const fn method(self) -> Method {
        match self {
            Self::Login => Method::POST,
            _ => Method::GET,
        }
    }

    /// Everything but login needs a bearer token.
    pub const fn requires_auth(self) -> bool {
        !matches!(self, Self::Login)
    }

    /// Full URL with `{name}` placeholders replaced from `params`.
    pub fn url(self, base: &str, params: &[(&str, &str)]) -> String {
        let path = params
            .iter()
            .fold(self.path().to_string(), |path, (key, value)| {
                path.replace(&format!("{{{key}}}"), value)
            });
        format!("{}{path}", base.trim_end_matches('/'))
    }
}
