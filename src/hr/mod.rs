//! Cached, high-level access to the HR system.
//!
//! [`HrService`] logs employees in on demand, keeps their token, profile and
//! team roster in [`HrCache`], and turns raw attendance pages into the
//! payloads handed to the language model.

mod api;
mod cache;
mod endpoints;
pub mod report;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

pub use api::HrApi;
pub use cache::{CacheStats, CachedTeam};
use cache::HrCache;

use crate::{
    access::Requester,
    config::Settings,
    dates::DateRange,
    employee::Employee,
    error::{HrError, Result},
    format::{format_personal, format_team, parse_records},
    http::build_client,
};
use report::{Company, ReportFilters, ReportKind, ReportRow, find_company, organize_company, summarize};

/// Attendance rows plus the text report built from them.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceResult {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_data: Option<Value>,
    pub date_range: DateRange,
    pub formatted_response: String,
    pub cached: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    pub date_type: Option<String>,
    pub filters: ReportFilters,
    pub kind: ReportKind,
}

#[derive(Clone)]
pub struct HrService {
    api: HrApi,
    cache: Arc<HrCache>,
    password: String,
    mac_address: String,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl HrService {
    pub fn new(api: HrApi, password: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            api,
            cache: Arc::new(HrCache::default()),
            password: password.into(),
            mac_address: mac_address.into(),
        }
    }

    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = build_client(settings.request_timeout)?;
        Ok(Self::new(
            HrApi::new(client, settings.hr_api_base_url.clone()),
            settings.default_password.clone(),
            settings.default_mac_address.clone(),
        ))
    }

    /// Cached token, or a fresh login with the default credentials.
    pub async fn token(&self, employee_id: &str) -> Result<String> {
        if let Some(token) = self.cache.token(employee_id) {
            return Ok(token);
        }
        let token = self
            .api
            .login(employee_id, &self.password, &self.mac_address)
            .await?;
        self.cache.set_token(employee_id, &token);
        info!(employee_id, "logged in to HR system");
        Ok(token)
    }

    pub async fn employee(&self, employee_id: &str) -> Result<Employee> {
        if let Some(employee) = self.cache.employee(employee_id) {
            info!(employee_id, "using cached employee data");
            return Ok(employee);
        }
        let token = self.token(employee_id).await?;
        let record = self.api.employee_data(&token, employee_id).await?;
        let employee: Employee = serde_json::from_value(record)?;
        self.cache.set_employee(employee_id, &employee);
        Ok(employee)
    }

    async fn db_id(&self, employee_id: &str) -> Result<String> {
        if let Some(db_id) = self.cache.db_id(employee_id) {
            return Ok(db_id);
        }
        self.employee(employee_id)
            .await?
            .db_id
            .ok_or_else(|| HrError::NotFound("Missing employee database ID".to_string()))
    }

    /// Team roster of a manager, keyed by their branch and department.
    #[instrument(skip(self))]
    pub async fn team(&self, manager_id: &str) -> Result<CachedTeam> {
        if let Some(team) = self.cache.team(manager_id) {
            return Ok(team);
        }

        let token = self.token(manager_id).await?;
        let manager = self.employee(manager_id).await?;
        let db_id = manager
            .db_id
            .as_deref()
            .ok_or_else(|| HrError::NotFound("Missing manager database ID".to_string()))?;
        let (Some(branch_id), Some(department_id)) =
            (manager.branch_id.as_deref(), manager.department_id.as_deref())
        else {
            return Err(HrError::NotFound(
                "Missing manager branch or department".to_string(),
            ));
        };

        let data = self
            .api
            .team_data(&token, branch_id, department_id, db_id)
            .await?;
        let employee_ids = data
            .get("teamData")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|member| member.get("employeeId").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        let team = CachedTeam { data, employee_ids };
        self.cache.set_team(manager_id, team.clone());
        Ok(team)
    }

    #[instrument(skip(self))]
    pub async fn personal_attendance(&self, employee_id: &str, date_type: &str) -> Result<AttendanceResult> {
        let range = DateRange::resolve(date_type, today());

        let (data, cached) = if let Some(data) = self.cache.attendance(employee_id, &range) {
            (data, true)
        } else {
            let token = self.token(employee_id).await?;
            let db_id = self.db_id(employee_id).await?;
            let data = self.api.attendance(&token, &[db_id], &range).await?;
            self.cache.set_attendance(employee_id, &range, data.clone());
            (data, false)
        };

        let formatted_response = format_personal(&parse_records(&data), &range, today());
        Ok(AttendanceResult {
            data,
            team_data: None,
            date_range: range,
            formatted_response,
            cached,
        })
    }

    #[instrument(skip(self))]
    pub async fn team_attendance(&self, manager_id: &str, date_type: &str) -> Result<AttendanceResult> {
        let range = DateRange::resolve(date_type, today());
        let cache_key = format!("team_{manager_id}");
        let team = self.team(manager_id).await?;

        let (data, cached) = if let Some(data) = self.cache.attendance(&cache_key, &range) {
            (data, true)
        } else {
            if team.employee_ids.is_empty() {
                warn!(manager_id, "no team members found");
                return Err(HrError::NotFound("No team members found".to_string()));
            }
            let token = self.token(manager_id).await?;
            let data = self.api.attendance(&token, &team.employee_ids, &range).await?;
            self.cache.set_attendance(&cache_key, &range, data.clone());
            (data, false)
        };

        let formatted_response = format_team(&parse_records(&data), &team.data, &range, today());
        Ok(AttendanceResult {
            data,
            team_data: Some(team.data),
            date_range: range,
            formatted_response,
            cached,
        })
    }

    /// Team attendance for managers (L0–L3), personal otherwise, unless
    /// `include_team` says which one explicitly.
    pub async fn attendance(
        &self,
        employee_id: &str,
        date_type: &str,
        include_team: Option<bool>,
    ) -> Result<AttendanceResult> {
        let employee = self.employee(employee_id).await?;
        let team = include_team.unwrap_or_else(|| crate::access::is_manager(employee.grade()));
        info!(employee_id, grade = %employee.grade(), team, "routing attendance request");
        if team {
            self.team_attendance(employee_id, date_type).await
        } else {
            self.personal_attendance(employee_id, date_type).await
        }
    }

    /// Organization-wide report for executives with a privileged role.
    #[instrument(skip(self, query), fields(kind = ?query.kind))]
    pub async fn attendance_report(&self, employee_id: &str, query: &ReportQuery) -> Result<Value> {
        let employee = self.employee(employee_id).await?;
        let requester = Requester::from_employee(employee_id, &employee);
        if !requester.can_view_org_report() {
            warn!(employee_id, grade = %requester.grade, role = %requester.role, "unauthorized report request");
            return Err(HrError::AccessDenied(
                "You are not authorized to access the attendance report".to_string(),
            ));
        }

        let range = DateRange::resolve(query.date_type.as_deref().unwrap_or("today"), today());
        let token = self.token(employee_id).await?;
        let organization_id = employee.organization_id.as_deref().ok_or_else(|| {
            HrError::NotFound("Unable to determine organization structure".to_string())
        })?;

        let mut organization = self.api.organization(&token, organization_id).await?;
        let organization = match organization.get_mut("companies").map(Value::take) {
            Some(companies) => companies,
            None => organization,
        };
        let companies: Vec<Company> = serde_json::from_value(organization)?;

        let selected: Vec<&Company> = match query.filters.company.as_deref() {
            Some(needle) => find_company(&companies, needle).into_iter().collect(),
            None => companies.iter().collect(),
        };
        if selected.is_empty() {
            return Err(HrError::NotFound(
                "No matching companies found with the provided filter".to_string(),
            ));
        }

        let mut organized = Vec::with_capacity(selected.len());
        for company in selected {
            let rows = self.api.attendance_report(&token, &company.id, &range).await?;
            let rows: Vec<ReportRow> = serde_json::from_value(rows)?;
            info!(company = %company.name, rows = rows.len(), "organizing attendance report");
            organized.push(organize_company(company, &rows, &query.filters));
        }

        let summary = summarize(query.kind, &organized, &range);
        Ok(json!({
            "data": organized,
            "summary": summary,
            "date_range": range,
            "report_type": query.kind,
            "filters": {
                "company_id": query.filters.company,
                "branch_id": query.filters.branch,
                "department_id": query.filters.department,
            },
        }))
    }

    pub fn clear_employee_cache(&self, employee_id: &str) {
        self.cache.clear_employee(employee_id);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
