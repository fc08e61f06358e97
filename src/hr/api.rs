//! Raw calls against the HR REST API.
//!
//! Every data endpoint answers with an envelope
//! `{"statusCode": 200, "data": ...}`; anything else is treated as an
//! unexpected response.

use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{
    dates::DateRange,
    error::{HrError, Result},
    http::HttpClient,
    hr::endpoints::Endpoint,
};

#[derive(Clone)]
pub struct HrApi {
    client: HttpClient,
    base_url: String,
}

/// Unwraps the `data` member of a successful envelope.
pub fn envelope_data(mut body: Value, what: &str) -> Result<Value> {
    let ok = body.get("statusCode").and_then(Value::as_i64) == Some(200);
    match body.get_mut("data").map(Value::take) {
        Some(data) if ok => Ok(data),
        _ => {
            warn!(%body, "{what} response not in expected format");
            Err(HrError::UnexpectedResponse(format!("Failed to retrieve {what}")))
        }
    }
}

impl HrApi {
    pub fn new(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn get(&self, endpoint: Endpoint, token: &str, params: &[(&str, &str)]) -> Result<Value> {
        debug_assert_eq!(endpoint.method(), Method::GET);
        let url = endpoint.url(&self.base_url, params);
        debug!(%url, "HR API request");
        let mut request = self.client.get(&url);
        if endpoint.requires_auth() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Logs in and returns the bearer token.
    pub async fn login(&self, employee_id: &str, password: &str, mac_address: &str) -> Result<String> {
        let url = Endpoint::Login.url(&self.base_url, &[]);
        info!(employee_id, "attempting HR login");

        let body: Value = self
            .client
            .post(&url)
            .json(&json!({
                "empId": employee_id,
                "password": password,
                "macAddress": mac_address,
            }))
            .send()
            .await
            .map_err(|e| HrError::Authentication(format!("Failed to obtain token: {e}")))?
            .error_for_status()
            .map_err(|e| HrError::Authentication(format!("Login failed: {e}")))?
            .json()
            .await?;

        body.pointer("/data/token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                warn!(employee_id, "login response carried no token");
                HrError::Authentication("Login failed: Invalid response format".to_string())
            })
    }

    /// First record returned for the employee id.
    pub async fn employee_data(&self, token: &str, employee_id: &str) -> Result<Value> {
        let body = self
            .get(Endpoint::EmployeeData, token, &[("employee_id", employee_id)])
            .await?;
        match envelope_data(body, "employee data")? {
            Value::Array(mut records) if !records.is_empty() => Ok(records.swap_remove(0)),
            Value::Object(record) => Ok(Value::Object(record)),
            _ => Err(HrError::NotFound(format!("Employee {employee_id} not found"))),
        }
    }

    /// Attendance rows for one or more employees (by database id).
    pub async fn attendance(&self, token: &str, employee_ids: &[String], range: &DateRange) -> Result<Value> {
        let ids = employee_ids.join(",");
        let (start, end) = (range.start(), range.end());
        let body = self
            .get(
                Endpoint::Attendance,
                token,
                &[
                    ("employee_ids", ids.as_str()),
                    ("start_date", start.as_str()),
                    ("end_date", end.as_str()),
                ],
            )
            .await?;
        envelope_data(body, "attendance data")
    }

    pub async fn team_data(
        &self,
        token: &str,
        branch_id: &str,
        department_id: &str,
        db_id: &str,
    ) -> Result<Value> {
        let body = self
            .get(
                Endpoint::TeamData,
                token,
                &[
                    ("branch_id", branch_id),
                    ("department_id", department_id),
                    ("db_id", db_id),
                ],
            )
            .await?;
        envelope_data(body, "team data")
    }

    /// Companies with their branches and departments.
    pub async fn organization(&self, token: &str, organization_id: &str) -> Result<Value> {
        let body = self
            .get(Endpoint::Organization, token, &[("organization_id", organization_id)])
            .await?;
        envelope_data(body, "organization data")
    }

    pub async fn attendance_report(&self, token: &str, company_id: &str, range: &DateRange) -> Result<Value> {
        let (start, end) = (range.start(), range.end());
        let body = self
            .get(
                Endpoint::AttendanceReport,
                token,
                &[
                    ("company_id", company_id),
                    ("start_date", start.as_str()),
                    ("end_date", end.as_str()),
                ],
            )
            .await?;
        let mut data = envelope_data(body, "attendance report")?;
        Ok(data.get_mut("data").map(Value::take).unwrap_or(data))
    }
}
