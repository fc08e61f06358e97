//! Model Context Protocol surface for the HR tools.
//!
//! MCP clients carry no session identity, so the `employee_id` argument of
//! each call is both the requester and the subject of the query. The same
//! access checks as the chat path apply.

use axum::http::request;
use rmcp::{
    ErrorData, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Implementation, InitializeRequestParam, InitializeResult,
        ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde_json::Value;
use tracing::info;

use crate::{
    access::Requester,
    error::HrError,
    prompt::{ASSISTANT_NAME, base_instructions},
    tools::{
        ToolSet,
        attendance::{AttendanceRequest, PeriodRequest},
        employee::EmployeeRequest,
        report::ReportRequest,
    },
};

#[derive(Clone)]
pub struct HrMcpServer {
    tools: ToolSet,
    tool_router: ToolRouter<Self>,
}

fn structured(result: Result<Value, HrError>) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::structured(result?))
}

#[tool_router]
impl HrMcpServer {
    pub fn new(tools: ToolSet) -> Self {
        Self {
            tools,
            tool_router: Self::tool_router(),
        }
    }

    async fn requester(&self, employee_id: &str) -> Result<Requester, ErrorData> {
        if employee_id.trim().is_empty() {
            return Err(HrError::InvalidParams("employee_id cannot be empty".to_string()).into());
        }
        let employee = self.tools.hr().employee(employee_id).await?;
        Ok(Requester::from_employee(employee_id, &employee))
    }

    #[tool(description = "Get detailed employee data using employee ID, limited to the fields the employee may see")]
    async fn get_employee_data(
        &self,
        params: Parameters<EmployeeRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let requester = self.requester(&params.0.employee_id).await?;
        structured(self.tools.employee_data(&requester, params.0).await)
    }

    #[tool(description = "Get attendance records based on employee grade and date range; managers get team attendance unless include_team is false")]
    async fn get_attendance(
        &self,
        params: Parameters<AttendanceRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let requester = self.requester(&params.0.employee_id).await?;
        structured(self.tools.attendance(&requester, params.0).await)
    }

    #[tool(description = "Get personal attendance records for an employee")]
    async fn get_personal_attendance(
        &self,
        params: Parameters<PeriodRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let requester = self.requester(&params.0.employee_id).await?;
        structured(self.tools.personal_attendance(&requester, params.0).await)
    }

    #[tool(description = "Get attendance records for a manager's team (grades L0-L3)")]
    async fn get_team_attendance(
        &self,
        params: Parameters<PeriodRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let requester = self.requester(&params.0.employee_id).await?;
        structured(self.tools.team_attendance(&requester, params.0).await)
    }

    #[tool(description = "Get team members data for a manager (grades L0-L3)")]
    async fn get_team_data(
        &self,
        params: Parameters<EmployeeRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let requester = self.requester(&params.0.employee_id).await?;
        structured(self.tools.team_data(&requester, params.0).await)
    }

    #[tool(
        description = "Get an organization-wide attendance report (all, present, absent or late) by company, branch and department. Only for L0-L1 employees with HR Manager, admin, owner or manager roles."
    )]
    async fn get_attendance_report(
        &self,
        params: Parameters<ReportRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let requester = self.requester(&params.0.employee_id).await?;
        structured(self.tools.attendance_report(&requester, params.0).await)
    }
}

#[tool_handler]
impl ServerHandler for HrMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(format!(
                "{ASSISTANT_NAME} HR data tools: attendance, profiles, teams and organization reports.\n\n{}",
                base_instructions()
            )),
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, ErrorData> {
        if let Some(http_request_part) = context.extensions.get::<request::Parts>() {
            let initialize_headers = &http_request_part.headers;
            let initialize_uri = &http_request_part.uri;
            info!(?initialize_headers, %initialize_uri, "initialize from http server");
        }
        Ok(self.get_info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hr::tests::service;

    #[test]
    fn info_advertises_tools() {
        let server = HrMcpServer::new(ToolSet::new(service("http://127.0.0.1:9")));
        let info = server.get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().starts_with(ASSISTANT_NAME));
    }

    #[test]
    fn router_registers_every_tool() {
        let server = HrMcpServer::new(ToolSet::new(service("http://127.0.0.1:9")));
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            [
                "get_attendance",
                "get_attendance_report",
                "get_employee_data",
                "get_personal_attendance",
                "get_team_attendance",
                "get_team_data",
            ]
        );
    }
}
