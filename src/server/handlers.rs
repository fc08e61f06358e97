use axum::{
    Json,
    extract::{Path, State},
    response::Html,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use super::AppState;
use crate::{
    assistant::ChatReply,
    error::{HrError, Result},
};

const FALLBACK_INDEX: &str = r"<html>
    <head><title>HR Assistant API</title></head>
    <body>
        <h1>HR Assistant API is running</h1>
        <p>Frontend file not found. Please create a static/index.html file.</p>
    </body>
</html>";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub employee_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page),
        Err(err) => {
            info!(path = %path.display(), error = %err, "serving fallback index page");
            Html(FALLBACK_INDEX.to_string())
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "message": "HR Assistant API is running"}))
}

/// Employee lookup failures are answered in-band so the browser client can
/// show them in the conversation.
pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Result<Json<ChatReply>> {
    let employee_id = request.employee_id.trim();
    if employee_id.is_empty() {
        return Err(HrError::InvalidParams("employee_id is required".to_string()));
    }
    info!(employee_id, "chat request received");

    let thread_id = request.thread_id.as_deref().filter(|id| !id.is_empty());
    let hr = state.assistant.tools().hr();
    let employee = match hr.employee(employee_id).await {
        Ok(employee) => employee,
        Err(err) => {
            error!(employee_id, error = %err, "failed to get employee data");
            return Ok(Json(ChatReply {
                response: format!("Error: {err}"),
                thread_id: thread_id.unwrap_or("error").to_string(),
            }));
        }
    };

    let reply = state
        .assistant
        .reply(employee_id, &employee, &request.message, thread_id)
        .await;
    Ok(Json(reply))
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<Value> {
    let stats = state.assistant.tools().hr().cache_stats();
    Json(json!({
        "success": true,
        "stats": stats,
        "conversations": state.assistant.conversations().len(),
        "message": "Cache statistics retrieved successfully",
    }))
}

pub async fn clear_cache(State(state): State<AppState>, Path(employee_id): Path<String>) -> Json<Value> {
    state.assistant.tools().hr().clear_employee_cache(&employee_id);
    Json(json!({
        "success": true,
        "message": format!("Cache cleared for employee {employee_id}"),
    }))
}

#[cfg(test)]
mod tests {
    use super::super::{AppState, router};
    use crate::{
        assistant::Assistant,
        hr::tests::{mount_employee, service},
        http::build_client,
        llm::ChatClient,
        tools::ToolSet,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::{path::PathBuf, time::Duration};
    use tower::ServiceExt;
    use wiremock::MockServer;

    fn app(hr_base: &str, static_dir: &str) -> axum::Router {
        let llm = ChatClient::new(
            build_client(Duration::from_secs(5)).unwrap(),
            "http://127.0.0.1:9",
            "sk",
            "gpt-4o",
        );
        router(AppState {
            assistant: Assistant::new(llm, ToolSet::new(service(hr_base)), 4, Duration::from_secs(600)),
            static_dir: PathBuf::from(static_dir),
        })
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_chat(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app("http://127.0.0.1:9", "static")
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"status": "ok", "message": "HR Assistant API is running"})
        );
    }

    #[tokio::test]
    async fn index_falls_back_when_page_missing() {
        let response = app("http://127.0.0.1:9", "/nonexistent-static-dir")
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("HR Assistant API is running"));
    }

    #[tokio::test]
    async fn chat_requires_employee_id() {
        let response = app("http://127.0.0.1:9", "static")
            .oneshot(post_chat(&json!({"employee_id": " ", "message": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_employee_is_answered_in_band() {
        let hr = MockServer::start().await;
        let response = app(&hr.uri(), "static")
            .oneshot(post_chat(&json!({"employee_id": "EMP404"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["response"].as_str().unwrap().starts_with("Error: "));
        assert_eq!(body["thread_id"], "error");
    }

    #[tokio::test]
    async fn empty_message_returns_greeting_and_thread() {
        let hr = MockServer::start().await;
        mount_employee(&hr, "EMP1", json!({"_id": "db1", "firstName": "Sara"})).await;

        let response = app(&hr.uri(), "static")
            .oneshot(post_chat(&json!({"employee_id": "EMP1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let text = body["response"].as_str().unwrap();
        assert!(text.ends_with(", Sara! I'm your HR assistant. How may I help you today?"));
        assert_eq!(body["thread_id"].as_str().unwrap().len(), 36);
    }

    #[tokio::test]
    async fn cache_endpoints() {
        let hr = MockServer::start().await;
        mount_employee(&hr, "EMP1", json!({"_id": "db1"})).await;
        let app = app(&hr.uri(), "static");

        app.clone()
            .oneshot(post_chat(&json!({"employee_id": "EMP1"})))
            .await
            .unwrap();

        let stats = app
            .clone()
            .oneshot(Request::get("/cache/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(stats).await["stats"]["employee_data"], 1);

        let cleared = app
            .clone()
            .oneshot(Request::delete("/cache/EMP1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(cleared).await["message"], "Cache cleared for employee EMP1");

        let stats = app
            .oneshot(Request::get("/cache/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(stats).await["stats"]["employee_data"], 0);
    }
}
