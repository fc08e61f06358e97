//! Middleware-wrapped `reqwest` client construction.
//!
//! This module provides:
//! - A tracing backend that names spans after the upstream being called
//! - A single builder used by the HR API and LLM clients

use std::time::Duration;

use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Result as MiddlewareResult};
use reqwest_tracing::{
    ReqwestOtelSpanBackend, TracingMiddleware, default_on_request_end, reqwest_otel_span,
};
use tracing::Span;

use crate::error::Result;

pub type HttpClient = ClientWithMiddleware;

// Used only as a type parameter of TracingMiddleware.
#[allow(dead_code)]
struct UpstreamTracing;

impl ReqwestOtelSpanBackend for UpstreamTracing {
    fn on_request_start(req: &Request, _extension: &mut Extensions) -> Span {
        if req.url().path().ends_with("/chat/completions") {
            reqwest_otel_span!(name = "llm-request", req)
        } else {
            reqwest_otel_span!(name = "hr-api-request", req)
        }
    }

    fn on_request_end(
        span: &Span,
        outcome: &MiddlewareResult<Response>,
        _extension: &mut Extensions,
    ) {
        default_on_request_end(span, outcome);
    }
}

/// Builds a client with the given per-request timeout and tracing middleware.
///
/// # Errors
/// Returns `HrError::Http` if the TLS backend cannot be initialised.
pub fn build_client(timeout: Duration) -> Result<HttpClient> {
    let inner = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(ClientBuilder::new(inner)
        .with(TracingMiddleware::<UpstreamTracing>::new())
        .build())
}
