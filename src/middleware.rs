//! Request context middleware
//!
//! Generates a correlation id per request, threads it through a tracing span
//! and the request extensions, stamps it on the response as `X-Request-ID`,
//! and turns panics anywhere below into a structured 500 carrying the same
//! id.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::AppError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id for one HTTP request, available to handlers via
/// `Extension<RequestId>`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn request_context(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let outcome = AssertUnwindSafe(next.run(req))
        .catch_unwind()
        .instrument(span.clone())
        .await;

    let mut response = match outcome {
        Ok(response) => response,
        Err(panic) => {
            let detail = panic_message(panic.as_ref());
            span.in_scope(|| {
                tracing::error!(error = %detail, "Unhandled panic in request handler");
            });
            AppError::Internal("An internal server error occurred".to_string())
                .with_request_id(request_id.clone())
                .with_details(detail)
                .into_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    span.in_scope(|| {
        tracing::info!(
            status_code = response.status().as_u16(),
            processing_time_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
    });

    response
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
