//! Request logging middleware configuration

use std::time::Duration;

use http::{Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier};
use tower_http::trace::{
    DefaultOnBodyChunk, DefaultOnEos, DefaultOnRequest, MakeSpan, OnFailure, OnResponse, TraceLayer,
};
use tracing::{info_span, Span};

pub type LoggingLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    RequestSpan,
    DefaultOnRequest,
    ResponseLogger,
    DefaultOnBodyChunk,
    DefaultOnEos,
    FailureLogger,
>;

pub fn logging_layer() -> LoggingLayer {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_response(ResponseLogger)
        .on_failure(FailureLogger)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        info_span!(
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
            query = ?request.uri().query(),
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseLogger;

impl<B> OnResponse<B> for ResponseLogger {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        let status = response.status();
        let latency_ms = latency.as_millis();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), latency_ms, "server error response");
        } else if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), latency_ms, "client error response");
        } else {
            tracing::info!(status = status.as_u16(), latency_ms, "request completed");
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailureLogger;

impl OnFailure<ServerErrorsFailureClass> for FailureLogger {
    fn on_failure(&mut self, error: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
        tracing::error!(latency_ms = latency.as_millis(), error = ?error, "request failed");
    }
}
