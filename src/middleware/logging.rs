use crate::cors::USER_ID_HEADER;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header::CONTENT_LENGTH, StatusCode},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    time::Instant,
};
use tracing::{error, info, warn};

/// Logs one line when a request starts and one when it ends.
///
/// Uploads are identified by the optional `X-User-Id` header and sized by
/// `Content-Length`, so a slow or rejected upload can be traced back to a caller.
pub struct RequestLogging;

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingMiddleware { service }))
    }
}

pub struct RequestLoggingMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let line = RequestLine::from_request(&req);
        line.log_start();

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            match &result {
                Ok(response) => line.log_status(response.status()),
                Err(err) => line.log_failure(err),
            }
            result
        })
    }
}

/// What gets logged about a request, captured before the handler consumes it.
#[derive(Debug)]
struct RequestLine {
    method: String,
    uri: String,
    remote_addr: String,
    user_id: String,
    body_bytes: Option<u64>,
    started: Instant,
}

impl RequestLine {
    fn from_request(req: &ServiceRequest) -> Self {
        Self {
            method: req.method().to_string(),
            uri: req.uri().to_string(),
            remote_addr: req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string(),
            user_id: header(req, USER_ID_HEADER).unwrap_or("-").to_string(),
            body_bytes: header(req, CONTENT_LENGTH.as_str()).and_then(|v| v.parse().ok()),
            started: Instant::now(),
        }
    }

    fn log_start(&self) {
        info!(
            method = %self.method,
            uri = %self.uri,
            remote_addr = %self.remote_addr,
            user_id = %self.user_id,
            body_bytes = ?self.body_bytes,
            "Request started"
        );
    }

    /// 5xx and 413 are logged at `warn`; the rest at `info`.
    fn log_status(&self, status: StatusCode) {
        let duration_ms = self.started.elapsed().as_millis();
        if status.is_server_error() || status == StatusCode::PAYLOAD_TOO_LARGE {
            warn!(
                method = %self.method,
                uri = %self.uri,
                user_id = %self.user_id,
                body_bytes = ?self.body_bytes,
                status = status.as_u16(),
                duration_ms = %duration_ms,
                "Request completed with error"
            );
        } else {
            info!(
                method = %self.method,
                uri = %self.uri,
                user_id = %self.user_id,
                status = status.as_u16(),
                duration_ms = %duration_ms,
                "Request completed"
            );
        }
    }

    fn log_failure(&self, err: &Error) {
        error!(
            method = %self.method,
            uri = %self.uri,
            user_id = %self.user_id,
            duration_ms = %self.started.elapsed().as_millis(),
            error = %err,
            "Request failed"
        );
    }
}

fn header<'a>(req: &'a ServiceRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}
