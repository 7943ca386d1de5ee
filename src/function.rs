//! # Function Invocation Contract
//!
//! The separation endpoint is written as a cloud function: it takes an HTTP-shaped
//! event and returns an HTTP-shaped response, both plain JSON documents.
//!
//! ```json
//! // event
//! { "httpMethod": "POST", "body": "{\"audio\":\"...\"}", "queryStringParameters": {} }
//! // response
//! { "statusCode": 200, "headers": {...}, "body": "{...}", "isBase64Encoded": false }
//! ```
//!
//! [`handle`] is the whole dispatch: OPTIONS gets the CORS preflight, POST runs the
//! separation service, everything else is a 405. Every failure comes back as a
//! well-formed JSON response; `handle` itself never fails.

use crate::cors;
use crate::error::AppError;
use crate::separation::SeparationService;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// Method assumed when the event does not name one.
pub const DEFAULT_METHOD: &str = "POST";

/// Fault message for an event whose `body` is present but `null`.
pub const NULL_BODY: &str = "request body must be a JSON string, not null";

/// Incoming invocation event.
///
/// Fields the platform sends that are not listed here are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    #[serde(default)]
    pub http_method: Option<String>,

    /// Raw JSON text of the request body.
    ///
    /// - `None`: the key is absent, handled as `"{}"`
    /// - `Some(None)`: the key is `null`, which is not JSON text and fails with a 500
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub body: Option<Option<String>>,

    /// Accepted for compatibility; the handler does not read it.
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

/// Outgoing invocation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    /// Always false: bodies are JSON text or empty.
    pub is_base64_encoded: bool,
}

impl FunctionResponse {
    /// 200 with an empty body and the full preflight header set.
    pub fn preflight() -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            headers: cors::preflight_headers(),
            body: String::new(),
            is_base64_encoded: false,
        }
    }

    /// 200 with `value` serialized as the JSON body.
    pub fn ok_json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::json(StatusCode::OK, body),
            Err(e) => Self::from_error(&AppError::from(e)),
        }
    }

    pub fn from_error(err: &AppError) -> Self {
        Self::json(err.status(), err.body().to_string())
    }

    fn json(status: StatusCode, body: String) -> Self {
        Self {
            status_code: status.as_u16(),
            headers: cors::json_headers(),
            body,
            is_base64_encoded: false,
        }
    }
}

/// Replays a function response over actix-web: same status, same headers, same body.
impl From<FunctionResponse> for HttpResponse {
    fn from(response: FunctionResponse) -> Self {
        let status =
            StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = HttpResponse::build(status);
        for (name, value) in &response.headers {
            builder.insert_header((name.as_str(), value.as_str()));
        }
        builder.body(response.body)
    }
}

/// Handle one invocation.
///
/// Method matching is exact (`"post"` is not POST). Query parameters are ignored.
pub async fn handle(service: &SeparationService, event: FunctionEvent) -> FunctionResponse {
    let method = event.http_method.as_deref().unwrap_or(DEFAULT_METHOD);

    match method {
        "OPTIONS" => FunctionResponse::preflight(),
        "POST" => {
            let result = match event.body {
                None => service.separate("{}").await,
                Some(None) => Err(AppError::Internal(NULL_BODY.to_string())),
                Some(Some(body)) => service.separate(&body).await,
            };
            match result {
                Ok(separated) => FunctionResponse::ok_json(&separated),
                Err(err) => {
                    match &err {
                        AppError::Internal(_) => error!(error = %err, "Separation failed"),
                        _ => warn!(error = %err, "Separation rejected"),
                    }
                    FunctionResponse::from_error(&err)
                }
            }
        }
        other => {
            debug!(method = %other, "Rejecting unsupported method");
            FunctionResponse::from_error(&AppError::MethodNotAllowed)
        }
    }
}
