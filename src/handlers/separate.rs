//! HTTP adapters for the separation function.
//!
//! - `separate`: a plain HTTP request becomes a [`FunctionEvent`], and the
//!   [`FunctionResponse`] is replayed as the HTTP reply
//! - `invoke`: the request body *is* the event JSON and the reply body is the
//!   response JSON, the way a function platform would call it
//!
//! Both read the raw payload themselves, up to `server.max_body_bytes`, so an
//! oversized upload still gets a JSON reply with the CORS origin.

use crate::error::{AppError, AppResult};
use crate::function::{self, FunctionEvent, FunctionResponse};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use std::collections::HashMap;
use tracing::warn;

pub async fn separate(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> HttpResponse {
    let event = match read_body(payload, state.config.server.max_body_bytes)
        .await
        .and_then(|body| event_from_request(&req, &body))
    {
        Ok(event) => event,
        Err(err) => return FunctionResponse::from_error(&err).into(),
    };

    function::handle(&state.service, event).await.into()
}

pub async fn invoke(payload: web::Payload, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let body = read_body(payload, state.config.server.max_body_bytes).await?;
    let event: FunctionEvent = serde_json::from_slice(&body)?;
    let response = function::handle(&state.service, event).await;
    Ok(HttpResponse::Ok().json(response))
}

/// Collect the request payload, failing once it grows past `limit` bytes.
async fn read_body(mut payload: web::Payload, limit: usize) -> AppResult<Bytes> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk
            .map_err(|e| AppError::Internal(format!("failed to read request body: {}", e)))?;
        if body.len() + chunk.len() > limit {
            warn!(limit, "Request body too large");
            return Err(AppError::PayloadTooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// An empty HTTP body maps to an event without a body, like a gateway would send it.
fn event_from_request(req: &HttpRequest, body: &[u8]) -> AppResult<FunctionEvent> {
    let body = if body.is_empty() {
        None
    } else {
        let text = std::str::from_utf8(body)
            .map_err(|e| AppError::Internal(format!("request body is not valid UTF-8: {}", e)))?;
        Some(Some(text.to_string()))
    };

    let query = web::Query::<HashMap<String, String>>::from_query(req.query_string())
        .ok()
        .map(web::Query::into_inner)
        .filter(|params| !params.is_empty());

    Ok(FunctionEvent {
        http_method: Some(req.method().as_str().to_string()),
        body,
        query_string_parameters: query,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, StorageBackend};
    use crate::cors;
    use crate::handlers::routes;
    use crate::middleware::{MetricsMiddleware, RequestLogging};
    use crate::separation::{SeparateResponse, SeparationService};
    use crate::storage::MemoryStore;
    use actix_web::http::{Method, StatusCode};
    use actix_web::{test, App};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde_json::json;
    use std::sync::Arc;

    fn state() -> (AppState, Arc<MemoryStore>) {
        state_with_limit(AppConfig::default().server.max_body_bytes)
    }

    fn state_with_limit(max_body_bytes: usize) -> (AppState, Arc<MemoryStore>) {
        let mut config = AppConfig::default();
        config.server.max_body_bytes = max_body_bytes;
        config.storage.backend = StorageBackend::Memory;
        config.storage.access_key_id = "AKIDTEST".to_string();
        let store = Arc::new(MemoryStore::with_bucket("files"));
        let service = SeparationService::new(&config, store.clone());
        (AppState::new(config, service), store)
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .wrap(MetricsMiddleware)
                    .wrap(RequestLogging)
                    .configure(routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_post_separate() {
        let (state, store) = state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/separate")
            .insert_header(("X-User-Id", "user-42"))
            .set_json(json!({
                "audio": STANDARD.encode(b"fake mp3 bytes"),
                "type": "vocals",
                "filename": "song.mp3"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(cors::ALLOW_ORIGIN).unwrap(), "*");
        let body: SeparateResponse = test::read_body_json(resp).await;
        assert!(body.success);
        assert_eq!(body.filename, "vocals_song.mp3");
        assert!(body.url.contains("/projects/AKIDTEST/bucket/audio/output/"));
        assert!(body.url.ends_with("/vocals_song.mp3"));
        assert_eq!(store.len(), 2);
    }

    /// A few minutes of MP3 is well past the 256 KiB actix extractor default.
    #[actix_web::test]
    async fn test_post_multi_megabyte_track() {
        let (state, store) = state();
        let app = app!(state);
        let track: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();

        let req = test::TestRequest::post()
            .uri("/api/v1/separate")
            .set_json(json!({ "audio": STANDARD.encode(&track), "filename": "long.mp3" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: SeparateResponse = test::read_body_json(resp).await;
        assert_eq!(body.filename, "vocals_long.mp3");
        assert_eq!(store.len(), 2);
        let keys = store.keys("files");
        let input = keys.iter().find(|k| k.starts_with("audio/input/")).unwrap();
        assert_eq!(store.get("files", input).unwrap().body.len(), track.len());
    }

    #[actix_web::test]
    async fn test_oversized_body_is_json_413() {
        let (state, store) = state_with_limit(1024);
        let app = app!(state);
        let audio = STANDARD.encode(vec![7u8; 4096]);

        for uri in ["/api/v1/separate", "/api/v1/invoke"] {
            let req = test::TestRequest::post()
                .uri(uri)
                .set_json(json!({ "audio": audio }))
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE, "{}", uri);
            assert_eq!(resp.headers().get(cors::ALLOW_ORIGIN).unwrap(), "*");
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body, json!({ "error": "Payload exceeds 1024 bytes" }));
        }
        assert!(store.is_empty());
    }

    #[actix_web::test]
    async fn test_options_preflight() {
        let (state, store) = state();
        let app = app!(state);

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/v1/separate")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(headers.get(cors::ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(headers.get(cors::ALLOW_METHODS).unwrap(), "POST, OPTIONS");
        assert_eq!(headers.get(cors::ALLOW_HEADERS).unwrap(), "Content-Type, X-User-Id");
        assert_eq!(headers.get(cors::MAX_AGE).unwrap(), "86400");
        assert!(headers.get(cors::CONTENT_TYPE).is_none());
        assert!(test::read_body(resp).await.is_empty());
        assert!(store.is_empty());
    }

    #[actix_web::test]
    async fn test_get_is_method_not_allowed() {
        let (state, _store) = state();
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/v1/separate").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Method not allowed" }));
    }

    #[actix_web::test]
    async fn test_empty_post_is_bad_request() {
        let (state, _store) = state();
        let app = app!(state);

        let req = test::TestRequest::post().uri("/api/v1/separate").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Audio data required" }));
    }

    #[actix_web::test]
    async fn test_malformed_base64_is_server_error() {
        let (state, store) = state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/separate")
            .set_json(json!({ "audio": "@@SUQ@@" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers().get(cors::ALLOW_ORIGIN).unwrap(), "*");
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[actix_web::test]
    async fn test_non_utf8_body_is_server_error() {
        let (state, _store) = state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/separate")
            .set_payload(vec![0xff, 0xfe, 0xfd])
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_invoke_with_platform_event() {
        let (state, store) = state();
        let app = app!(state);

        let body = json!({ "audio": STANDARD.encode(b"abc"), "type": "bass", "filename": "a.mp3" });
        let event = json!({
            "httpMethod": "POST",
            "body": body.to_string(),
            "queryStringParameters": {}
        });
        let req = test::TestRequest::post()
            .uri("/api/v1/invoke")
            .set_json(&event)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let response: FunctionResponse = test::read_body_json(resp).await;
        assert_eq!(response.status_code, 200);
        assert!(!response.is_base64_encoded);
        let body: SeparateResponse = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body.separation_type, "bass");
        assert_eq!(body.filename, "bass_a.mp3");
        assert_eq!(store.len(), 2);
    }

    #[actix_web::test]
    async fn test_invoke_passes_method_through() {
        let (state, _store) = state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/invoke")
            .set_json(json!({ "httpMethod": "DELETE", "body": null }))
            .to_request();
        let response: FunctionResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(response.status_code, 405);
    }

    #[actix_web::test]
    async fn test_invoke_with_broken_envelope() {
        let (state, _store) = state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/invoke")
            .set_payload("{\"httpMethod\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers().get(cors::ALLOW_ORIGIN).unwrap(), "*");
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn test_health_and_metrics() {
        let (state, _store) = state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/separate")
            .set_json(json!({ "audio": STANDARD.encode(b"abc") }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/health").to_request();
        let health: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["storage"]["backend"], "memory");
        assert_eq!(health["storage"]["bucket"], "files");
        assert_eq!(health["storage"]["objects"], 2);
        assert_eq!(health["separation"]["completed"], 1);

        let req = test::TestRequest::get().uri("/api/v1/metrics").to_request();
        let metrics: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(metrics["separations"]["bytes_received"], 3);
        let endpoints = metrics["endpoints"].as_array().unwrap();
        assert!(endpoints
            .iter()
            .any(|e| e["endpoint"] == "POST /api/v1/separate" && e["request_count"] == 1));
    }
}
