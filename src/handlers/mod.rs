pub mod separate;

pub use separate::*;

use crate::health;
use actix_web::web;

/// Route table shared by the server and the HTTP-level tests.
///
/// `/api/v1/separate` accepts every method: OPTIONS and 405 replies are produced by
/// the function itself so they carry its CORS headers.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/separate", web::route().to(separate))
            .route("/invoke", web::post().to(invoke))
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::detailed_metrics)),
    )
    .route("/health", web::get().to(health::health_check));
}
