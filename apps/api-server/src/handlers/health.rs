//! Health check endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Active repository backend, so probes can tell a real deployment
    /// from the in-memory fallback.
    pub storage: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        storage: state.storage,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test, web};

    use quill_core::ports::{PasswordService, TokenService};
    use quill_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};

    use super::*;

    #[actix_web::test]
    async fn reports_the_active_storage_backend() {
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(JwtConfig::default()));
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
        let state = AppState::new(None, tokens, passwords).await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/api/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storage"], "in-memory");
        assert!(body["version"].is_string());
    }
}
