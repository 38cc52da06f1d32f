pub mod credential;
pub mod quiz;

pub use credential::*;
pub use quiz::*;

use actix_web::{get, HttpResponse, Responder};

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "message": "Cred-AI backend is running"
    }))
}
