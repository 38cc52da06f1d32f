use crate::app::quiz_service::QuizService;
use crate::domain::error::ApiError;
use actix_web::web::{Data, Json};
use actix_web::{post, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct GenerateQuizRequest {
    pub wallet: String,
    pub topic: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub session_id: String,
    pub answers: Vec<i64>,
}

#[post("/generate-quiz")]
pub async fn generate_quiz(
    req: Json<GenerateQuizRequest>,
    quiz_service: Data<Arc<QuizService>>,
) -> Result<HttpResponse, ApiError> {
    let generated = quiz_service
        .generate(&req.wallet, &req.topic, &req.content)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "session_id": generated.session_id,
        "quiz": generated.quiz,
    })))
}

#[post("/submit-quiz")]
pub async fn submit_quiz(
    req: Json<SubmitQuizRequest>,
    quiz_service: Data<Arc<QuizService>>,
) -> Result<HttpResponse, ApiError> {
    let result = quiz_service.submit(&req.session_id, &req.answers).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "score": result.score,
        "passed": result.passed,
        "mint_token": result.mint_token,
    })))
}
