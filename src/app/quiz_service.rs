use crate::domain::error::QuizError;
use crate::infrastructure::ai::{parse_quiz, CompletionClient};
use crate::infrastructure::storage::file_storage::{
    QuizQuestion, QuizSession, SessionStatus, Storage,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

pub const PASS_THRESHOLD: u32 = 80;

#[derive(Debug, Serialize)]
pub struct GeneratedQuiz {
    pub session_id: String,
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResult {
    pub score: u32,
    pub passed: bool,
    pub mint_token: Option<String>,
}

pub struct QuizService {
    storage: Arc<Storage>,
    completion: Arc<dyn CompletionClient>,
}

impl QuizService {
    pub fn new(storage: Arc<Storage>, completion: Arc<dyn CompletionClient>) -> Self {
        Self {
            storage,
            completion,
        }
    }

    /// Generates a quiz for a topic via the completion upstream and persists
    /// a pending session for it.
    pub async fn generate(
        &self,
        wallet: &str,
        topic: &str,
        content: &str,
    ) -> Result<GeneratedQuiz, QuizError> {
        if wallet.trim().is_empty() {
            return Err(QuizError::InvalidInput("wallet is required".to_string()));
        }
        if topic.trim().is_empty() {
            return Err(QuizError::InvalidInput("topic is required".to_string()));
        }
        if content.trim().is_empty() {
            return Err(QuizError::InvalidInput("content is required".to_string()));
        }

        let completion = self.completion.generate(content).await?;
        let quiz = parse_quiz(&completion)?;

        let session = QuizSession::new(wallet.to_string(), topic.to_string(), quiz.clone());
        let session_id = session.id.clone();
        self.storage
            .save_session(session)
            .map_err(|e| QuizError::Storage(e.to_string()))?;

        tracing::info!(session_id = %session_id, topic, questions = quiz.len(), "quiz generated");

        Ok(GeneratedQuiz { session_id, quiz })
    }

    /// Grades submitted answer indices against the stored quiz. A passing
    /// score gets a one-time mint token.
    pub async fn submit(
        &self,
        session_id: &str,
        answers: &[i64],
    ) -> Result<SubmitResult, QuizError> {
        let session = self
            .storage
            .get_session(session_id)
            .ok_or_else(|| QuizError::SessionNotFound(session_id.to_string()))?;

        let total = session.quiz.len();
        if total == 0 {
            return Err(QuizError::InvalidInput(
                "session has no questions to grade".to_string(),
            ));
        }

        let correct = session
            .quiz
            .iter()
            .enumerate()
            .filter(|(i, q)| answers.get(*i) == Some(&(q.answer_index as i64)))
            .count();

        let score = ((correct as f64 / total as f64) * 100.0).round() as u32;
        let passed = score >= PASS_THRESHOLD;
        let mint_token = passed.then(|| Uuid::new_v4().to_string());

        let token = mint_token.clone();
        self.storage
            .update_session(session_id, |s| {
                s.score = score;
                s.status = if passed {
                    SessionStatus::Passed
                } else {
                    SessionStatus::Failed
                };
                s.mint_token = token;
            })
            .map_err(|e| QuizError::Storage(e.to_string()))?;

        tracing::info!(session_id = %session_id, score, passed, "quiz submitted");

        Ok(SubmitResult {
            score,
            passed,
            mint_token,
        })
    }
}
