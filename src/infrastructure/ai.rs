use crate::domain::error::QuizError;
use crate::infrastructure::storage::file_storage::QuizQuestion;
use async_trait::async_trait;
use serde_json::Value;

const COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

const QUIZ_SYSTEM_PROMPT: &str = "Generate 5 difficult multiple choice questions on the topic. \
    Return ONLY a JSON array of 5 objects, each with keys: \"question\" (string), \
    \"options\" (array of 4 strings), \"answer_index\" (integer 0-3).";

/// The quiz upstream reduced to the one capability this service needs.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, QuizError>;
}

/// OpenAI-compatible chat-completion client for the Groq API.
pub struct GroqClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl GroqClient {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn generate(&self, prompt: &str) -> Result<String, QuizError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| QuizError::Upstream("GROQ_API_KEY is not configured".to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": QUIZ_SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let response = self
            .http
            .post(COMPLETIONS_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| QuizError::Upstream(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| QuizError::Upstream(e.to_string()))?;

        if !status.is_success() {
            return Err(QuizError::Upstream(format!("{status}: {text}")));
        }

        // The completion payload is duck-typed; never assume its shape.
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| QuizError::Upstream(format!("unparseable completion response: {e}")))?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                QuizError::Upstream("completion response has no message content".to_string())
            })
    }
}

/// Parses the model's output into quiz questions without trusting it: code
/// fences and prose around the JSON array are tolerated, the shape of every
/// entry is checked.
pub fn parse_quiz(content: &str) -> Result<Vec<QuizQuestion>, QuizError> {
    let start = content
        .find('[')
        .ok_or_else(|| QuizError::InvalidAiResponse(snippet(content)))?;
    let end = content
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| QuizError::InvalidAiResponse(snippet(content)))?;

    let questions: Vec<QuizQuestion> = serde_json::from_str(&content[start..=end])
        .map_err(|_| QuizError::InvalidAiResponse(snippet(content)))?;

    if questions.is_empty() {
        return Err(QuizError::InvalidAiResponse("empty question list".to_string()));
    }
    for (i, q) in questions.iter().enumerate() {
        if q.question.trim().is_empty() {
            return Err(QuizError::InvalidAiResponse(format!(
                "question {i} has empty text"
            )));
        }
        if q.options.len() != 4 {
            return Err(QuizError::InvalidAiResponse(format!(
                "question {i} has {} options, expected 4",
                q.options.len()
            )));
        }
        if q.answer_index >= q.options.len() {
            return Err(QuizError::InvalidAiResponse(format!(
                "question {i} answer index {} out of range",
                q.answer_index
            )));
        }
    }

    Ok(questions)
}

fn snippet(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.len() > 200 {
        let cut = trimmed
            .char_indices()
            .take_while(|(i, _)| *i < 200)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &trimmed[..cut])
    } else {
        trimmed.to_string()
    }
}
