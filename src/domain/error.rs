use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for the Cred-AI backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ApiError {
    // Credential issuance errors
    Mint(MintError),

    // Quiz engine errors
    Quiz(QuizError),

    // Malformed request bodies
    BadRequest(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Mint(e) => write!(f, "{e}"),
            ApiError::Quiz(e) => write!(f, "{e}"),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, body) = match self {
            ApiError::Mint(e) => e.to_http_response(),
            ApiError::Quiz(e) => e.to_http_response(),
            ApiError::BadRequest(_) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "success": false,
                    "error": self.to_string(),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                }),
            ),
        };

        HttpResponse::build(status_code).json(body)
    }
}

impl From<MintError> for ApiError {
    fn from(err: MintError) -> Self {
        ApiError::Mint(err)
    }
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        ApiError::Quiz(err)
    }
}

// Credential issuance errors.
//
// Everything before `Broadcast` is recoverable: no on-chain effect has
// happened and the caller may retry after fixing the cause. `Persistence`
// means the transaction is already on chain, so it carries the hash and must
// never be reported as a failed mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MintError {
    SessionNotFound(String),
    SessionNotPassed(String),
    TokenConsumed(String),
    InvalidAddress(String),
    MissingConfiguration(String),
    Encoding(String),
    NonceFetch(String),
    Signing(String),
    Broadcast(String),
    UnsupportedMethod(String),
    Persistence {
        transaction_hash: String,
        message: String,
    },
    Internal(String),
}

impl fmt::Display for MintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintError::SessionNotFound(token) => {
                write!(f, "No passed quiz session found for mint token: {token}")
            }
            MintError::SessionNotPassed(id) => {
                write!(f, "Quiz session {id} has not passed; nothing to mint")
            }
            MintError::TokenConsumed(token) => {
                write!(f, "Mint token already used: {token}")
            }
            MintError::InvalidAddress(addr) => write!(f, "Invalid wallet address: {addr}"),
            MintError::MissingConfiguration(what) => {
                write!(f, "Missing configuration: {what}")
            }
            MintError::Encoding(msg) => write!(f, "Call data encoding failed: {msg}"),
            MintError::NonceFetch(msg) => write!(f, "Failed to fetch pending nonce: {msg}"),
            MintError::Signing(msg) => write!(f, "Transaction signing failed: {msg}"),
            MintError::Broadcast(msg) => write!(f, "Transaction broadcast failed: {msg}"),
            MintError::UnsupportedMethod(msg) => write!(
                f,
                "The RPC endpoint does not accept raw transaction submission \
                 (eth_sendRawTransaction): {msg}. Use an RPC provider that supports \
                 raw submission, or switch to node-signed submission."
            ),
            MintError::Persistence {
                transaction_hash,
                message,
            } => write!(
                f,
                "Broadcast succeeded (tx {transaction_hash}) but the credential \
                 record could not be saved: {message}"
            ),
            MintError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl MintError {
    pub fn to_http_response(&self) -> (actix_web::http::StatusCode, serde_json::Value) {
        let status_code = match self {
            MintError::InvalidAddress(_) => actix_web::http::StatusCode::BAD_REQUEST,
            MintError::SessionNotFound(_) | MintError::SessionNotPassed(_) => {
                actix_web::http::StatusCode::NOT_FOUND
            }
            MintError::TokenConsumed(_) => actix_web::http::StatusCode::CONFLICT,
            _ => actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        // The chain effect is irreversible; the caller must still get the hash.
        if let MintError::Persistence {
            transaction_hash, ..
        } = self
        {
            body["transactionHash"] = serde_json::Value::String(transaction_hash.clone());
        }

        (status_code, body)
    }
}

// Quiz engine errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QuizError {
    InvalidInput(String),
    SessionNotFound(String),
    Upstream(String),
    InvalidAiResponse(String),
    Storage(String),
}

impl fmt::Display for QuizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            QuizError::SessionNotFound(id) => write!(f, "Quiz session not found: {id}"),
            QuizError::Upstream(msg) => write!(f, "Failed to call AI API: {msg}"),
            QuizError::InvalidAiResponse(msg) => write!(f, "Invalid JSON from AI: {msg}"),
            QuizError::Storage(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl QuizError {
    pub fn to_http_response(&self) -> (actix_web::http::StatusCode, serde_json::Value) {
        let status_code = match self {
            QuizError::InvalidInput(_) => actix_web::http::StatusCode::BAD_REQUEST,
            QuizError::SessionNotFound(_) => actix_web::http::StatusCode::NOT_FOUND,
            QuizError::Upstream(_) => actix_web::http::StatusCode::BAD_GATEWAY,
            QuizError::InvalidAiResponse(_) | QuizError::Storage(_) => {
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status_code,
            serde_json::json!({
                "success": false,
                "error": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_method_message_is_actionable() {
        let err = MintError::UnsupportedMethod("method not found".to_string());
        let msg = err.to_string();
        assert!(msg.contains("eth_sendRawTransaction"));
        assert!(msg.contains("node-signed submission"));
    }

    #[test]
    fn test_persistence_error_response_carries_hash() {
        let err = MintError::Persistence {
            transaction_hash: "0xabc123".to_string(),
            message: "disk full".to_string(),
        };
        let (status, body) = err.to_http_response();
        assert_eq!(status, actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["transactionHash"], "0xabc123");
        assert!(body["error"].as_str().unwrap().contains("0xabc123"));
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                MintError::InvalidAddress("0x12".into()),
                actix_web::http::StatusCode::BAD_REQUEST,
            ),
            (
                MintError::SessionNotFound("tok".into()),
                actix_web::http::StatusCode::NOT_FOUND,
            ),
            (
                MintError::SessionNotPassed("id".into()),
                actix_web::http::StatusCode::NOT_FOUND,
            ),
            (
                MintError::TokenConsumed("tok".into()),
                actix_web::http::StatusCode::CONFLICT,
            ),
            (
                MintError::MissingConfiguration("RPC_URL".into()),
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_http_response().0, expected, "{err}");
        }
    }
}
