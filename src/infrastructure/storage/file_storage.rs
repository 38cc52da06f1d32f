use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer_index: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Passed,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuizSession {
    pub id: String,
    pub wallet_address: String,
    pub topic: String,
    pub quiz: Vec<QuizQuestion>,
    pub score: u32,
    pub status: SessionStatus,
    pub mint_token: Option<String>,
    /// Set once a credential has been minted for this session; a consumed
    /// mint token can never produce a second broadcast.
    #[serde(default)]
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn new(wallet_address: String, topic: String, quiz: Vec<QuizQuestion>) -> Self {
        QuizSession {
            id: Uuid::new_v4().to_string(),
            wallet_address,
            topic,
            quiz,
            score: 0,
            status: SessionStatus::Pending,
            mint_token: None,
            consumed: false,
            created_at: Utc::now(),
        }
    }
}

/// A minted credential. Only ever written with a non-empty transaction hash;
/// `token_id` stays empty here, an indexer reading mint events fills it in.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Credential {
    pub id: String,
    pub wallet_address: String,
    pub session_id: String,
    pub token_id: Option<String>,
    pub transaction_hash: String,
    pub skill: String,
    pub score: u32,
    pub minted_at: DateTime<Utc>,
}

pub struct Storage {
    data_dir: String,
    sessions: Mutex<Vec<QuizSession>>,
    credentials: Mutex<Vec<Credential>>,
}

impl Storage {
    pub fn new(data_dir: &str) -> Result<Self> {
        fs::create_dir_all(data_dir)?;

        let storage = Storage {
            data_dir: data_dir.to_string(),
            sessions: Mutex::new(Vec::new()),
            credentials: Mutex::new(Vec::new()),
        };

        storage.load_data()?;
        Ok(storage)
    }

    fn load_data(&self) -> Result<()> {
        let sessions_file = format!("{}/sessions.json", self.data_dir);
        if Path::new(&sessions_file).exists() {
            let data = fs::read_to_string(&sessions_file)?;
            let sessions: Vec<QuizSession> = serde_json::from_str(&data)?;
            *self.sessions.lock().unwrap() = sessions;
        }

        let credentials_file = format!("{}/credentials.json", self.data_dir);
        if Path::new(&credentials_file).exists() {
            let data = fs::read_to_string(&credentials_file)?;
            let credentials: Vec<Credential> = serde_json::from_str(&data)?;
            *self.credentials.lock().unwrap() = credentials;
        }

        Ok(())
    }

    fn save_sessions(&self, sessions: &[QuizSession]) -> Result<()> {
        let file = format!("{}/sessions.json", self.data_dir);
        fs::write(&file, serde_json::to_string_pretty(sessions)?)?;
        Ok(())
    }

    fn save_credentials(&self, credentials: &[Credential]) -> Result<()> {
        let file = format!("{}/credentials.json", self.data_dir);
        fs::write(&file, serde_json::to_string_pretty(credentials)?)?;
        Ok(())
    }

    pub fn save_session(&self, session: QuizSession) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.push(session);
        self.save_sessions(&sessions)
    }

    pub fn get_session(&self, id: &str) -> Option<QuizSession> {
        let sessions = self.sessions.lock().unwrap();
        sessions.iter().find(|s| s.id == id).cloned()
    }

    pub fn find_session_by_mint_token(&self, mint_token: &str) -> Option<QuizSession> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .iter()
            .find(|s| s.mint_token.as_deref() == Some(mint_token))
            .cloned()
    }

    pub fn update_session<F>(&self, id: &str, update: F) -> Result<QuizSession>
    where
        F: FnOnce(&mut QuizSession),
    {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| anyhow::anyhow!("Session not found: {id}"))?;
        update(session);
        let updated = session.clone();
        self.save_sessions(&sessions)?;
        Ok(updated)
    }

    /// Marks the session consumed and appends the credential in one pass.
    /// Credential writes are append-only; there is no update or delete path.
    pub fn record_mint(&self, session_id: &str, credential: Credential) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| anyhow::anyhow!("Session not found: {session_id}"))?;
        session.consumed = true;

        let mut credentials = self.credentials.lock().unwrap();
        credentials.push(credential);

        self.save_sessions(&sessions)?;
        self.save_credentials(&credentials)?;
        Ok(())
    }

    /// All credentials for a wallet, newest first.
    pub fn credentials_by_wallet(&self, wallet_address: &str) -> Vec<Credential> {
        let credentials = self.credentials.lock().unwrap();
        credentials
            .iter()
            .rev()
            .filter(|c| c.wallet_address.eq_ignore_ascii_case(wallet_address))
            .cloned()
            .collect()
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.lock().unwrap().len()
    }
}
