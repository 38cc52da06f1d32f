use crate::domain::error::MintError;
use crate::infrastructure::blockchain::abi::encode_mint_to;
use crate::infrastructure::blockchain::client::{ChainClient, ChainError, HttpChainClient};
use crate::infrastructure::blockchain::tx::{
    build_mint_transaction, gwei_to_wei, resolve_chain_id, sign_transaction, TxParams,
};
use crate::infrastructure::config::Config;
use crate::infrastructure::storage::file_storage::{
    Credential, QuizSession, SessionStatus, Storage,
};
use crate::validators::is_valid_wallet_address;
use chrono::Utc;
use ethers::core::types::{Address, H256, U256};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const CREDENTIAL_DESCRIPTION: &str = "Cred-AI verified skill";

#[derive(Debug, Serialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub attributes: Vec<NftAttribute>,
}

#[derive(Debug, Serialize)]
pub struct NftAttribute {
    pub trait_type: String,
    pub value: String,
}

pub fn certificate_metadata(topic: &str, score: u32) -> NftMetadata {
    NftMetadata {
        name: topic.to_string(),
        description: CREDENTIAL_DESCRIPTION.to_string(),
        attributes: vec![NftAttribute {
            trait_type: "Score".to_string(),
            value: score.to_string(),
        }],
    }
}

/// Drives a passed quiz session through encode → nonce → sign → broadcast →
/// persist, and serves the read side of the credential store.
#[derive(Clone)]
pub struct CredentialService {
    storage: Arc<Storage>,
    config: Arc<Config>,
    chain: Option<Arc<dyn ChainClient>>,
    // One mutex per signing address, held from nonce fetch through
    // persistence. Two concurrent mints observing the same pending nonce
    // would produce conflicting transactions; the chain keeps only one.
    nonce_locks: Arc<Mutex<HashMap<Address, Arc<tokio::sync::Mutex<()>>>>>,
}

impl CredentialService {
    pub fn new(storage: Arc<Storage>, config: Arc<Config>) -> Self {
        Self {
            storage,
            config,
            chain: None,
            nonce_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Uses the given gateway instead of building an HTTP client from the
    /// configured endpoint per request.
    pub fn with_chain_client(
        storage: Arc<Storage>,
        config: Arc<Config>,
        chain: Arc<dyn ChainClient>,
    ) -> Self {
        Self {
            storage,
            config,
            chain: Some(chain),
            nonce_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Mints a credential for the session behind `mint_token`.
    ///
    /// Exactly one broadcast attempt; no retry, since a second attempt with a
    /// stale nonce would conflict with the first.
    pub async fn mint(&self, mint_token: &str) -> Result<Credential, MintError> {
        let service = self.clone();
        let token = mint_token.to_string();
        // The broadcast is irreversible. Run the pipeline on its own task so
        // a dropped connection cannot cancel persistence mid-flight.
        tokio::spawn(async move { service.mint_inner(&token).await })
            .await
            .map_err(|e| MintError::Internal(format!("mint task failed: {e}")))?
    }

    async fn mint_inner(&self, mint_token: &str) -> Result<Credential, MintError> {
        let session = self.validated_session(mint_token)?;

        let rpc_url = self
            .config
            .rpc_url
            .clone()
            .ok_or_else(|| MintError::MissingConfiguration("RPC_URL is not set".to_string()))?;
        let private_key = self
            .config
            .private_key
            .clone()
            .ok_or_else(|| MintError::MissingConfiguration("PRIVATE_KEY is not set".to_string()))?;
        let contract = parse_configured_address(
            self.config.contract_address.as_deref(),
            "CONTRACT_ADDRESS",
        )?;
        let from = parse_configured_address(self.config.from_address.as_deref(), "FROM_ADDRESS")?;

        let metadata = certificate_metadata(&session.topic, session.score);
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| MintError::Encoding(format!("metadata serialization failed: {e}")))?;
        let call_data = encode_mint_to(&session.wallet_address, &metadata_json)?;

        let chain = self.chain_client(&rpc_url)?;
        let lock = self.nonce_lock(from);
        let _guard = lock.lock().await;

        // Another request may have minted for this token while we waited.
        let session = self.validated_session(mint_token)?;

        let nonce = chain
            .get_pending_nonce(from)
            .await
            .map_err(|e| MintError::NonceFetch(e.to_string()))?;

        let chain_id = resolve_chain_id(&rpc_url, self.config.chain_id);
        let tx = build_mint_transaction(&TxParams {
            nonce: U256::from(nonce),
            to: contract,
            data: call_data,
            gas_limit: self.config.gas_limit,
            gas_price_wei: gwei_to_wei(self.config.gas_price_gwei),
            chain_id,
        });
        let signed_hex = sign_transaction(&tx, &private_key)?;

        let tx_hash = chain
            .send_raw_transaction(&signed_hex)
            .await
            .map_err(|e| match e {
                ChainError::UnsupportedMethod(msg) => MintError::UnsupportedMethod(msg),
                other => MintError::Broadcast(other.to_string()),
            })?;
        if tx_hash == H256::zero() {
            return Err(MintError::Broadcast(
                "broadcast returned an empty transaction hash".to_string(),
            ));
        }
        let tx_hash = format!("{tx_hash:?}");

        tracing::info!(
            session_id = %session.id,
            wallet = %session.wallet_address,
            nonce,
            chain_id,
            tx_hash = %tx_hash,
            "credential mint broadcast"
        );

        let credential = Credential {
            id: Uuid::new_v4().to_string(),
            wallet_address: session.wallet_address.clone(),
            session_id: session.id.clone(),
            token_id: None,
            transaction_hash: tx_hash.clone(),
            skill: session.topic.clone(),
            score: session.score,
            minted_at: Utc::now(),
        };

        self.storage
            .record_mint(&session.id, credential.clone())
            .map_err(|e| {
                tracing::error!(tx_hash = %tx_hash, error = %e, "credential persistence failed after broadcast");
                MintError::Persistence {
                    transaction_hash: tx_hash.clone(),
                    message: e.to_string(),
                }
            })?;

        Ok(credential)
    }

    pub fn credentials_by_wallet(&self, wallet_address: &str) -> Vec<Credential> {
        self.storage.credentials_by_wallet(wallet_address)
    }

    /// Session lookup plus every precondition that needs no network access.
    fn validated_session(&self, mint_token: &str) -> Result<QuizSession, MintError> {
        let session = self
            .storage
            .find_session_by_mint_token(mint_token)
            .ok_or_else(|| MintError::SessionNotFound(mint_token.to_string()))?;
        if session.status != SessionStatus::Passed {
            return Err(MintError::SessionNotPassed(session.id.clone()));
        }
        if session.consumed {
            return Err(MintError::TokenConsumed(mint_token.to_string()));
        }
        if !is_valid_wallet_address(&session.wallet_address) {
            return Err(MintError::InvalidAddress(session.wallet_address.clone()));
        }
        Ok(session)
    }

    fn chain_client(&self, rpc_url: &str) -> Result<Arc<dyn ChainClient>, MintError> {
        if let Some(chain) = &self.chain {
            return Ok(Arc::clone(chain));
        }
        let client = HttpChainClient::new(
            rpc_url,
            Duration::from_millis(self.config.nonce_timeout_ms),
        )
        .map_err(|e| MintError::NonceFetch(e.to_string()))?;
        Ok(Arc::new(client))
    }

    fn nonce_lock(&self, address: Address) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.nonce_locks.lock().unwrap();
        Arc::clone(locks.entry(address).or_default())
    }
}

fn parse_configured_address(value: Option<&str>, name: &str) -> Result<Address, MintError> {
    let raw = value.ok_or_else(|| MintError::MissingConfiguration(format!("{name} is not set")))?;
    raw.parse::<Address>()
        .map_err(|_| MintError::MissingConfiguration(format!("{name} is not a valid address: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::blockchain::tx::{DEFAULT_GAS_LIMIT, DEFAULT_GAS_PRICE_GWEI};
    use crate::infrastructure::config::DEFAULT_NONCE_TIMEOUT_MS;
    use async_trait::async_trait;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";
    // Throwaway dev key, not a live account.
    const TEST_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[derive(Default)]
    struct MockChain {
        next_nonce: Mutex<u64>,
        fetched_nonces: Mutex<Vec<u64>>,
        broadcasts: Mutex<Vec<String>>,
        broadcast_error: Option<ChainError>,
        fetch_delay: Option<Duration>,
    }

    #[async_trait]
    impl ChainClient for MockChain {
        async fn get_pending_nonce(&self, _address: Address) -> Result<u64, ChainError> {
            if let Some(delay) = self.fetch_delay {
                tokio::time::sleep(delay).await;
            }
            let nonce = *self.next_nonce.lock().unwrap();
            self.fetched_nonces.lock().unwrap().push(nonce);
            Ok(nonce)
        }

        async fn send_raw_transaction(&self, signed_hex: &str) -> Result<H256, ChainError> {
            if let Some(err) = &self.broadcast_error {
                return Err(err.clone());
            }
            let mut nonce = self.next_nonce.lock().unwrap();
            *nonce += 1;
            self.broadcasts.lock().unwrap().push(signed_hex.to_string());
            Ok(H256::from_low_u64_be(*nonce))
        }
    }

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            port: 4000,
            log_level: "info".to_string(),
            data_dir: "data".to_string(),
            rpc_url: Some("https://rpc.sepolia.example.org".to_string()),
            private_key: Some(TEST_KEY.to_string()),
            contract_address: Some("0x2222222222222222222222222222222222222222".to_string()),
            from_address: Some("0x3333333333333333333333333333333333333333".to_string()),
            chain_id: None,
            nonce_timeout_ms: DEFAULT_NONCE_TIMEOUT_MS,
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price_gwei: DEFAULT_GAS_PRICE_GWEI,
            groq_api_key: None,
            groq_model: "llama-3.3-70b-versatile".to_string(),
            cert_image_base: None,
        })
    }

    fn temp_storage() -> Arc<Storage> {
        let dir = std::env::temp_dir().join(format!("credai-mint-test-{}", Uuid::new_v4()));
        Arc::new(Storage::new(dir.to_str().unwrap()).unwrap())
    }

    fn seed_session(
        storage: &Storage,
        wallet: &str,
        topic: &str,
        score: u32,
        status: SessionStatus,
        mint_token: &str,
    ) {
        let mut session = QuizSession::new(wallet.to_string(), topic.to_string(), vec![]);
        session.score = score;
        session.status = status;
        session.mint_token = Some(mint_token.to_string());
        storage.save_session(session).unwrap();
    }

    fn service_with(
        storage: Arc<Storage>,
        config: Arc<Config>,
        chain: Arc<MockChain>,
    ) -> CredentialService {
        CredentialService::with_chain_client(storage, config, chain)
    }

    #[tokio::test]
    async fn test_passed_session_mints_and_persists() {
        let storage = temp_storage();
        let chain = Arc::new(MockChain::default());
        seed_session(&storage, WALLET, "Solidity", 90, SessionStatus::Passed, "tok-a");
        let service = service_with(Arc::clone(&storage), test_config(), Arc::clone(&chain));

        let credential = service.mint("tok-a").await.unwrap();

        assert_eq!(credential.skill, "Solidity");
        assert_eq!(credential.score, 90);
        assert_eq!(credential.wallet_address, WALLET);
        assert!(credential.transaction_hash.starts_with("0x"));
        assert!(credential.token_id.is_none());

        // persisted, and the session's token is spent
        assert_eq!(storage.credential_count(), 1);
        let listed = service.credentials_by_wallet(WALLET);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].transaction_hash, credential.transaction_hash);
        let session = storage.find_session_by_mint_token("tok-a").unwrap();
        assert!(session.consumed);

        // the broadcast raw transaction embeds the mintTo call data
        let broadcasts = chain.broadcasts.lock().unwrap();
        assert_eq!(broadcasts.len(), 1);
        assert!(broadcasts[0].starts_with("0x"));
        assert!(broadcasts[0].contains("0075a317"));
    }

    #[tokio::test]
    async fn test_failed_session_is_rejected_before_any_chain_call() {
        let storage = temp_storage();
        let chain = Arc::new(MockChain::default());
        seed_session(&storage, WALLET, "Solidity", 40, SessionStatus::Failed, "tok-b");
        let service = service_with(Arc::clone(&storage), test_config(), Arc::clone(&chain));

        assert!(matches!(
            service.mint("tok-b").await,
            Err(MintError::SessionNotPassed(_))
        ));
        assert!(chain.fetched_nonces.lock().unwrap().is_empty());
        assert!(chain.broadcasts.lock().unwrap().is_empty());
        assert_eq!(storage.credential_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let service = service_with(temp_storage(), test_config(), Arc::new(MockChain::default()));
        assert!(matches!(
            service.mint("missing").await,
            Err(MintError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_wallet_address_is_rejected() {
        let storage = temp_storage();
        seed_session(
            &storage,
            "0xnot-a-wallet",
            "Solidity",
            90,
            SessionStatus::Passed,
            "tok-c",
        );
        let service = service_with(storage, test_config(), Arc::new(MockChain::default()));
        assert!(matches!(
            service.mint("tok-c").await,
            Err(MintError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_rpc_or_key_fails_at_request_time() {
        let storage = temp_storage();
        seed_session(&storage, WALLET, "Solidity", 90, SessionStatus::Passed, "tok-d");

        let mut config = (*test_config()).clone();
        config.rpc_url = None;
        let service = service_with(
            Arc::clone(&storage),
            Arc::new(config),
            Arc::new(MockChain::default()),
        );
        assert!(matches!(
            service.mint("tok-d").await,
            Err(MintError::MissingConfiguration(_))
        ));

        let mut config = (*test_config()).clone();
        config.private_key = None;
        let service = service_with(storage, Arc::new(config), Arc::new(MockChain::default()));
        assert!(matches!(
            service.mint("tok-d").await,
            Err(MintError::MissingConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_method_broadcast_is_distinct_and_persists_nothing() {
        let storage = temp_storage();
        let chain = Arc::new(MockChain {
            broadcast_error: Some(ChainError::UnsupportedMethod(
                "the method eth_sendRawTransaction does not exist/is not available".to_string(),
            )),
            ..MockChain::default()
        });
        seed_session(&storage, WALLET, "Solidity", 90, SessionStatus::Passed, "tok-e");
        let service = service_with(Arc::clone(&storage), test_config(), chain);

        let err = service.mint("tok-e").await.unwrap_err();
        match &err {
            MintError::UnsupportedMethod(_) => {
                assert!(err.to_string().contains("node-signed submission"));
            }
            other => panic!("expected UnsupportedMethod, got {other:?}"),
        }
        assert_eq!(storage.credential_count(), 0);
        let session = storage.find_session_by_mint_token("tok-e").unwrap();
        assert!(!session.consumed);
    }

    #[tokio::test]
    async fn test_generic_broadcast_error_is_recoverable() {
        let storage = temp_storage();
        let chain = Arc::new(MockChain {
            broadcast_error: Some(ChainError::Rpc("insufficient funds".to_string())),
            ..MockChain::default()
        });
        seed_session(&storage, WALLET, "Solidity", 90, SessionStatus::Passed, "tok-f");
        let service = service_with(Arc::clone(&storage), test_config(), chain);

        assert!(matches!(
            service.mint("tok-f").await,
            Err(MintError::Broadcast(_))
        ));
        // nothing consumed: the caller may retry once the cause is fixed
        assert!(!storage.find_session_by_mint_token("tok-f").unwrap().consumed);
    }

    #[tokio::test]
    async fn test_mint_token_is_single_use() {
        let storage = temp_storage();
        let chain = Arc::new(MockChain::default());
        seed_session(&storage, WALLET, "Solidity", 90, SessionStatus::Passed, "tok-g");
        let service = service_with(Arc::clone(&storage), test_config(), Arc::clone(&chain));

        service.mint("tok-g").await.unwrap();
        assert!(matches!(
            service.mint("tok-g").await,
            Err(MintError::TokenConsumed(_))
        ));
        assert_eq!(storage.credential_count(), 1);
        assert_eq!(chain.broadcasts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_mints_never_share_a_nonce() {
        let storage = temp_storage();
        let chain = Arc::new(MockChain {
            // long enough that unserialized requests would both read nonce 0
            fetch_delay: Some(Duration::from_millis(50)),
            ..MockChain::default()
        });
        seed_session(&storage, WALLET, "Solidity", 90, SessionStatus::Passed, "tok-h");
        seed_session(&storage, WALLET, "Rust", 100, SessionStatus::Passed, "tok-i");
        let service = service_with(storage, test_config(), Arc::clone(&chain));

        let (first, second) = tokio::join!(service.mint("tok-h"), service.mint("tok-i"));
        first.unwrap();
        second.unwrap();

        let fetched = chain.fetched_nonces.lock().unwrap();
        assert_eq!(fetched.len(), 2);
        assert_ne!(fetched[0], fetched[1]);
        assert_eq!(chain.broadcasts.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_certificate_metadata_shape() {
        let metadata = certificate_metadata("Solidity", 90);
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Solidity","description":"Cred-AI verified skill","attributes":[{"trait_type":"Score","value":"90"}]}"#
        );
    }
}
