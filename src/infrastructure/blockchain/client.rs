use async_trait::async_trait;
use ethers::core::types::{Address, BlockId, BlockNumber, Bytes, H256};
use ethers::providers::{Http, Middleware, Provider};
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;

/// Errors surfaced by the RPC gateway. `UnsupportedMethod` is kept distinct
/// so the orchestrator can tell the operator to change RPC strategy instead
/// of reporting a generic broadcast failure.
#[derive(Debug, Clone)]
pub enum ChainError {
    Rpc(String),
    NonceTimeout(u64),
    UnsupportedMethod(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::Rpc(msg) => write!(f, "RPC error: {msg}"),
            ChainError::NonceTimeout(ms) => {
                write!(f, "nonce fetch timed out after {ms}ms")
            }
            ChainError::UnsupportedMethod(msg) => write!(f, "unsupported RPC method: {msg}"),
        }
    }
}

impl std::error::Error for ChainError {}

/// The two RPC operations the issuance core needs. Everything else the node
/// offers is out of scope.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Mempool-aware transaction count for `address`, i.e. the next nonce.
    async fn get_pending_nonce(&self, address: Address) -> Result<u64, ChainError>;

    /// Broadcasts a raw signed transaction, returning its hash.
    async fn send_raw_transaction(&self, signed_hex: &str) -> Result<H256, ChainError>;
}

/// `ethers` HTTP JSON-RPC implementation. Constructed per issuance request
/// from the configured endpoint; the provider itself is a thin handle.
pub struct HttpChainClient {
    provider: Provider<Http>,
    nonce_timeout: Duration,
}

impl HttpChainClient {
    pub fn new(rpc_url: &str, nonce_timeout: Duration) -> Result<Self, ChainError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| ChainError::Rpc(format!("invalid RPC endpoint: {e}")))?;
        Ok(Self {
            provider,
            nonce_timeout,
        })
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn get_pending_nonce(&self, address: Address) -> Result<u64, ChainError> {
        let fetch = self
            .provider
            .get_transaction_count(address, Some(BlockId::Number(BlockNumber::Pending)));

        match timeout(self.nonce_timeout, fetch).await {
            Ok(Ok(count)) => Ok(count.as_u64()),
            Ok(Err(e)) => Err(ChainError::Rpc(e.to_string())),
            Err(_) => Err(ChainError::NonceTimeout(
                self.nonce_timeout.as_millis() as u64
            )),
        }
    }

    async fn send_raw_transaction(&self, signed_hex: &str) -> Result<H256, ChainError> {
        let raw = hex::decode(signed_hex.trim_start_matches("0x"))
            .map_err(|e| ChainError::Rpc(format!("signed transaction is not valid hex: {e}")))?;

        let pending = self
            .provider
            .send_raw_transaction(Bytes::from(raw))
            .await
            .map_err(|e| classify_broadcast_error(&e.to_string()))?;

        Ok(pending.tx_hash())
    }
}

/// Nodes word method-not-available rejections inconsistently; match the
/// common phrasings plus the JSON-RPC code for "method not found".
pub(crate) fn classify_broadcast_error(message: &str) -> ChainError {
    let lower = message.to_lowercase();
    if lower.contains("method not found")
        || lower.contains("unsupported method")
        || lower.contains("not supported")
        || lower.contains("does not exist/is not available")
        || lower.contains("-32601")
    {
        ChainError::UnsupportedMethod(message.to_string())
    } else {
        ChainError::Rpc(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_unsupported_method_phrasings() {
        let cases = [
            "the method eth_sendRawTransaction does not exist/is not available",
            "Unsupported method: eth_sendRawTransaction",
            "Method not found",
            "eth_sendRawTransaction is not supported by this endpoint",
            "error code -32601",
        ];
        for msg in cases {
            assert!(
                matches!(
                    classify_broadcast_error(msg),
                    ChainError::UnsupportedMethod(_)
                ),
                "{msg}"
            );
        }
    }

    #[test]
    fn test_other_broadcast_errors_stay_generic() {
        let cases = [
            "insufficient funds for gas * price + value",
            "nonce too low",
            "replacement transaction underpriced",
        ];
        for msg in cases {
            assert!(matches!(classify_broadcast_error(msg), ChainError::Rpc(_)), "{msg}");
        }
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        assert!(HttpChainClient::new("not a url", Duration::from_secs(1)).is_err());
    }
}
