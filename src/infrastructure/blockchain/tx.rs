use crate::domain::error::MintError;
use ethers::core::types::transaction::eip2718::TypedTransaction;
use ethers::core::types::{Address, Bytes, TransactionRequest, U256};
use ethers::signers::{LocalWallet, Signer};

pub const DEFAULT_GAS_LIMIT: u64 = 400_000;
pub const DEFAULT_GAS_PRICE_GWEI: u64 = 50;

/// Everything needed to assemble the unsigned legacy mint transaction.
/// Validation happens upstream; this is plain assembly.
#[derive(Debug, Clone)]
pub struct TxParams {
    pub nonce: U256,
    pub to: Address,
    pub data: Bytes,
    pub gas_limit: u64,
    pub gas_price_wei: U256,
    pub chain_id: u64,
}

pub fn gwei_to_wei(gwei: u64) -> U256 {
    U256::from(gwei) * U256::exp10(9)
}

/// Resolves the chain id: an explicit override always wins, otherwise the
/// RPC endpoint URL is matched by substring, defaulting to Sepolia.
pub fn resolve_chain_id(rpc_url: &str, explicit: Option<u64>) -> u64 {
    if let Some(chain_id) = explicit {
        return chain_id;
    }
    if rpc_url.contains("sepolia") {
        11155111
    } else if rpc_url.contains("goerli") {
        5
    } else if rpc_url.contains("mainnet") {
        1
    } else {
        11155111
    }
}

/// Assembles the unsigned legacy transaction. The mint call transfers no
/// native currency, so value is always zero.
pub fn build_mint_transaction(params: &TxParams) -> TypedTransaction {
    TransactionRequest::new()
        .nonce(params.nonce)
        .to(params.to)
        .value(0u64)
        .data(params.data.clone())
        .gas(params.gas_limit)
        .gas_price(params.gas_price_wei)
        .chain_id(params.chain_id)
        .into()
}

/// Signs the transaction with the configured private key and returns the raw
/// RLP-encoded bytes as a hex string with exactly one `0x` prefix.
///
/// The signature is deterministic ECDSA with the EIP-155 `v` encoding for the
/// transaction's chain id.
pub fn sign_transaction(tx: &TypedTransaction, private_key: &str) -> Result<String, MintError> {
    let key = private_key.trim_start_matches("0x");
    if key.is_empty() {
        return Err(MintError::Signing("private key is empty".to_string()));
    }

    let chain_id = tx
        .chain_id()
        .ok_or_else(|| MintError::Signing("transaction is missing a chain id".to_string()))?
        .as_u64();

    let wallet: LocalWallet = key
        .parse::<LocalWallet>()
        .map_err(|e| MintError::Signing(format!("malformed private key: {e}")))?
        .with_chain_id(chain_id);

    let signature = wallet
        .sign_transaction_sync(tx)
        .map_err(|e| MintError::Signing(e.to_string()))?;

    let raw = tx.rlp_signed(&signature).to_string();
    if raw.starts_with("0x") {
        Ok(raw)
    } else {
        Ok(format!("0x{raw}"))
    }
}
