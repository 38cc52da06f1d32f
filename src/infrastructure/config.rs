use crate::infrastructure::blockchain::tx::{DEFAULT_GAS_LIMIT, DEFAULT_GAS_PRICE_GWEI};
use crate::validators::is_valid_wallet_address;
use anyhow::{anyhow, Result};
use std::env;
use std::str::FromStr;

pub const DEFAULT_NONCE_TIMEOUT_MS: u64 = 1_000;
const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// Process-wide configuration, read once at startup and injected into the
/// services. Mint-critical values stay optional: their absence fails the
/// mint request, not the boot.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub data_dir: String,

    // Chain
    pub rpc_url: Option<String>,
    pub private_key: Option<String>,
    pub contract_address: Option<String>,
    pub from_address: Option<String>,
    pub chain_id: Option<u64>,
    pub nonce_timeout_ms: u64,
    pub gas_limit: u64,
    pub gas_price_gwei: u64,

    // Quiz upstream
    pub groq_api_key: Option<String>,
    pub groq_model: String,

    // Presentation
    pub cert_image_base: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Self {
            port: Self::env_parse_or("PORT", 4000)?,
            log_level: Self::env_or("LOG_LEVEL", "info"),
            data_dir: Self::env_or("DATA_DIR", "data"),
            rpc_url: Self::env_opt("RPC_URL"),
            private_key: Self::env_opt("PRIVATE_KEY"),
            contract_address: Self::env_opt("CONTRACT_ADDRESS"),
            from_address: Self::env_opt("FROM_ADDRESS"),
            chain_id: match Self::env_opt("CHAIN_ID") {
                Some(raw) => Some(
                    u64::from_str(&raw).map_err(|_| anyhow!("Invalid CHAIN_ID: '{raw}'"))?,
                ),
                None => None,
            },
            nonce_timeout_ms: Self::env_parse_or("NONCE_TIMEOUT_MS", DEFAULT_NONCE_TIMEOUT_MS)?,
            gas_limit: Self::env_parse_or("GAS_LIMIT", DEFAULT_GAS_LIMIT)?,
            gas_price_gwei: Self::env_parse_or("GAS_PRICE_GWEI", DEFAULT_GAS_PRICE_GWEI)?,
            groq_api_key: Self::env_opt("GROQ_API_KEY"),
            groq_model: Self::env_or("GROQ_MODEL", DEFAULT_GROQ_MODEL),
            cert_image_base: Self::env_opt("CERT_IMAGE_BASE"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Startup validation covers format only. Presence of RPC_URL and
    /// PRIVATE_KEY is checked per mint request.
    fn validate(&self) -> Result<()> {
        if let Some(addr) = &self.contract_address {
            if !is_valid_wallet_address(addr) {
                return Err(anyhow!(
                    "Invalid CONTRACT_ADDRESS: '{addr}'. Expected: 0x followed by 40 hex characters"
                ));
            }
        }
        if let Some(addr) = &self.from_address {
            if !is_valid_wallet_address(addr) {
                return Err(anyhow!(
                    "Invalid FROM_ADDRESS: '{addr}'. Expected: 0x followed by 40 hex characters"
                ));
            }
        }
        if self.port == 0 {
            return Err(anyhow!("Invalid PORT"));
        }
        Ok(())
    }

    /// Empty values are treated as unset.
    fn env_opt(key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) if !value.trim().is_empty() => Some(value),
            _ => None,
        }
    }

    fn env_or(key: &str, fallback: &str) -> String {
        Self::env_opt(key).unwrap_or_else(|| fallback.to_string())
    }

    fn env_parse_or<T: FromStr>(key: &str, fallback: T) -> Result<T> {
        match Self::env_opt(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|_| anyhow!("Invalid value for {key}: '{raw}'")),
            None => Ok(fallback),
        }
    }
}
