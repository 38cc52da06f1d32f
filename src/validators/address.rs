use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WALLET_ADDRESS_RE: Regex = Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap();
}

/// Checks the `0x` + 40 hex digit wallet address format. Checksum casing is
/// not enforced; the chain treats addresses case-insensitively.
pub fn is_valid_wallet_address(address: &str) -> bool {
    WALLET_ADDRESS_RE.is_match(address)
}
