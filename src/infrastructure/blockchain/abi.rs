use crate::domain::error::MintError;
use ethers::core::types::Bytes;
use ethers::core::utils::keccak256;

/// Function signature of the soulbound mint entrypoint on the credential
/// contract. The selector is the first 4 bytes of its Keccak-256 hash.
pub const MINT_TO_SIGNATURE: &str = "mintTo(address,string)";

const WORD: usize = 32;

/// Append-only builder for contract call data. Every argument slot is a
/// 32-byte word; dynamic data is length-prefixed and zero-padded up to the
/// next word boundary.
#[derive(Debug, Default)]
pub struct CallDataBuilder {
    out: Vec<u8>,
}

impl CallDataBuilder {
    pub fn new() -> Self {
        Self { out: Vec::new() }
    }

    /// Appends the 4-byte selector for an ASCII function signature.
    pub fn selector(mut self, signature: &str) -> Self {
        let hash = keccak256(signature.as_bytes());
        self.out.extend_from_slice(&hash[..4]);
        self
    }

    /// Appends `bytes` as a single word, left-padded with zeros.
    /// `bytes` must not exceed 32 bytes.
    pub fn word_left_padded(mut self, bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= WORD);
        self.out.extend_from_slice(&[0u8; WORD][..WORD - bytes.len()]);
        self.out.extend_from_slice(bytes);
        self
    }

    /// Appends a big-endian unsigned integer word.
    pub fn uint_word(self, value: u64) -> Self {
        self.word_left_padded(&value.to_be_bytes())
    }

    /// Appends a dynamic byte string: a length word (byte count, not hex
    /// characters) followed by the data, zero-padded to a word boundary.
    pub fn length_prefixed_bytes(mut self, data: &[u8]) -> Self {
        self = self.uint_word(data.len() as u64);
        self.out.extend_from_slice(data);
        let trailing = data.len() % WORD;
        if trailing != 0 {
            self.out.extend_from_slice(&[0u8; WORD][..WORD - trailing]);
        }
        self
    }

    pub fn build(self) -> Bytes {
        Bytes::from(self.out)
    }
}

/// Encodes a `mintTo(address,string)` call.
///
/// Layout: selector, then two head words (recipient address left-padded, and
/// the byte offset of the string data, always 0x40 since the head is exactly
/// two slots), then the length-prefixed metadata tail.
pub fn encode_mint_to(wallet_address: &str, metadata_json: &str) -> Result<Bytes, MintError> {
    let raw = hex::decode(wallet_address.trim_start_matches("0x"))
        .map_err(|e| MintError::Encoding(format!("address is not valid hex: {e}")))?;
    if raw.len() != 20 {
        return Err(MintError::Encoding(format!(
            "address must decode to 20 bytes, got {}",
            raw.len()
        )));
    }

    Ok(CallDataBuilder::new()
        .selector(MINT_TO_SIGNATURE)
        .word_left_padded(&raw)
        .uint_word(0x40)
        .length_prefixed_bytes(metadata_json.as_bytes())
        .build())
}
