pub mod abi;
pub mod client;
pub mod tx;
