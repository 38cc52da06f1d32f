pub mod credential_service;
pub mod quiz_service;
