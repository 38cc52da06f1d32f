use crate::app::credential_service::CredentialService;
use crate::domain::error::ApiError;
use crate::infrastructure::config::Config;
use crate::infrastructure::storage::file_storage::Credential;
use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_CERT_IMAGE: &str = "/placeholder.svg";

#[derive(Debug, Deserialize)]
pub struct MintCredentialRequest {
    pub mint_token: String,
}

/// Certificate shape consumed by the frontend gallery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateView {
    pub id: String,
    pub token_id: Option<String>,
    pub title: String,
    pub description: String,
    pub recipient_address: String,
    pub recipient_name: Option<String>,
    pub issue_date: String,
    pub topic: String,
    pub score: u32,
    pub image_url: String,
    pub metadata_uri: Option<String>,
    pub transaction_hash: String,
    pub minted: bool,
}

impl CertificateView {
    fn from_credential(credential: &Credential, config: &Config) -> Self {
        CertificateView {
            id: credential.id.clone(),
            token_id: credential.token_id.clone(),
            title: format!("{} Certificate", credential.skill),
            description: format!("Cred-AI verified skill: {}", credential.skill),
            recipient_address: credential.wallet_address.clone(),
            recipient_name: None,
            issue_date: credential.minted_at.to_rfc3339(),
            topic: credential.skill.clone(),
            score: credential.score,
            image_url: config
                .cert_image_base
                .clone()
                .unwrap_or_else(|| DEFAULT_CERT_IMAGE.to_string()),
            metadata_uri: None,
            transaction_hash: credential.transaction_hash.clone(),
            minted: true,
        }
    }
}

#[post("/mint-credential")]
pub async fn mint_credential(
    req: Json<MintCredentialRequest>,
    credential_service: Data<Arc<CredentialService>>,
    config: Data<Arc<Config>>,
) -> Result<HttpResponse, ApiError> {
    if req.mint_token.trim().is_empty() {
        return Err(ApiError::BadRequest("mint_token is required".to_string()));
    }

    let credential = credential_service.mint(&req.mint_token).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": CertificateView::from_credential(&credential, &config),
    })))
}

#[get("/credentials/{wallet}")]
pub async fn wallet_credentials(
    wallet: Path<String>,
    credential_service: Data<Arc<CredentialService>>,
    config: Data<Arc<Config>>,
) -> Result<HttpResponse, ApiError> {
    let views: Vec<CertificateView> = credential_service
        .credentials_by_wallet(&wallet)
        .iter()
        .map(|c| CertificateView::from_credential(c, &config))
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": views,
    })))
}
