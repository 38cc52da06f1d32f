use actix_web::{web, App, HttpServer};

use credai_backend::api::{generate_quiz, health, mint_credential, submit_quiz, wallet_credentials};
use credai_backend::app::credential_service::CredentialService;
use credai_backend::app::quiz_service::QuizService;
use credai_backend::infrastructure::ai::{CompletionClient, GroqClient};
use credai_backend::infrastructure::config::Config;
use credai_backend::infrastructure::logger::Logger;
use credai_backend::infrastructure::storage::file_storage::Storage;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Configuration first: the log level comes from it
    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Configuration loading failed: {e}"),
            ));
        }
    };

    Logger::init(&config.log_level);
    tracing::info!("🚀 Starting Cred-AI backend...");

    let storage = match Storage::new(&config.data_dir) {
        Ok(storage) => {
            tracing::info!("✅ Storage initialized successfully");
            Arc::new(storage)
        }
        Err(e) => {
            tracing::error!("❌ Failed to initialize storage: {e}");
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Storage initialization failed: {e}"),
            ));
        }
    };

    if config.rpc_url.is_none() || config.private_key.is_none() {
        tracing::warn!(
            "⚠️ RPC_URL or PRIVATE_KEY not set; credential minting will fail until configured"
        );
    }

    let completion: Arc<dyn CompletionClient> = Arc::new(GroqClient::new(
        config.groq_api_key.clone(),
        config.groq_model.clone(),
    ));
    let quiz_service = Arc::new(QuizService::new(Arc::clone(&storage), completion));
    let credential_service = Arc::new(CredentialService::new(
        Arc::clone(&storage),
        Arc::clone(&config),
    ));
    tracing::info!("✅ Services initialized successfully");

    let port = config.port;
    tracing::info!("🌐 Starting Cred-AI backend on port {port}");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(actix_cors::Cors::permissive())
            .app_data(web::Data::new(Arc::clone(&config)))
            .app_data(web::Data::new(Arc::clone(&quiz_service)))
            .app_data(web::Data::new(Arc::clone(&credential_service)))
            .service(health)
            .service(
                web::scope("/api")
                    .service(generate_quiz)
                    .service(submit_quiz)
                    .service(mint_credential)
                    .service(wallet_credentials),
            )
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
