use financial_document_analyzer::{
    api::{start_server, ApiState},
    config::AppConfig,
    crew::build_default_crew,
    llm::client_from_config,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let address = config.bind_address();

    info!("Financial Document Analyzer - API Server");
    info!("Listening address: {}", address);
    info!("Upload directory: {}", config.upload_dir.display());

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let llm = client_from_config(config.llm.as_ref());
    match &llm {
        Some(client) => info!(model = client.model(), "Language model enabled"),
        None => warn!("OPENAI_API_KEY not set; reports use templated output"),
    }

    let crew = Arc::new(build_default_crew(llm));
    let state = ApiState::new(crew, config.upload_dir.clone(), config.max_upload_bytes);

    start_server(state, &address).await?;

    Ok(())
}
