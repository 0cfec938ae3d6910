use financial_document_analyzer::{
    config::{AppConfig, DEFAULT_QUERY},
    crew::build_default_crew,
    llm::client_from_config,
    models::CrewInputs,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run the analysis pipeline once over a local PDF and print the report.
///
/// Usage: analyze <file.pdf> [query]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(file_path) = args.next() else {
        eprintln!("usage: analyze <file.pdf> [query]");
        std::process::exit(2);
    };
    let query = args
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();
    let query = if query.is_empty() {
        DEFAULT_QUERY.to_string()
    } else {
        query
    };

    let config = AppConfig::from_env()?;
    let crew = build_default_crew(client_from_config(config.llm.as_ref()));

    info!(file = %file_path, query = %query, "Running analysis");

    match crew.kickoff(CrewInputs { query, file_path }).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
