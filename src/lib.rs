pub mod agent;
pub mod cli;
pub mod config;
pub mod graph;
pub mod llm;
pub mod models;
pub mod recovery;
pub mod server;

use agent::TutorAgent;
use cli::Args;
use config::Settings;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Completion URL: {}", args.completion_url);
    info!("Model: {}", args.model);
    info!("API Key Set: {}", !args.api_key.is_empty());
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("none"));
    info!("Legend Font: {}", args.font_path.as_deref().unwrap_or("system default"));
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let settings = Settings::from_args(&args)?;
    let agent = Arc::new(TutorAgent::new(&settings)?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(())
}
