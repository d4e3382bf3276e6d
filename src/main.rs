mod audio;
mod cli;
mod client;
mod config;
mod correction;
mod dto;
mod error;
mod server;
mod transcription;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
        } => {
            info!("Starting sensescribe backend");
            let config = AppConfig::from_env()?;
            server::run_server(config, host, port, static_dir).await?;
        }
        Commands::TranscribeFile {
            audio_file,
            server_url,
            correct,
        } => {
            client::run_client(&audio_file, &server_url, correct).await?;
        }
    }

    Ok(())
}
