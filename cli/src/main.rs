use clap::Parser;

use panorama_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Resume(config) => {
            tracer::init_tracing(Some(&config.log_level));
            panorama_cli::resume::run(config).await?;
        }
    }
    Ok(())
}
