use clap::Parser;
use elysees_server::Cli;
use log::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Cli::parse().into_config();
    info!("Starting up elysees-server");
    elysees_server::serve(config).await
}
