use agenda::cli::Cli;
use anyhow::Result;
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let env_file = agenda::env_manager::load_env_file();
    let cli = Cli::parse();
    agenda::init_logger(cli.verbose);
    agenda::env_manager::log_env_file(env_file.as_ref());
    log::debug!("Starting agenda {}", agenda::version::get_display_version());

    agenda::run(cli).await
}
