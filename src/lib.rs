pub mod app;
pub mod cli;
pub mod command_processor;
pub mod config;
pub mod controller;
pub mod env_manager;
pub mod forms;
pub mod list_view;
pub mod models;
pub mod render;
pub mod service;
pub mod terminal;
pub mod version;

use anyhow::{Context, Result, anyhow};
use log::*;
use secrecy::SecretString;
use std::sync::Arc;

use crate::command_processor::AppContext;
use crate::controller::Controller;
use crate::service::session_store::SessionStore;
use crate::service::{Backend, MemoryBackend, SupabaseClient};
use crate::terminal::RustylineTerminal;

/// Builds the service client described by `config`.
pub fn connect(config: &Config) -> Result<Arc<dyn Backend>> {
    let url = config.service.url.as_deref().ok_or_else(|| {
        anyhow!("Falta la URL del servicio. Use 'agenda config set service.url <url>' o AGENDA_URL")
    })?;
    let anon_key = config.service.anon_key.as_deref().ok_or_else(|| {
        anyhow!("Falta la clave pública. Use 'agenda config set service.anon_key <clave>' o AGENDA_ANON_KEY")
    })?;
    let mut client = SupabaseClient::new(url, SecretString::from(anon_key.to_string()))
        .context("Failed to create service client")?;
    if config.session.persist {
        client = client.with_session_store(SessionStore::new()?);
    }
    info!("Using service at {}", client.base_url());
    Ok(Arc::new(client))
}

pub async fn run(cli: cli::Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    env_manager::apply_overrides(&mut config);

    let command = cli::convert_to_command_args(&cli);
    let offline = command.as_ref().is_some_and(|args| !app::needs_session(&args.command));
    // Commands that never reach the service still work before it is configured.
    let backend: Arc<dyn Backend> =
        if offline { Arc::new(MemoryBackend::new()) } else { connect(&config)? };

    let controller = Controller::new(backend, config.list_view());
    let terminal = RustylineTerminal::new()?;
    let mut ctx = AppContext::new(controller, Box::new(terminal), config);
    if let Some(path) = cli.config {
        ctx = ctx.with_config_path(path);
    }

    let app = app::Application::new();
    match command {
        Some(args) => app.run_once(&mut ctx, args).await,
        None => app.run(&mut ctx).await,
    }
}

/// `verbose` wins over `AGENDA_LOG_LEVEL`, which wins over `RUST_LOG`.
pub fn init_logger(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else if let Some(level) = env_manager::log_level() {
        builder.filter_level(level);
    }
    builder
        .format(|buf, record| {
            use chrono::Local;
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}

// Re-export commonly used types
pub use config::Config;
pub use controller::{AppError, AppState, Tab};
pub use models::{Appointment, AppointmentStatus, Contact};
