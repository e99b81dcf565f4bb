//! Telegram admin panel behind a password, plus an HTTP contact intake that forwards to admins.

mod config;
mod db;
mod domain;
mod i18n;
mod services;
mod tg_bot;
mod types;
mod web;

use clap::Parser;
use config::AppConfig;
use db::Database;
use services::{AdminGate, ContactService};
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tg_bot::transport::ChatTransport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

/// `RUST_LOG` first, then the configured level, then `info`.
fn env_filter(config_level: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    config_level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = PathBuf::from(&args.config);
    let loaded = AppConfig::load(&config_path);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(
            loaded.as_ref().ok().and_then(|c| c.log_level.as_deref()),
        ))
        .with_target(false)
        .init();

    info!("Starting admin gate bot");
    info!(config_path = ?config_path, "Loading config");

    let config = match loaded {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(e);
        }
    };

    let db_path = config.get_db_path(&config_path);
    let db_path_str = db_path.to_string_lossy().to_string();
    debug!(db_path = db_path_str, "Database path");

    let db = match Database::new(&db_path_str).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to open database");
            return Err(e);
        }
    };

    let bot = Bot::new(&config.tg_bot_token);
    let lang = config.bot_lang.clone();
    if !i18n::is_supported(lang.as_str()) {
        warn!(lang = %lang, "Unsupported bot language, falling back to English texts");
    }

    let commands = vec![BotCommand::new("start", i18n::t(lang.as_str(), "command-start"))];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    let transport: Arc<dyn ChatTransport> = Arc::new(bot.clone());
    let gate = AdminGate::new(
        transport.clone(),
        db.clone(),
        &config.admin_password,
        lang.clone(),
    );

    let shutdown = CancellationToken::new();
    let web_task = if config.web.enabled {
        let contacts = ContactService::new(db.clone(), transport, lang);
        Some(tokio::spawn(web::run_server(
            config.web.clone(),
            contacts,
            shutdown.clone(),
        )))
    } else {
        info!("Web server disabled");
        None
    };

    Dispatcher::builder(bot, tg_bot::schema())
        .dependencies(dptree::deps![gate])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, shutting down");
    shutdown.cancel();
    if let Some(task) = web_task
        && let Err(e) = task.await
    {
        error!(error = %e, "Web server task failed");
    }
    db.close().await;
    Ok(())
}
