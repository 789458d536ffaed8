//! Statusfeed - live status, update and commit feed
//!
//! A small HTTP service publishing an operator status banner and the
//! latest update post (both driven by Discord messages) alongside a
//! commit feed merged from several GitHub repositories.
//!
//! Exit codes:
//!   0 - Clean shutdown
//!   1 - Startup or runtime error (config, Discord connection, bind, etc.)

mod bootstrap;
mod chat;
mod cli;
mod commits;
mod config;
mod error;
mod http;
mod models;
mod state;

use anyhow::{Context, Result};
use chat::discord::{self, DiscordPlatform, GatewayHandler};
use chat::Ingester;
use cli::Args;
use commits::{CommitAggregator, CommitSource, GithubSource};
use config::Config;
use crate::error::ChatError;
use state::LiveState;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the variables may come from the real environment
    let env_file = env_file_error(dotenvy::dotenv());

    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    if let Some(e) = env_file {
        warn!("Ignoring malformed .env file: {}", e);
    }

    info!("Statusfeed v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args.clone().redacted());

    if let Err(e) = run(args).await {
        error!("Statusfeed failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .statusfeed.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  .statusfeed.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .statusfeed.toml")?;

    println!("✅ Created .statusfeed.toml with default settings.");
    println!("   Set the Discord channels and commit sources, then provide DISCORD_TOKEN.");
    Ok(())
}

/// The error worth reporting from a `.env` load, if any.
///
/// A missing file is not one.
fn env_file_error<T>(result: dotenvy::Result<T>) -> Option<dotenvy::Error> {
    match result {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` overrides the level chosen by --verbose / --quiet.
fn init_logging(args: &Args) {
    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},serenity=warn", level)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Bootstrap the live state, then run the gateway, the refresher and the
/// HTTP server until shutdown.
async fn run(args: Args) -> Result<()> {
    let config = Arc::new(load_config(&args)?);
    config.validate().context("Invalid configuration")?;

    let state = Arc::new(LiveState::new());
    let aggregator = Arc::new(build_aggregator(&config)?);
    let ingester = Ingester::new(config.channels(), Arc::clone(&state));

    // Step 1: connect to Discord (an invalid token is fatal)
    let platform = DiscordPlatform::connect(&config.discord.token)
        .await
        .context("Failed to connect to Discord")?;

    // Step 2: seed status, update and commits before serving anything
    let summary = bootstrap::bootstrap(
        &platform,
        &ingester,
        &aggregator,
        &state,
        config.discord.history_limit,
    )
    .await
    .context("Bootstrap failed")?;

    info!(
        status_seeded = summary.status_seeded,
        update_seeded = summary.update_seeded,
        commits = summary.commits,
        failed_sources = summary.failed_sources,
        "Bootstrap complete"
    );
    if summary.failed_sources > 0 {
        warn!(
            "{} of {} commit sources failed during bootstrap",
            summary.failed_sources,
            aggregator.source_count()
        );
    }

    // Step 3: start live producers
    let handler = GatewayHandler::new(ingester, config.discord.ack_emoji.clone());
    let mut client = discord::build_client(&config.discord.token, handler)
        .await
        .context("Failed to create Discord client")?;
    let gateway = tokio::spawn(async move {
        client.start().await.map_err(ChatError::Connect)
    });

    tokio::spawn(commits::run_periodic(
        Arc::clone(&aggregator),
        Arc::clone(&state),
        config.refresh_interval(),
    ));

    // Step 4: serve
    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    info!("Listening on {}", config.server.listen);

    let router = http::router(Arc::clone(&state));
    let server = async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    };

    tokio::select! {
        result = server => {
            result.context("HTTP server error")?;
            info!("Shut down");
            Ok(())
        }
        result = gateway => {
            match result {
                Ok(Ok(())) => anyhow::bail!("Discord gateway closed"),
                Ok(Err(e)) => Err(e).context("Discord gateway error"),
                Err(e) => Err(e).context("Discord gateway task failed"),
            }
        }
    }
}

/// Load configuration from file or use defaults, then apply arguments.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        Config::load(config_path)?
    } else {
        match Config::load_default() {
            Ok(Some(config)) => {
                info!("Loaded default config from .statusfeed.toml");
                config
            }
            Ok(None) => {
                debug!("No config file found, using defaults");
                Config::default()
            }
            Err(e) => {
                warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    };

    config.merge_with_args(args);
    Ok(config)
}

/// One GitHub source per configured endpoint, sharing one HTTP client.
fn build_aggregator(config: &Config) -> Result<CommitAggregator> {
    let http_client = reqwest::Client::builder()
        .user_agent(&config.commits.user_agent)
        .timeout(config.fetch_timeout())
        .build()
        .context("Failed to create HTTP client")?;

    let sources: Vec<Box<dyn CommitSource>> = config
        .commits
        .sources
        .iter()
        .map(|url| {
            Box::new(GithubSource::new(http_client.clone(), url.clone(), config.commits.per_page))
                as Box<dyn CommitSource>
        })
        .collect();

    Ok(CommitAggregator::new(
        sources,
        config.fetch_timeout(),
        config.commits.feed_limit,
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
