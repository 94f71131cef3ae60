//! slm-scanner - barcode scanner shopping list manager
//!
//! `run` starts the barcode reader decode loop, the scan loop and the
//! correction UI. The other subcommands are one-shot maintenance tools.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use slm_common::config::{default_config_path, TomlConfig};
use slm_common::{CategoryOrdering, ProductRecord, ScanCode};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slm_scanner::cache::CacheStore;
use slm_scanner::clients::{
    Announcer, ChatCompletionClient, GoogleSearchClient, HttpAnnouncer, LogAnnouncer, TodoistClient,
};
use slm_scanner::config::{GlobalArgs, ScannerConfig};
use slm_scanner::decoder::{run_decoder, DecoderConfig};
use slm_scanner::device;
use slm_scanner::event_loop::{run_scan_loop, scan_channel, DEFAULT_SCAN_BUFFER};
use slm_scanner::resolver::ProductResolver;
use slm_scanner::scan::{feedback_message, ScanService};
use slm_scanner::shopping_list::ShoppingList;
use slm_scanner::AppState;

/// Command-line arguments for slm-scanner
#[derive(Parser, Debug)]
#[command(name = "slm-scanner")]
#[command(about = "Barcode scanner driven shopping list manager")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read the barcode reader and serve the correction UI
    Run,

    /// Handle a code as if it had been scanned
    PretendScanned { code: String },

    /// List codes of unrecognized items on the shopping list
    MissesLs,

    /// Record the product name for an unrecognized code
    MissesRecord { code: String, name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = default_config_path();
    let toml_config =
        TomlConfig::load_optional(config_path.as_deref()).context("Failed to load configuration")?;

    // Subscriber goes up before anything else that logs
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        build_timestamp = env!("BUILD_TIMESTAMP"),
        profile = env!("BUILD_PROFILE"),
        "Starting slm-scanner"
    );
    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => warn!("No config file found, using defaults and environment"),
    }

    let config =
        ScannerConfig::resolve(cli.global, toml_config).context("Failed to resolve configuration")?;
    info!("Product cache: {}", config.cache_path.display());

    let service = build_service(&config)?;

    match cli.command {
        Command::Run => run(config, service).await,
        Command::PretendScanned { code } => {
            let result = service.handle_scan(&ScanCode::new(code)).await;
            println!("{}", feedback_message(&result));
            result.map(|_| ()).context("Scan handling failed")
        }
        Command::MissesLs => {
            for code in service.list_misses().await.context("Failed to list misses")? {
                println!("{}", code);
            }
            Ok(())
        }
        Command::MissesRecord { code, name } => {
            service
                .record_correction(&ScanCode::new(code), &ProductRecord::new(name, ""))
                .await
                .context("Failed to record product")
        }
    }
}

/// Wire the clients into a scan service
fn build_service(config: &ScannerConfig) -> Result<Arc<ScanService>> {
    let (token, project_id) = config.require_todoist()?;
    let categories = CategoryOrdering::standard();

    if config.search.is_none() {
        warn!("Web search credentials missing; unknown barcodes will get placeholder names");
    }
    if config.assistant_api_key.is_none() {
        warn!("Assistant API key missing; product names fall back to search result titles");
    }

    let tasks = Arc::new(TodoistClient::new(token)?);
    let search = Arc::new(GoogleSearchClient::new(config.search.clone())?);
    let assistant = Arc::new(ChatCompletionClient::new(
        config.assistant_api_key.clone(),
        config.assistant_base_url.clone(),
        config.assistant_model.clone(),
    )?);

    let shopping_list = Arc::new(ShoppingList::new(
        tasks,
        project_id,
        categories,
        config.webapp_base_url.clone(),
    ));

    let resolver = ProductResolver::new(
        search,
        assistant,
        Arc::clone(&shopping_list),
        CacheStore::new(&config.cache_path),
        categories,
    );

    Ok(Arc::new(ScanService::new(resolver, shopping_list)))
}

async fn run(config: ScannerConfig, service: Arc<ScanService>) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    let announcer: Arc<dyn Announcer> = match &config.announce_url {
        Some(url) => Arc::new(HttpAnnouncer::new(url.clone())?),
        None => Arc::new(LogAnnouncer),
    };

    // `sender` lives until shutdown so the scan loop keeps running even with
    // the reader disabled
    let (sender, receiver) = scan_channel(DEFAULT_SCAN_BUFFER);

    if device::is_disabled(&config.barcode_reader) {
        info!("Barcode reader disabled; scans arrive only through the web UI");
    } else {
        let events = device::open_key_events(&config.barcode_reader).with_context(|| {
            format!("Failed to open barcode reader {}", config.barcode_reader.display())
        })?;
        let decoder_sender = sender.clone();
        let token = cancel.clone();
        tasks.spawn(async move {
            run_decoder(events, DecoderConfig::default(), decoder_sender, token)
                .await
                .context("Barcode decoder failed")
        });
    }

    {
        let service = Arc::clone(&service);
        let token = cancel.clone();
        tasks.spawn(async move {
            run_scan_loop(receiver, service, announcer, token).await;
            Ok(())
        });
    }

    let app = slm_scanner::build_router(AppState::new(service));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Correction UI on http://{}/shopping-list-manager/", addr);

    {
        let token = cancel.clone();
        tasks.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .context("Server error")
        });
    }

    {
        let token = cancel.clone();
        tasks.spawn(async move {
            tokio::select! {
                _ = shutdown_signal() => token.cancel(),
                _ = token.cancelled() => {}
            }
            Ok(())
        });
    }

    // The first task to finish, for whatever reason, stops the others
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.context("Task panicked").and_then(|r| r);
        if let Err(e) = result {
            error!("{:#}", e);
            first_error.get_or_insert(e);
        }
        cancel.cancel();
    }

    drop(sender);
    info!("Shutdown complete");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
