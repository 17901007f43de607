//! Redwire - edit Node-RED function and template code as plain files
//!
//! Extracts the code of every function and dashboard template node into
//! the functions directory, keeps it in sync with the flow file in both
//! directions, and serves the editor API.

mod api;
mod cli;
mod config;
mod constants;
mod error;

use std::sync::Arc;

use clap::Parser;
use flow_deploy::{AdminClient, BroadcastReload, DeployTransport, Dispatcher};
use sync_engine::{BroadcastEventSink, MergingTransport, SyncEngine, WatchCoordinator};
use tokio::sync::broadcast::error::RecvError;

use api::AppState;
use cli::Cli;
use config::EditorConfig;
use constants::CHANNEL_CAPACITY;
use error::StartupError;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Redwire starting...");

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let mut config = EditorConfig::load(&cli.config).await?;
    cli.apply_to(&mut config);
    log::info!("Flows file: {}", config.flows_path().display());
    log::info!("Functions directory: {}", config.functions_dir.display());

    let admin = AdminClient::with_timeout(config.admin_url.clone(), config.request_timeout())?;
    let reload = Arc::new(BroadcastReload::new(CHANNEL_CAPACITY));
    spawn_reload_listener(&reload);

    let transport: Arc<dyn DeployTransport> = if config.remote_partial {
        log::info!("Partial deploys go to {}/flows/partial", admin.base_url());
        Arc::new(admin.clone())
    } else {
        Arc::new(MergingTransport::new(admin.clone(), config.sync_paths()))
    };

    let dispatcher = Dispatcher::new(transport, reload, config.deploy_method)
        .with_flows_file(config.flows_file.clone());
    let events = Arc::new(BroadcastEventSink::new(CHANNEL_CAPACITY));
    let engine = Arc::new(SyncEngine::new(
        config.sync_paths(),
        Arc::new(dispatcher),
        events,
    ));

    if let Err(e) = engine.extract_from_flows().await {
        log::error!("Initial extraction failed: {}", e);
    }

    let coordinator = WatchCoordinator::new(
        engine.guard().clone(),
        engine.clone(),
        config.watch_settings(),
    );
    if config.watch_enabled {
        let paths = engine.paths();
        if let Err(e) = coordinator.start(&paths.flows_file, &paths.functions_dir).await {
            log::error!("Failed to start file watchers: {}", e);
        }
    } else {
        log::info!("File watching disabled");
    }

    let app = api::router(AppState { engine, admin });
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    log::info!("Editor API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    coordinator.stop();
    log::info!("Redwire stopped");
    Ok(())
}

/// Log event-bus reloads; nothing in this process can reload the runtime
fn spawn_reload_listener(reload: &BroadcastReload) {
    let mut rx = reload.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(request) => log::warn!(
                    "Runtime reload requested for {} node(s); restart Node-RED if the changes do not appear",
                    request.node_ids.len()
                ),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("{} reload request(s) dropped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down...");
}
