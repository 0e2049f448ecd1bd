//! Voice Lifecycle Service
//!
//! Gateway bot that provisions personal voice rooms, tracks presence
//! sessions and deletes rooms once they stay empty.
//!
//! # Servers
//!
//! - Gateway connection to the chat platform (serenity)
//! - HTTP server for health, metrics and the dashboard API (default: 0.0.0.0:8081)
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing and the Prometheus metrics recorder
//! 3. Open the session history database (runs migrations)
//! 4. Build the platform adapter and the lifecycle actor
//! 5. Start the deletion scheduler and event dispatcher
//! 6. Start the HTTP server (liveness, readiness, metrics, dashboard)
//! 7. Connect the gateway client
//! 8. Wait for shutdown signal

#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // main.rs orchestrates startup, naturally longer

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use common::secret::ExposeSecret;
use serenity::http::Http;
use serenity::Client;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vc_service::actors::{
    ActorMetrics, LifecycleControllerHandle, LifecycleSettings, RoomLifecycle,
};
use vc_service::collaborators::Collaborators;
use vc_service::config::Config;
use vc_service::dashboard::{dashboard_router, DashboardState};
use vc_service::discord::{self, DiscordPlatform, Handler};
use vc_service::dispatcher::EventDispatcher;
use vc_service::forward::MentionForwarder;
use vc_service::history::SqliteHistoryArchive;
use vc_service::observability::{health_router, init_metrics_recorder, HealthState};
use vc_service::scheduler::{DeletionScheduler, DeletionTimings};
use vc_service::session::ProvisionedRooms;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let log_json = config.as_ref().is_ok_and(|c| c.log_json);

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vc_service=debug,tower_http=debug,serenity=warn".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!log_json).then(tracing_subscriber::fmt::layer))
        .init();

    info!("Starting Voice Lifecycle Service");

    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        base_room_id = %config.base_room_id,
        category_id = %config.category_id,
        notice_channel_id = config.notice_channel_id,
        first_empty_notice_seconds = config.first_empty_notice_seconds,
        final_delete_seconds = config.final_delete_seconds,
        http_bind_address = %config.http_bind_address,
        "Configuration loaded successfully"
    );

    // Must happen before any metrics are recorded
    info!("Initializing Prometheus metrics recorder...");
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;
    info!("Prometheus metrics recorder initialized");

    let health_state = Arc::new(HealthState::new());

    info!("Opening session history database...");
    let history = SqliteHistoryArchive::connect(&config.database_url)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to open session history database");
            e
        })?;

    // Platform adapter. The gateway cache is attached once the client exists.
    let http = Arc::new(Http::new(config.bot_token.expose_secret()));
    let platform = Arc::new(DiscordPlatform::new(
        http,
        config.category_id,
        config.notice_channel_id,
    ));
    let collaborators = Collaborators {
        provisioning: platform.clone(),
        notifier: platform.clone(),
        history: Arc::new(history.clone()),
        membership: platform.clone(),
    };

    let settings = LifecycleSettings {
        base_room: config.base_room_id,
        category: config.category_id,
    };
    let provisioned = ProvisionedRooms::new();

    info!("Initializing lifecycle actor...");
    let actor_metrics = ActorMetrics::new();
    let controller_handle = LifecycleControllerHandle::new(RoomLifecycle::new(
        settings,
        collaborators.clone(),
        provisioned.clone(),
        actor_metrics,
    ));
    info!("Lifecycle actor started");

    // All background tasks are children of the controller's token
    let shutdown_token = controller_handle.child_token();

    let scheduler = DeletionScheduler::new(
        DeletionTimings {
            first_empty_notice: config.first_empty_notice(),
            final_delete: config.final_delete(),
        },
        config.base_room_id,
        collaborators,
        provisioned,
        shutdown_token.child_token(),
    );
    let dispatcher = EventDispatcher::new(
        settings,
        controller_handle.clone(),
        scheduler.clone(),
        platform.clone(),
    );

    // Start HTTP server (MUST succeed - fail startup if it doesn't)
    let http_addr: SocketAddr = config.http_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.http_bind_address, "Invalid HTTP bind address");
        format!("Invalid HTTP bind address: {e}")
    })?;

    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );
    let dashboard_state = Arc::new(DashboardState {
        controller: controller_handle.clone(),
        history,
    });

    let app = health_router(Arc::clone(&health_state))
        .merge(metrics_router)
        .merge(dashboard_router(dashboard_state));

    // Bind listener BEFORE spawning to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %http_addr, "Failed to bind HTTP server");
            format!("Failed to bind HTTP server to {http_addr}: {e}")
        })?;
    info!(addr = %http_addr, "HTTP server bound successfully");

    let http_shutdown_token = shutdown_token.child_token();
    tokio::spawn(async move {
        info!(addr = %http_addr, "HTTP server starting");
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            http_shutdown_token.cancelled().await;
            info!("HTTP server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "HTTP server failed");
        }
    });

    // Gateway client
    info!("Connecting to chat gateway...");
    let forwarder = MentionForwarder::new(platform.clone(), platform.clone(), config.category_id);
    let handler = Handler::new(
        dispatcher,
        forwarder,
        controller_handle.clone(),
        Arc::clone(&platform),
        Arc::clone(&health_state),
        &config.command_prefix,
    );
    let mut client = Client::builder(config.bot_token.expose_secret(), discord::intents())
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to build gateway client");
            e
        })?;
    platform.attach_cache(Arc::clone(&client.cache));
    let shard_manager = Arc::clone(&client.shard_manager);

    let gateway_token = shutdown_token.child_token();
    tokio::spawn(async move {
        tokio::select! {
            () = gateway_token.cancelled() => {}
            result = client.start() => {
                if let Err(e) = result {
                    error!(error = %e, "Gateway client failed");
                }
            }
        }
    });
    info!("Gateway client started");

    info!("Voice Lifecycle Service running - press Ctrl+C to shutdown");
    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Mark as not ready immediately so probes stop routing traffic
    health_state.set_not_ready();

    // Pending deletions are abandoned; rooms left empty are picked up by
    // the next empty transition after restart.
    scheduler.shutdown().await;
    shard_manager.shutdown_all().await;
    shutdown_token.cancel();

    // Give tasks time to shut down
    tokio::time::sleep(Duration::from_secs(2)).await;

    controller_handle.cancel();

    info!("Voice Lifecycle Service shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable because
/// without signal handlers, we cannot gracefully shut down the service.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
