use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use gravity_aggregation::config::AppConfig;
use gravity_aggregation::hub::NotificationHub;
use gravity_aggregation::store::{PgProfileRepository, ProfileRepository};
use gravity_aggregation::{bot, routes, AppState};
use gravity_shared::clients::db::create_pool;
use gravity_shared::clients::telegram::{ChatTransport, LogTransport, TelegramClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gravity_shared::middleware::init_tracing("gravity-aggregation");

    let config = AppConfig::load()?;
    let port = config.port;

    // The auth extractor reads JWT_SECRET from env
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let metrics = gravity_shared::middleware::init_metrics()?;
    let db = create_pool(&config.database_url)?;
    let repo: Arc<dyn ProfileRepository> = Arc::new(PgProfileRepository::new(db));

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let (hub, hub_handle) = NotificationHub::new(&config.hub(), shutdown.clone());

    let (transport, bot_task) = match config.bot_token() {
        Some(token) => {
            let bot = TelegramClient::new(&config.telegram_api_url, token);
            let task = tokio::spawn(bot::run_updates(bot.clone(), hub_handle.clone(), shutdown.clone()));
            let transport: Arc<dyn ChatTransport> = Arc::new(bot);
            (transport, Some(task))
        }
        None => {
            tracing::warn!("no telegram bot token configured, notifications will only be logged");
            let transport: Arc<dyn ChatTransport> = Arc::new(LogTransport);
            (transport, None)
        }
    };
    let hub_workers = hub.start(transport);

    let state = Arc::new(AppState {
        repo,
        config,
        hub: hub_handle,
        metrics,
    });
    let app = routes::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "gravity-aggregation starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    shutdown.cancel();
    hub_workers.join().await;
    if let Some(task) = bot_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "bot update task panicked");
        }
    }

    tracing::info!("gravity-aggregation stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => return,
    }

    tracing::info!("shutdown signal received");
    shutdown.cancel();
}
