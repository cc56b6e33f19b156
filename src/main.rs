use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursebell::api::router;
use coursebell::canvas::{CanvasClient, CanvasHttpClient, NoopCanvasClient};
use coursebell::config::AppConfig;
use coursebell::notify::{Notifier, NoopNotifier, WebhookNotifier};
use coursebell::services::{ReminderScheduler, SyncService};
use coursebell::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "coursebell=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(AppConfig::from_env()?);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let canvas: Arc<dyn CanvasClient> = match &config.canvas_token {
        Some(token) => Arc::new(CanvasHttpClient::new(&config.canvas_base_url, token)?),
        None => {
            warn!("CANVAS_TOKEN not set; sync will produce no records");
            Arc::new(NoopCanvasClient)
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())?),
        None => {
            warn!("WEBHOOK_URL not set; notifications will only be logged");
            Arc::new(NoopNotifier)
        }
    };

    // Initial sync so reminders have records to evaluate; failure is not
    // fatal, the background loop retries.
    let sync = SyncService::new(pool.clone(), canvas.clone());
    if let Err(e) = sync.sync_all().await {
        warn!("Initial sync failed: {:?}", e);
    }
    tokio::spawn(sync.start_periodic(StdDuration::from_secs(config.sync_interval_secs)));

    let scheduler = ReminderScheduler::new(
        pool.clone(),
        notifier.clone(),
        StdDuration::from_secs(config.tick_interval_secs),
        Duration::seconds(config.tolerance_secs),
        config.display_tz,
    );
    tokio::spawn(scheduler.start());

    let state = AppState {
        db: pool,
        canvas,
        notifier,
        config: config.clone(),
    };
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.listen_port));
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
