use std::sync::Arc;

use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use marketplace_api::{config, db, events, handlers, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!("Starting marketplace API ({})", cfg.environment);

    let conn = db::establish_connection_from_app_config(&cfg).await?;

    let (event_tx, event_rx) = mpsc::channel(1024);
    tokio::spawn(events::process_events(event_rx));

    let bind_address = cfg.bind_address();
    let state = Arc::new(AppState::new(
        conn,
        cfg,
        events::EventSender::new(event_tx),
    ));

    let app = handlers::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on {}", bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
