use std::{sync::Arc, time::Duration};

use tokio::{signal, sync::mpsc};
use tracing::{error, info};

use tradebook_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db = Arc::new(db_pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);

    // Build services
    let mailer: api::notifications::SharedMailer = Arc::new(api::notifications::LogMailer);
    let stock = api::services::StockLedger::new(cfg.allow_negative_stock);
    let alerts = api::services::AlertService::new(db.clone(), mailer.clone());
    let documents =
        api::services::DocumentService::new(db.clone(), stock, Some(event_sender.clone()));
    let snoozes = api::services::SnoozeService::new(db.clone());
    let auth = Arc::new(api::auth::AuthService::new(
        cfg.jwt_secret.clone(),
        db.clone(),
    ));

    // Spawn event processor forwarding threshold crossings to the notifier
    tokio::spawn(api::events::process_events(
        event_rx,
        Arc::new(alerts.clone()),
    ));

    // Spawn the recurring digest job
    api::services::DigestJob::new(
        db.clone(),
        alerts.clone(),
        mailer,
        Duration::from_secs(cfg.digest_interval_secs),
    )
    .spawn();

    let services = api::handlers::AppServices {
        documents,
        alerts,
        snoozes,
    };

    let app_state = api::AppState {
        db,
        config: cfg.clone(),
        auth,
        event_sender,
        services,
    };

    let app = api::build_router(app_state);

    // Bind and serve
    let addr = cfg.socket_addr()?;
    info!("tradebook-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
