//! wcs-server: loads settings from the environment (and `.env`), resolves the resource
//! declaration, prepares the store and serves the API until Ctrl+C or SIGTERM.

use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use wcs_admin::notify::{LogNotifier, MailgunNotifier, Notifier};
use wcs_admin::{
    app, builtin, ensure_database_exists, ensure_tables, load_from_path, resolve, AdminGuard, AppState, Catalog,
    ConfigError, Dispatcher, FrontEnd, MemoryStore, PgStore, Policy, RecordStore, SessionStore, Settings, StoreKind,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("wcs_admin=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let config = match &settings.resources_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading resource declaration");
            load_from_path(path).await?
        }
        None => builtin()?,
    };
    let descriptors = resolve(&config)?;

    let store: Arc<dyn RecordStore> = match settings.store {
        StoreKind::Postgres => {
            let url = settings.database_url.as_deref().ok_or(ConfigError::Setting {
                key: "DATABASE_URL",
                message: "required when STORE=postgres".into(),
            })?;
            ensure_database_exists(url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.db_max_connections)
                .connect(url)
                .await?;
            if settings.auto_create_tables {
                ensure_tables(&pool, &settings.db_schema, &descriptors).await?;
            }
            Arc::new(PgStore::new(pool, settings.db_schema.clone()))
        }
        StoreKind::Memory => {
            tracing::warn!("using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let catalog = Catalog::build(descriptors)?;
    tracing::info!(resources = catalog.len(), "catalog built");

    let sessions = SessionStore::new(settings.session_ttl);
    let mut state = AppState::new(catalog, store).with_sessions(sessions.clone());
    if settings.admin_guard {
        state = state.with_policy(Policy::with_validator(Arc::new(AdminGuard::new(sessions))));
    }
    let notifier: Arc<dyn Notifier> = match settings.mailgun.clone() {
        Some(mailgun) => Arc::new(MailgunNotifier::new(mailgun, settings.feedback_email.clone())?),
        None => {
            tracing::info!("mail not configured; contact messages are logged");
            Arc::new(LogNotifier)
        }
    };
    state = state.with_notifier(notifier);

    let router = match settings.front_end {
        FrontEnd::Router => app(state, &settings.api_prefix, &settings.cors_origin)?,
        FrontEnd::Dispatcher => Dispatcher::new(state, &settings.api_prefix)
            .into_router()
            .layer(TraceLayer::new_for_http()),
    };

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        prefix = %settings.api_prefix,
        front_end = ?settings.front_end,
        "listening"
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!(error = %e, "unable to listen for Ctrl+C");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to listen for SIGTERM");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
