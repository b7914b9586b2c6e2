use std::{sync::Arc, time::Duration};

use actix_cors::Cors;
use actix_web::{http::header, middleware::NormalizePath, web, App, HttpServer};
use anyhow::Context;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use childcare_backend::{
    auth::jwt::JwtIdentityProvider,
    background_task::start_deletion_sweeper,
    constants::START_TIME,
    db::postgres::{create_pool, run_migrations},
    email::sendgrid::{LogEmailService, SendGridEmailService},
    graceful_shutdown::shutdown_signal,
    middlewares::auth::AuthMiddleware,
    repositories::email::EmailService,
    routes::{configure_routes, multipart_config},
    settings::{AppConfig, StorageBackend},
    shared_repos::SharedRepositories,
    AppState,
};

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_cors(config: &AppConfig) -> Cors {
    let origins = config.cors_origins();
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        cors.allow_any_origin()
    } else {
        origins.iter().fold(cors, |cors, origin| cors.allowed_origin(origin))
    }
}

fn build_email_service(config: &AppConfig) -> Arc<dyn EmailService> {
    match config.sendgrid_api_key.as_deref() {
        Some(key) => Arc::new(SendGridEmailService::new(config, key)),
        None => {
            tracing::warn!("No SendGrid API key configured; invite emails will only be logged");
            Arc::new(LogEmailService)
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::new().context("Failed to load configuration")?;
    init_tracing(&config);
    tracing::info!("Loaded configuration: {:?}", config);

    let pool = match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database_url)
                .await
                .context("Failed to create database connection pool")?;
            run_migrations(&pool).await.context("Failed to run database migrations")?;
            Some(pool)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            None
        }
    };

    let repos = SharedRepositories::from_config(&config, pool)
        .await
        .context("Failed to initialise storage backends")?;
    let identity = Arc::new(JwtIdentityProvider::new(&config));
    let email = build_email_service(&config);

    let app_state = web::Data::new(AppState::new(&config, repos, identity, email));

    match app_state.invitation_handler.sync_admin_claims().await {
        Ok(count) => tracing::info!("Synced admin claims for {} users", count),
        Err(e) => tracing::error!("Admin claim sync failed: {}", e),
    }

    let server_addr = format!("{}:{}", config.host, config.port);

    tracing::info!(
        "Starting {} v{} on {} (process started {})",
        config.name,
        env!("CARGO_PKG_VERSION"),
        server_addr,
        *START_TIME
    );

    let sweeper = tokio::spawn(start_deletion_sweeper(
        app_state.deletion.clone(),
        Duration::from_secs(config.deletion_sweep_interval_secs),
    ));

    let server_config = config.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(multipart_config(server_config.max_upload_bytes))
            .wrap(AuthMiddleware)
            .wrap(NormalizePath::trim())
            .wrap(build_cors(&server_config))
            .wrap(TracingLogger::default())
            .configure(configure_routes)
    })
    .workers(config.worker_count)
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {}", server_addr))?
    .run();

    let result = tokio::select! {
        res = server => res.context("Server error"),
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
            Ok(())
        }
    };

    sweeper.abort();
    result
}
