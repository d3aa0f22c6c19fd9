use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use content_hub::{
    application::error::AppError,
    cache::{CacheConfig, CacheHandles},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiRateLimiter, ApiState, HealthState, RouterState},
        telemetry,
    },
};
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const RATE_LIMIT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let cache = CacheHandles::connect(CacheConfig::from(&settings.cache))
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "content_hub::startup",
        backend = cache.store.backend_name(),
        enabled = settings.cache.enabled,
        "cache ready"
    );

    let rate_limiter = Arc::new(ApiRateLimiter::new(
        settings.rate_limit.window(),
        settings.rate_limit.max_requests.get(),
    ));
    spawn_rate_limit_janitor(rate_limiter.clone());

    let api = ApiState::from_repositories(
        repositories.clone(),
        &cache,
        rate_limiter,
        settings.pagination,
    );
    let health = HealthState {
        storage: repositories,
        cache: cache.store.clone(),
    };

    serve_http(&settings, RouterState { api, health }).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;
    info!(target = "content_hub::migrate", "migrations applied");
    Ok(())
}

async fn connect_pool(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::missing("database.url"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = connect_pool(settings).await?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn spawn_rate_limit_janitor(limiter: Arc<ApiRateLimiter>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RATE_LIMIT_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            limiter.purge_idle();
        }
    });
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::bind(settings.server.addr, err)))?;
    info!(
        target = "content_hub::startup",
        addr = %settings.server.addr,
        "listening"
    );

    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "content_hub::shutdown",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!(target = "content_hub::shutdown", "shutdown signal received");
}
