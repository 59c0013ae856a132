use std::{process, sync::Arc};

use biblio::{
    application::error::AppError,
    cache::{MemoryStore, QueryCache},
    config,
    infra::{
        db::{SqliteRepositories, seed},
        error::InfraError,
        http, telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

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
        config::Command::Seed(args) => run_seed(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache = build_query_cache(&settings.cache);
    let state = http::ApiState::new(repositories, cache);
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.listen_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "biblio::server",
        addr = %settings.server.listen_addr,
        "Listening for catalog requests"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_seed(settings: config::Settings, args: config::SeedArgs) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    seed::run(&repositories, args.authors, args.books).await?;
    Ok(())
}

async fn init_repositories(settings: &config::Settings) -> Result<SqliteRepositories, AppError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database.url is not set"))?;

    let pool = SqliteRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(SqliteRepositories::new(pool))
}

fn build_query_cache(cache: &config::CacheSettings) -> QueryCache {
    if !cache.enabled {
        return QueryCache::disabled();
    }

    QueryCache::new(Arc::new(MemoryStore::new(cache.capacity)), cache.ttl, true)
}
