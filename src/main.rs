mod config;
mod dao;
mod db;
mod entities;
mod error;
mod models;
mod routes;
mod service;

use std::sync::Arc;

use crate::{config::Config, dao::SeaOrmFilmStore, service::FilmService};

pub struct AppState {
    pub films: FilmService<SeaOrmFilmStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,filmtrack=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let store = Arc::new(SeaOrmFilmStore::new(db));
    let state = Arc::new(AppState { films: FilmService::new(store) });

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
