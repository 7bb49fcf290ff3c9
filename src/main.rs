mod auth;
mod config;
mod db;
mod errors;
mod filters;
mod handlers;
mod models;
mod services;
mod state;
mod utils;

use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use log::{info, warn};
use std::io;
use std::sync::Arc;

use crate::config::Config;
use crate::db::{MemoryStore, PgStore};
use crate::state::AppState;

fn startup_error<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> io::Error + '_ {
    move |err| io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

async fn build_state(config: &Config) -> io::Result<AppState> {
    match &config.database_url {
        Some(database_url) => {
            let pool = db::create_pool(database_url)
                .await
                .map_err(startup_error("Failed to connect to the database"))?;
            let store = Arc::new(PgStore::new(pool));
            store
                .init_schema()
                .await
                .map_err(startup_error("Failed to prepare the database schema"))?;
            Ok(AppState::new(config, store.clone(), store))
        }
        None => {
            warn!("DATABASE_URL is not set; records are kept in memory and lost on exit");
            let store = Arc::new(MemoryStore::new());
            Ok(AppState::new(config, store.clone(), store))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    let state = build_state(&config).await?;

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        auth::ensure_user(state.users.as_ref(), username, password)
            .await
            .map_err(startup_error("Failed to create the admin user"))?;
    }

    let state = web::Data::new(state);

    info!("Starting server at {}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(&config.bind_address)?
    .run()
    .await
}
