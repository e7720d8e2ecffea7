// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, database and notifiers, then start HTTP server

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod services;

use actix_web::{middleware::Logger, web, App, HttpServer};
use config::Config;
use dotenv::dotenv;
use services::rate_limit::start_cleanup_task;
use services::{Notifiers, SmsRateLimiter};
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if !config.log_level.is_empty() {
            &config.log_level
        } else {
            "info,actix_web=info,sqlx=warn"
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    log::info!("Starting village service...");
    log::info!("Environment: {}", config.environment);
    log::info!(
        "Server Address: {}:{}",
        config.server_address,
        config.server_port
    );

    // 4. Initialize database connection pool
    let pool = match config::init_db_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    // 5. Outbound push, SMS and email
    let notifiers = match Notifiers::from_config(&config) {
        Ok(notifiers) => web::Data::new(notifiers),
        Err(e) => {
            log::error!("Failed to configure notifications: {:#}", e);
            std::process::exit(1);
        }
    };

    // 6. Per-sender throttle on the SMS webhook, swept every 5 minutes
    let limiter = Arc::new(SmsRateLimiter::new(config.sms_rate_per_minute));
    start_cleanup_task(limiter.clone(), 300);
    log::info!(
        "SMS webhook limited to {} texts per minute per sender",
        config.sms_rate_per_minute
    );

    // 7. Start HTTP server
    let server_addr = format!("{}:{}", config.server_address, config.server_port);
    let config_clone = config.clone();

    HttpServer::new(move || {
        App::new()
            // Application state
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config_clone.clone()))
            .app_data(notifiers.clone())
            .app_data(web::Data::new(limiter.clone()))
            // Middleware
            .wrap(Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            // Routes
            .configure(handlers::health_config)
            .configure(handlers::village_config)
            .configure(handlers::groups_config)
            .configure(handlers::profile_config)
            .configure(handlers::pusher_config)
            .configure(handlers::sms_config)
    })
    .bind(&server_addr)?
    .run()
    .await
}
