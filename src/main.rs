// src/main.rs

use std::{net::SocketAddr, sync::Arc, time::Duration};

use chrono::Utc;
use placement_api::{
    config::Config,
    models::user::{College, User},
    routes,
    sandbox::PistonClient,
    services::sweeper,
    state::AppState,
    store::{PgStore, Store},
    utils::{hash::hash_password, rbac::Role},
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Upper bound for a single HTTP exchange with the sandbox, on top of the
/// compile and run timeouts it is asked to enforce itself.
const SANDBOX_HTTP_SLACK: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    // Seed College Owner
    if let Err(e) = seed_admin_user(store.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let sandbox_timeout = Duration::from_millis(
        config.execution.compile_timeout_ms + config.execution.default_timeout_ms,
    ) + SANDBOX_HTTP_SLACK;
    let sandbox = PistonClient::new(config.piston_url.clone(), sandbox_timeout)
        .expect("Failed to build the sandbox HTTP client");
    tracing::info!("Sandbox at {}", config.piston_url);

    let _sweeper = sweeper::spawn(store.clone(), config.attempt_sweep_interval_secs);

    // Create AppState
    let state = AppState {
        store,
        sandbox: Arc::new(sandbox),
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}

/// Creates the bootstrap college and its owner when configured and missing.
async fn seed_admin_user(
    store: &dyn Store,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };
    if store.find_user_by_username(username).await?.is_some() {
        return Ok(());
    }

    let slug = config
        .admin_college_slug
        .clone()
        .unwrap_or_else(|| "default".to_string());
    let college = match store.find_college_by_slug(&slug).await? {
        Some(college) => college,
        None => {
            let college = College {
                id: Uuid::new_v4(),
                name: slug.clone(),
                slug: slug.clone(),
                created_at: Utc::now(),
            };
            store.create_college(&college).await?;
            college
        }
    };

    tracing::info!("Seeding owner {} for college {}", username, college.slug);
    let user = User {
        id: Uuid::new_v4(),
        college_id: college.id,
        username: username.clone(),
        password: hash_password(password)?,
        role: Role::Owner,
        created_at: Utc::now(),
    };
    store.create_user(&user).await?;
    tracing::info!("Owner account created successfully.");
    Ok(())
}
