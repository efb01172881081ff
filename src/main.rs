// src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use lodge_backend::{
    config::{AppState, Settings},
    routes,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env().context("Failed to load configuration")?;
    let bind_addr = settings.bind_addr.clone();
    let seed_admin = settings.seed_admin.clone();

    let app_state = AppState::new(settings)
        .await
        .context("Failed to initialize application state")?;

    if let Some((email, password)) = seed_admin {
        app_state
            .auth_service
            .seed_super_admin(&email, &password)
            .await
            .context("Failed to seed the super admin")?;
    }

    let app = routes::router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("🚀 Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
