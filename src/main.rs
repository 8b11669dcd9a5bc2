use chanting_tracker::{router, AppError, AppState, Config, CookieJar};
use std::{net::SocketAddr, sync::Arc};
use tokio::fs;
use tracing::{error, info};
use tracing_subscriber::{filter::Directive, fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let directive: Directive = "info".parse().map_err(AppError::internal)?;
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();

    let config = Config::from_env();
    if let Some(parent) = config.cookie_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let cookies = Arc::new(CookieJar::load(&config.cookie_path).await);
    let port = config.port;
    info!("using backend {}", config.api_url);

    let state = AppState::new(config, Arc::clone(&cookies))?;

    // Identity check runs in the background; guarded pages wait for it.
    let session = Arc::clone(&state.session);
    tokio::spawn(async move {
        let outcome = session.load().await;
        info!("startup session: {}", if outcome.is_authenticated() { "authenticated" } else { "anonymous" });
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(err) = cookies.save() {
        error!("failed to save cookies on shutdown: {err}");
    }
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
