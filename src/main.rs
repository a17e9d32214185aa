use dotenvy::dotenv;
use formmail::app::{self, features::dispatch::Dispatcher};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (silently ignore if missing)
    dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug,tower_http=debug", env!("CARGO_PKG_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config from environment
    let mut config = app::config::Config::from_env().unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {}", e);
        std::process::exit(1);
    });

    // First positional argument overrides the endpoint
    if let Some(endpoint) = std::env::args().nth(1).filter(|a| !a.trim().is_empty()) {
        config.endpoint = endpoint;
    }

    // Build the mail adapter from config
    let mail = app::mail::from_config(&config).unwrap_or_else(|e| {
        tracing::error!("Failed to initialize mail adapter: {}", e);
        std::process::exit(1);
    });

    let dispatcher = Dispatcher::from_config(&config, mail).unwrap_or_else(|e| {
        tracing::error!("Failed to initialize dispatcher: {}", e);
        std::process::exit(1);
    });

    let router = formmail::create_router(app::AppState::new(dispatcher));

    // Start the server
    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind to {}: {}", config.bind_addr, e);
            std::process::exit(1);
        });

    tracing::info!(endpoint = %config.endpoint, "Listening on http://{}", config.bind_addr);

    if let Err(e) = axum::serve(listener, router).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
