use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use feed_filter::{router, AppState, BasicAuth};

/// Filtering proxy for RSS/Atom/JSON feeds.
#[derive(Parser, Debug)]
#[command(name = "feed-filter")]
#[command(version, about, long_about = None)]
struct Cli {
    /// The local address the server listens on, in the form <address>:<port>
    #[arg(short, long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    address: String,

    /// User part for basic HTTP authentication of the endpoint
    #[arg(short = 'u', long, env = "AUTH_USER", default_value = "")]
    auth_user: String,

    /// Secret part for basic HTTP authentication of the endpoint
    #[arg(
        short = 'p',
        long,
        env = "AUTH_PASSWORD",
        default_value = "",
        hide_env_values = true
    )]
    auth_password: String,

    /// Disable authentication
    #[arg(long, env = "DISABLE_AUTH")]
    disable_auth: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.auth_password.is_empty() && !cli.disable_auth {
        error!("you MUST provide a password (or disable authentication)");
        return ExitCode::FAILURE;
    }

    let auth = if cli.disable_auth {
        None
    } else {
        Some(BasicAuth {
            user: cli.auth_user,
            password: cli.auth_password,
        })
    };

    let listener = match tokio::net::TcpListener::bind(&cli.address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, address = %cli.address, "can't bind listen address");
            return ExitCode::FAILURE;
        }
    };

    info!(address = %cli.address, "listening");
    let app = router(AppState::new(auth));
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("signal received, shutting down");
}
