//! # Roster Server
//!
//! User directory with three roles.
//!
//! - **Admins** see and manage every account
//! - **Managers** see every non-Admin account, read-only
//! - **Employees** see only themselves
//!
//! Clients authenticate with short-lived JWT access tokens obtained from
//! `/api/login/` and renewed through `/api/token/refresh/`. Accounts live in
//! PostgreSQL when `DATABASE_URL` is set and in memory otherwise.

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use clap::{Args as ClapArgs, Parser, Subcommand};
use roster_core::user_management::NewAccount;
use roster_server::{
    infra::{
        config::{Config, RegistrationRolePolicy},
        startup,
    },
    routes,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "roster-server")]
#[command(about = "Role-scoped user directory with JWT authentication")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an Admin account with staff and superuser flags, then exit
    CreateSuperuser(CreateSuperuserArgs),
}

#[derive(ClapArgs, Debug)]
struct CreateSuperuserArgs {
    #[arg(long)]
    username: String,

    #[arg(long)]
    email: Option<String>,

    #[arg(long, env = "SUPERUSER_PASSWORD", hide_env_values = true)]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(host) = cli.serve.host.clone() {
        config.server_host = host;
    }
    if let Some(port) = cli.serve.port {
        config.server_port = port;
    }

    match cli.command {
        Some(Command::CreateSuperuser(args)) => create_superuser(config, args).await,
        None => run_server(config).await,
    }
}

async fn create_superuser(config: Config, args: CreateSuperuserArgs) -> anyhow::Result<()> {
    startup::create_superuser(
        config,
        NewAccount {
            username: args.username,
            email: args.email,
            password: Some(args.password),
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    if config.dev_mode {
        warn!("DEV_MODE is enabled; built-in development secrets are accepted");
    }
    if config.registration_role_policy == RegistrationRolePolicy::CallerSupplied {
        warn!(
            policy = config.registration_role_policy.as_str(),
            "public registration may request any role, including Admin"
        );
    }

    let addr = config.bind_address();
    let cors = cors_layer(&config);
    let state = startup::build_state(config).await?;
    startup::bootstrap_superuser(&state).await?;

    let app = routes::create_app(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
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

    info!("shutdown signal received");
}
