//! sqlgate server binary.
//!
//! Runs the MCP database gateway in one of two modes:
//!
//! - stdio (default): line-delimited JSON-RPC on stdin/stdout with a
//!   single implicit session, for local MCP clients.
//! - HTTP (`--http`): streaming sessions on `/sse`, messages on
//!   `/messages`, liveness on `/health`.

use anyhow::Context;
use clap::Parser;
use sqlgate_adapter_pg::PoolRouter;
use sqlgate_core::config::{GatewayConfig, Transport};
use sqlgate_core::permissions::Grant;
use sqlgate_mcp::transport::{HttpServer, TransportState};
use sqlgate_mcp::{McpServer, RoutingContext, SessionRegistry};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "sqlgate", version, about = "MCP gateway for remote Postgres databases")]
struct Cli {
    /// Default target database URL. The DATABASE_URL environment variable
    /// takes precedence when both are set.
    database_url: Option<String>,

    /// Serve HTTP/SSE instead of stdio.
    #[arg(long, env = "SQLGATE_HTTP")]
    http: bool,

    /// HTTP bind host.
    #[arg(long, env = "SQLGATE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// HTTP port.
    #[arg(long, env = "SQLGATE_PORT", default_value_t = 3000)]
    port: u16,

    /// Shared secret required to establish streaming sessions.
    #[arg(long, env = "SQLGATE_SECRET")]
    secret: Option<String>,

    /// Permission grant for the stdio session, e.g. "read,dml".
    /// Sessions over HTTP carry their own grant.
    #[arg(long, env = "SQLGATE_PERMISSIONS")]
    permissions: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let default_database_url = std::env::var("DATABASE_URL").ok().or(cli.database_url);

    let config = GatewayConfig {
        transport: if cli.http {
            Transport::Http
        } else {
            Transport::Stdio
        },
        host: cli.host,
        port: cli.port,
        secret: cli.secret,
        default_database_url,
    };

    let router = Arc::new(PoolRouter::default());
    let server = McpServer::new(router.clone());

    if config.is_http() {
        if !config.secret_required() {
            tracing::warn!("no secret configured; session establishment will be refused");
        }
        let state = TransportState {
            config,
            registry: Arc::new(SessionRegistry::new()),
            server,
            router,
        };
        HttpServer::new(state).run().await?;
        return Ok(());
    }

    let database_url = config
        .default_database_url
        .clone()
        .context("no database target: pass a database URL or set DATABASE_URL")?;
    let grant = match &cli.permissions {
        Some(raw) => Grant::parse(raw)?,
        None => Grant::default(),
    };

    server
        .run_stdio(RoutingContext::new(database_url, grant))
        .await?;
    Ok(())
}
