//! Redactor server - HTTP chat interface to the self-correcting report editor.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "redactor-server")]
#[command(about = "HTTP interface for editing reports through conversations")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Directory holding one workspace per conversation
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Use offline canned research instead of each workspace's configured backend
    #[arg(long)]
    canned: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("redactor_server=info".parse()?),
        )
        .init();

    let args = Args::parse();

    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("create {}", args.data_dir.display()))?;
    let data_dir = args.data_dir.canonicalize().unwrap_or(args.data_dir);
    info!(data_dir = %data_dir.display(), canned = args.canned, "starting redactor-server");

    let state = AppState::new(data_dir, args.canned);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", routes::api_router())
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
