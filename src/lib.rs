//! Chat gateway - LLM chat proxy with in-memory sessions and Google login.
//!
//! This crate provides a small web backend:
//! - Chat proxying to an external completion provider with a bounded
//!   per-session transcript window
//! - Ephemeral in-process session storage (no persistence, no eviction)
//! - Session listing, fetch, and idempotent deletion
//! - A standalone Google OAuth login flow, unrelated to chat state
//!
//! ## Architecture
//!
//! ```text
//! Client → Gateway (session store read/write) → Completion provider
//!                          ↓
//!                   Record reply
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod oauth;
pub mod provider;
pub mod routes;
pub mod session;

pub use error::{Error, Result};
pub use provider::{ChatRequest, ChatResponse, OpenAIProvider, Provider, ProviderError};
pub use session::{ChatSession, Message, SessionStore};

use axum::Router;
use config::Config;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

/// Build the gateway router with all routes and middleware.
pub fn build_router(config: &Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::build_all_routes(config).layer(cors)
}

/// Start the gateway server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    let router = build_router(config);

    tracing::info!("Starting chat gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
