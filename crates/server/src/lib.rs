//! Place Server - HTTP REST API for the collaborative canvas
//!
//! Clients read and paint squares on a fixed-size grid. This crate exposes
//! the `place` core over HTTP:
//!
//! - **Squares**: list every square, read one by coordinate, place one
//! - **Canvas**: the whole grid as a packed byte array, plus cache repair
//! - **Health & Metrics**: liveness/readiness probes and Prometheus metrics
//!
//! # Features
//!
//! - **Placement gate**: validation and per-author cooldown in front of writes
//! - **Middleware**: Compression, CORS, request ID tracking, structured logging
//! - **Configuration**: `.env`, config file and environment variables
//! - **Error Handling**: `{"status": false, "code": ..., "message": ...}` bodies
//! - **Graceful Shutdown**: Proper signal handling for production deployments
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//! - `GET /squares` - All placed squares
//! - `GET /square?X=&Y=` - One square, blank if never placed
//! - `PUT /squares` - Place a square (`{x, y, color, author}`)
//! - `GET /canvas` - Packed canvas bytes
//! - `POST /canvas/rebuild` - Regenerate the canvas cache from the store

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{Backend, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
