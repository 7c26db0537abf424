//! Gateway: the HTTP surface of the conversion pipeline.
//!
//! - `POST /api/convert` runs one job and returns the retrieval path
//! - `GET /downloads/{filename}` streams an artifact, then deletes it after a
//!   grace period
//! - `GET /health`

pub mod artifact_routes;
pub mod convert_routes;
pub mod error;
pub mod server;
pub mod state;

pub use {
    error::{ApiError, ConvertResponse},
    server::{AppState, build_gateway_app, start_gateway},
    state::GatewayState,
};
