//! API Module
//!
//! HTTP handlers and routing for the cache admin surface. Application code
//! talks to [`QueryCache`](crate::cache::QueryCache) directly; this surface
//! is for operators.
//!
//! # Endpoints
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health report
//! - `POST /clear` - Drop every entry
//! - `POST /invalidate_tag` - Drop entries carrying a tag
//! - `POST /invalidate_pattern` - Drop entries whose key matches a regex
//! - `POST /warm` - Pre-populate keys through registered warmers

pub mod handlers;
pub mod routes;
pub mod warmers;

pub use handlers::*;
pub use routes::create_router;
pub use warmers::{Warmer, WarmerRegistry, LITERAL_WARMER};
