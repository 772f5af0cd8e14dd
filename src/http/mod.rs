//! HTTP ingress for the admission controller.

mod handlers;
mod middleware;
mod server;

pub use handlers::{ErrorResponse, HealthResponse};
pub use middleware::rate_limit;
pub use server::{AppState, HttpServer};
