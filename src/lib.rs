//! Turnstile - Fixed-Window Request Admission Control
//!
//! This crate implements a fixed-window rate limiter together with the HTTP
//! ingress surface that consumes it. Admission decisions are made per client
//! key against a single process-global window; the middleware answers
//! rejected requests with `429 Too Many Requests` and a retry hint.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
