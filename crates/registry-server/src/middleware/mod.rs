//! Cross-cutting request middleware: bearer-token auth and the
//! idempotency-key cache.

pub mod auth;
pub mod idempotency;
