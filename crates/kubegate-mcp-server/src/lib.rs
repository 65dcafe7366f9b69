//! Server side of the kubegate security layer: per-call request context,
//! fail-closed credential resolution, cluster client selection, and the
//! wrappers every tool handler is registered through.

pub mod auth;
pub mod check;
pub mod config;
pub mod logging;
pub mod server;
pub mod tools;

pub use auth::RequestContext;
pub use config::ServerConfig;
pub use server::{ResolveError, ServerContext, ServerError, ServerOptions};
