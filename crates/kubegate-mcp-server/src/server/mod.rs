mod context;
pub mod sessions;

pub use context::{ResolveError, ServerContext, ServerError, ServerOptions};
pub use sessions::{PortForwardSession, SessionError, SessionRegistry};
