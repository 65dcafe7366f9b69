pub mod context;
pub mod sensitive_headers;

pub use context::{Canceller, RequestContext, TraceContext};
pub use sensitive_headers::{
    build_downstream_headers, is_sensitive, strip_sensitive_headers, SENSITIVE_HEADER_NAMES,
};
