//! Tool invocation audit records and their sinks.

pub mod cardinality;
mod invocation;
mod sink;

pub use cardinality::{classify_cluster_name, extract_user_domain, ClusterType};
pub use invocation::ToolInvocation;
pub use sink::{AuditSink, FileAuditSink, NullAuditSink, TracingAuditSink};
