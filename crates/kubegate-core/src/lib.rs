//! Policy, credential and audit primitives for the kubegate tool server.
//!
//! Every tool invocation that reaches a Kubernetes cluster goes through the
//! pieces in this crate:
//!
//! - [`security::Authorizer`] and [`security::Validator`] gate the declared operation
//! - [`security::CredentialManager`] validates kubeconfig paths and contexts and
//!   hardens transport configuration
//! - [`federation`] describes the multi-cluster collaborator and its error kinds
//! - [`audit`] records one immutable [`audit::ToolInvocation`] per call
//!
//! # Quick Start
//!
//! ```
//! use kubegate_core::security::{
//!     Authorizer, OperationRequest, PolicyConfig, ValidationRules, Validator,
//! };
//!
//! # fn example() -> Result<(), kubegate_core::GuardError> {
//! let authorizer = Authorizer::policy(PolicyConfig::default());
//! let validator = Validator::new(authorizer, None, ValidationRules::default())?;
//!
//! let request = OperationRequest::new("get", "pods").with_namespace("default");
//! validator.validate_operation(&request)?;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod errors;
pub mod federation;
pub mod identity;
pub mod kube;
pub mod security;

pub use errors::{ErrorKind, GuardError, GuardResult};
pub use identity::Identity;
