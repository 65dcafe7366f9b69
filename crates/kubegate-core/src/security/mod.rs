pub mod authorizer;
pub mod credentials;
pub mod error;
pub mod request;
pub mod validator;

pub use authorizer::{Authorize, Authorizer, PolicyAuthorizer, PolicyConfig, READ_ONLY_OPERATIONS};
pub use credentials::{
    default_kubeconfig_path, is_sensitive_header, redact_sensitive_config, CredentialConfig,
    CredentialManager, ImpersonationConfig, OutboundRequest, OutboundResponse, RestConfig,
    RoundTripper, SecureTransport, TlsClientConfig, TransportWrapper, REDACTED,
    SENSITIVE_HEADER_NAMES,
};
pub use error::{SecurityError, SecurityErrorKind};
pub use request::{
    is_destructive_operation, is_read_only_operation, OperationRequest, ToolArguments,
    PRIVILEGED_OPERATIONS,
};
pub use validator::{ValidationRules, Validator, NAMESPACED_RESOURCES};
