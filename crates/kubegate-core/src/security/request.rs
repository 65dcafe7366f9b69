//! Structured operation requests built from raw tool arguments.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{GuardError, GuardResult};

/// Operations that change cluster state.
pub const PRIVILEGED_OPERATIONS: &[&str] = &[
    "create",
    "apply",
    "patch",
    "delete",
    "scale",
    "helm-install",
    "helm-upgrade",
    "helm-uninstall",
];

/// Keys whose mere presence declares the verb, checked in this order.
const VERB_KEYS: &[&str] = &["delete", "create", "apply", "patch", "scale"];

pub fn is_destructive_operation(operation: &str) -> bool {
    let op = operation.to_lowercase();
    PRIVILEGED_OPERATIONS.contains(&op.as_str())
}

pub fn is_read_only_operation(operation: &str) -> bool {
    !is_destructive_operation(operation)
}

/// Raw tool arguments as received from the tool-calling protocol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Build from a JSON value; anything other than an object yields no arguments.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value for `key`, or `None` when absent or not a string.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// First non-empty string among `keys`.
    pub fn first_non_empty(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.str(k))
            .find(|v| !v.is_empty())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// String value for `key`; a present key holding a non-string is rejected.
    fn typed_str(&self, key: &str) -> GuardResult<Option<&str>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(GuardError::InvalidRequest(format!(
                "argument '{}' must be a string",
                key
            ))),
        }
    }
}

impl From<Value> for ToolArguments {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

/// One operation against one resource, as seen by the policy gates.
///
/// `operation` is lower-cased on construction. An empty `namespace` means
/// "unspecified", never "all namespaces".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationRequest {
    pub operation: String,
    pub resource: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(skip)]
    pub metadata: ToolArguments,
}

impl OperationRequest {
    pub fn new(operation: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            operation: operation.into().to_lowercase(),
            resource: resource.into(),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Extract the request from tool arguments.
    ///
    /// Keys: `operation`; `resource` then `resourceType`; `namespace`; `name`;
    /// `kubeContext` then `context`. When no operation is given it is inferred
    /// from the remaining arguments.
    pub fn from_arguments(args: &ToolArguments) -> GuardResult<Self> {
        let operation = args.typed_str("operation")?.unwrap_or_default();
        let resource = match args.typed_str("resource")? {
            Some(r) => r,
            None => args.typed_str("resourceType")?.unwrap_or_default(),
        };
        let namespace = args.typed_str("namespace")?.unwrap_or_default();
        let name = args.typed_str("name")?.unwrap_or_default();
        let context = match args.typed_str("kubeContext")? {
            Some(c) => c,
            None => args.typed_str("context")?.unwrap_or_default(),
        };

        let operation = if operation.is_empty() {
            infer_operation(args)
        } else {
            operation.to_lowercase()
        };

        Ok(Self {
            operation,
            resource: resource.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            context: context.to_string(),
            metadata: args.clone(),
        })
    }
}

fn infer_operation(args: &ToolArguments) -> String {
    if let Some(verb) = VERB_KEYS.iter().find(|k| args.contains(k)) {
        return (*verb).to_string();
    }

    if let Some(action) = args.str("helmAction") {
        return format!("helm-{}", action.to_lowercase());
    }

    if args.contains("logs") || args.contains("follow") {
        return "logs".to_string();
    }

    if args.contains("command") {
        return "exec".to_string();
    }

    match args.str("name") {
        Some(name) if !name.is_empty() => "get".to_string(),
        _ => "list".to_string(),
    }
}
