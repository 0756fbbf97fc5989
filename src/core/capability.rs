//! Purpose: Model the externally-owned object graph remote callers invoke into.
//! Exports: `Capability`, `MethodHandler`, `MethodFuture`, `CallError`.
//! Role: Uniform node type over containers, invocable members, and leaf values.
//! Invariants: The engine only reads the tree; mutation stays with the owner.
//! Invariants: Method handlers own their receiver state at construction time.

use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

pub type MethodFuture = Pin<Box<dyn Future<Output = Result<Value, CallError>> + Send>>;

/// Application-level failure raised by an invoked member: a human-readable
/// message plus an optional string-or-number classifier code.
#[derive(Clone, Debug, PartialEq)]
pub struct CallError {
    message: String,
    code: Option<Value>,
}

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<Value>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&Value> {
        self.code.as_ref()
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for CallError {}

pub struct MethodHandler {
    handler: Box<dyn Fn(Vec<Value>) -> MethodFuture + Send + Sync>,
}

impl MethodHandler {
    pub fn invoke(&self, args: Vec<Value>) -> MethodFuture {
        (self.handler)(args)
    }
}

impl fmt::Debug for MethodHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MethodHandler")
    }
}

/// One node of the capability tree. Containers hold named children, methods
/// are invocable with positional JSON arguments, and leaves are plain values.
#[derive(Debug)]
pub enum Capability {
    Object(BTreeMap<String, Capability>),
    Method(MethodHandler),
    Value(Value),
}

impl Capability {
    pub fn object<K, I>(children: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Capability)>,
    {
        Self::Object(
            children
                .into_iter()
                .map(|(name, child)| (name.into(), child))
                .collect(),
        )
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn method<F, Fut>(handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, CallError>> + Send + 'static,
    {
        Self::Method(MethodHandler {
            handler: Box::new(move |args| -> MethodFuture { Box::pin(handler(args)) }),
        })
    }

    /// Named child of a container node; `None` for methods and leaves.
    pub fn child(&self, name: &str) -> Option<&Capability> {
        match self {
            Capability::Object(children) => children.get(name),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Capability::Object(_))
    }

    pub fn as_method(&self) -> Option<&MethodHandler> {
        match self {
            Capability::Method(handler) => Some(handler),
            _ => None,
        }
    }
}
