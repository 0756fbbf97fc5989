//! Purpose: Turn one decoded call into one normalized outcome.
//! Exports: `Outcome`, `dispatch`.
//! Role: Resolve the member path, invoke it, and fold every failure into data.
//! Invariants: Failure messages name the offending path or sub-path.
//! Invariants: Nothing escapes as a panic or error; callers always get an `Outcome`.

use serde_json::Value;

use crate::core::capability::Capability;
use crate::core::path::resolve_segments;

/// Result of one invocation attempt, prior to wire encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Success(Value),
    Failure {
        message: String,
        code: Option<Value>,
    },
}

impl Outcome {
    fn failure(message: impl Into<String>) -> Self {
        Outcome::Failure {
            message: message.into(),
            code: None,
        }
    }
}

/// Resolve `path` to an invocable member of its parent container and invoke
/// it with `args` spread positionally. The parent path (everything before the
/// final segment) must resolve to a container; the final segment must name a
/// method of it.
pub async fn dispatch(root: &Capability, path: &str, args: Vec<Value>) -> Outcome {
    let segments: Vec<&str> = path.split('.').collect();
    let (member, parent_segments) = match segments.split_last() {
        Some(split) => split,
        None => return Outcome::failure(format!("Invalid path '{path}'")),
    };
    if member.is_empty() {
        return Outcome::failure(format!("Invalid path '{path}'"));
    }

    let parent = match resolve_segments(root, parent_segments) {
        Some(parent) if parent.is_object() => parent,
        _ => {
            let parent_path = parent_segments.join(".");
            return Outcome::failure(format!(
                "Parent at path '{parent_path}' is not an object"
            ));
        }
    };

    let target = match parent.child(member).and_then(Capability::as_method) {
        Some(target) => target,
        None => {
            return Outcome::failure(format!("Target at path '{path}' is not a function"));
        }
    };

    match target.invoke(args).await {
        Ok(result) => Outcome::Success(result),
        Err(err) => Outcome::Failure {
            code: err.code().cloned(),
            message: err.message().to_string(),
        },
    }
}
