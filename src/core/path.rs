//! Purpose: Resolve dot-separated paths against a capability tree.
//! Exports: `resolve`, `resolve_segments`.
//! Role: Pure lookup; absence is a normal outcome, never an error.
//! Invariants: Resolution is a pure function of tree + path.
//! Invariants: Walking past a method or leaf yields `None`, not a fault.

use crate::core::capability::Capability;

/// Walk `path` attribute-by-attribute from `root`. Any missing segment, or a
/// segment read off a non-container node, resolves the whole path to `None`.
pub fn resolve<'a>(root: &'a Capability, path: &str) -> Option<&'a Capability> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.child(segment)?;
    }
    Some(current)
}

/// Segment-slice variant used by the dispatcher. An empty slice resolves to
/// the root itself so top-level members stay invocable.
pub fn resolve_segments<'a>(root: &'a Capability, segments: &[&str]) -> Option<&'a Capability> {
    let mut current = root;
    for segment in segments {
        current = current.child(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::{resolve, resolve_segments};
    use crate::core::capability::Capability;
    use serde_json::{Value, json};
    use std::future::ready;

    fn tree() -> Capability {
        Capability::object([
            (
                "math",
                Capability::object([
                    ("add", Capability::method(|_args| ready(Ok(Value::Null)))),
                    ("pi", Capability::value(json!(3.14))),
                ]),
            ),
            ("flag", Capability::value(json!(true))),
        ])
    }

    #[test]
    fn resolves_nested_members() {
        let root = tree();
        assert!(resolve(&root, "math").is_some());
        assert!(resolve(&root, "math.add").is_some());
        assert!(resolve(&root, "math.pi").is_some());
    }

    #[test]
    fn missing_segments_resolve_to_none() {
        let root = tree();
        assert!(resolve(&root, "nope").is_none());
        assert!(resolve(&root, "math.nope").is_none());
        assert!(resolve(&root, "nope.deeper.still").is_none());
    }

    #[test]
    fn walking_past_a_leaf_or_method_is_none() {
        let root = tree();
        assert!(resolve(&root, "flag.anything").is_none());
        assert!(resolve(&root, "math.add.anything").is_none());
    }

    #[test]
    fn empty_segment_slice_is_the_root() {
        let root = tree();
        let resolved = resolve_segments(&root, &[]).expect("root");
        assert!(resolved.is_object());
    }

    #[test]
    fn empty_path_string_reads_an_empty_attribute() {
        // "".split('.') yields one empty segment, so an empty path string is
        // an attribute lookup, not the root.
        let root = tree();
        assert!(resolve(&root, "").is_none());
    }

    #[test]
    fn resolution_is_idempotent() {
        let root = tree();
        let first = resolve(&root, "math.add").expect("first") as *const _;
        let second = resolve(&root, "math.add").expect("second") as *const _;
        assert_eq!(first, second);
    }
}
