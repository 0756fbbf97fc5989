//! Purpose: Library crate backing the `ykbridge` binary and tests.
//! Exports: `core` (capability tree, dispatch, wire, errors), `transport`,
//! `relay`, `events`.
//! Role: Lets an embedding bot run the bridge against its own capability tree.
//! Invariants: The engine never owns or mutates the capability tree it serves.
pub mod core;
pub mod events;
pub mod relay;
pub mod transport;
