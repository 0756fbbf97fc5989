// Core dispatch engine: capability tree, path resolution, outcomes, errors.
pub mod capability;
pub mod dispatch;
pub mod error;
pub mod path;
pub mod wire;
