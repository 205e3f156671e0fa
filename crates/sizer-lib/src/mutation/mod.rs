//! Mutation decision logic
//!
//! Decides whether a pod opted in and rewrites its containers' CPU and
//! memory requests/limits from a workload's resource allocation.

pub mod annotation;
pub mod quantity;
pub mod rewrite;

pub use annotation::{parse_bool, AnnotationGate, GateDecision, DEFAULT_ANNOTATION};
pub use quantity::{round_up, Resource};
pub use rewrite::{rewrite_containers, RewriteSummary};
