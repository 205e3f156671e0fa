//! Mutating admission webhook that sizes pod resources from observed usage

pub mod api;
pub mod config;
pub mod tls;
