//! Sandbox store backend for the purchase bridge.
//!
//! Implements the payment queue, product catalog and receipt source traits
//! from `iap-store` entirely in-process. Notifications are delivered on
//! spawned tokio tasks after a configurable delay, so callers see the same
//! off-stack, batched, at-least-once behaviour a platform queue has.

pub mod config;
pub mod error;
pub mod store;

pub use config::{SandboxConfig, SandboxOutcome, SandboxProduct};
pub use error::SandboxError;
pub use store::SandboxStore;
