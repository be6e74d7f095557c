//! Proxy instances.
//!
//! # Data Flow
//! ```text
//! Client Request (on the instance's own listener/runtime)
//!     → dispatch.rs (accepting? → resolve → forward)
//!         → routing::table (first location by order, rewrite path)
//!         → load_balancer::pool (round-robin peer)
//!         → hyper-util client → peer
//!     → streamed peer response, or pages.rs (404 / 500 / 503)
//!     → events.rs (on_request / on_response / on_error / on_close)
//! ```
//!
//! # Design Decisions
//! - One OS thread and one tokio runtime per instance
//! - Peer pool and location table have separate locks, never nested
//! - Response bodies are relayed as they arrive, never buffered
//! - A failing peer stays in the pool

pub mod dispatch;
pub mod events;
pub mod instance;
pub mod pages;

pub use dispatch::DispatchError;
pub use events::{ProxyEvents, TracingEvents};
pub use instance::{InstanceOptions, LifecycleState, ProxyInstance, Resolution};
