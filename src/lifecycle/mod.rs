//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → metrics exporter → open store → load topology
//!     → start proxy instances → bind admin listener
//!
//! Shutdown:
//!     signals.rs (SIGTERM/SIGINT) → admin server drains
//!     → registry closes every proxy instance → exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: store open and initial load failures are fatal
//! - Proxies start before the admin listener accepts commands

pub mod signals;
pub mod startup;

pub use signals::shutdown_signal;
pub use startup::{bootstrap, Application};
