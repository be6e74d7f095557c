//! aproxy: a multi-tenant HTTP reverse-proxy manager.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!   Admin client           │                    MANAGER                        │
//!   ───────────────────────┼─▶ admin (REST) ──▶ registry ──▶ store (LMDB)     │
//!                          │                       │                          │
//!                          │                       ▼ start / mutate / close   │
//!                          │   ┌──────────────────────────────────────────┐   │
//!   Client request         │   │ proxy instance (own thread + runtime)    │   │
//!   ───────────────────────┼──▶│  routing::table ─▶ load_balancer::pool   │───┼──▶ Peer
//!   ◀──────────────────────┼───│  dispatch (streamed relay)               │◀──┼───
//!                          │   └──────────────────────────────────────────┘   │
//!                          │  config · observability · lifecycle              │
//!                          └──────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod proxy;
pub mod registry;
pub mod routing;
pub mod store;
pub mod topology;

// Traffic management
pub mod load_balancer;

// Management surface
pub mod admin;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use error::{RegistryError, StartupError};
pub use proxy::ProxyInstance;
pub use registry::ProxyRegistry;
pub use store::ConfigStore;
