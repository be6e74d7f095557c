//! Proxy registry.
//!
//! # Data Flow
//! ```text
//! Admin API command
//!     → manager.rs (mutation gate held for the whole call)
//!         → live phase: ProxyInstance keyed by (address, port)
//!         → persisted phase: ConfigStore load → check → save
//!     → RegistryError or success
//!
//! List
//!     → ConfigStore load
//!     → view.rs (attach AVAILABLE / UNAVAILABLE from live instances)
//! ```
//!
//! # Design Decisions
//! - Live and persisted phases are separate critical sections; a persisted
//!   rejection does not roll back the live change
//! - Mutations are serialized registry-wide; listing and dispatch are not
//! - Persisted entries are addressed by (id, address, port), live ones by (address, port)

pub mod manager;
pub mod view;

pub use manager::ProxyRegistry;
pub use view::{ProxyStatus, ProxyView};
