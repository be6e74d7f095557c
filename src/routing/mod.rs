//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → table.rs (scan locations ascending by `order`)
//!     → first `src` that is a byte-wise prefix of the path wins
//!     → Return: dst + remainder, or NoMatch
//!
//! Location Mutation (admin API, any time):
//!     add: skip if src present, push, stable re-sort
//!     del: exact (src, dst) match only
//! ```
//!
//! # Design Decisions
//! - Order-first, not longest-prefix
//! - Prefix matching only, case-sensitive
//! - Table lock is held only for the scan, never across I/O

pub mod table;
