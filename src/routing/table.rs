//! Location table of a proxy instance.
//!
//! # Responsibilities
//! - Keep locations sorted ascending by `order`
//! - Rewrite request paths with the first matching location
//!
//! # Design Decisions
//! - `src` is the insertion key; deletion needs the exact `(src, dst)` pair
//! - Ties on `order` keep insertion order (stable sort)

use std::sync::{PoisonError, RwLock};

use crate::topology::Location;

/// Sorted, lock-protected list of path-prefix rewrite rules.
#[derive(Debug, Default)]
pub struct LocationTable {
    locations: RwLock<Vec<Location>>,
}

impl LocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_locations(locations: &[Location]) -> Self {
        let table = Self::new();
        for location in locations {
            table.add(location.clone());
        }
        table
    }

    /// Insert a location. Returns `false` (and changes nothing) when `src` is
    /// already present.
    pub fn add(&self, location: Location) -> bool {
        let mut locations = self.locations.write().unwrap_or_else(PoisonError::into_inner);
        if locations.iter().any(|l| l.src == location.src) {
            return false;
        }
        locations.push(location);
        locations.sort_by_key(|l| l.order);
        true
    }

    /// Remove the location matching both `src` and `dst`.
    pub fn remove(&self, src: &str, dst: &str) -> bool {
        let mut locations = self.locations.write().unwrap_or_else(PoisonError::into_inner);
        match locations.iter().position(|l| l.src == src && l.dst == dst) {
            Some(index) => {
                locations.remove(index);
                true
            }
            None => false,
        }
    }

    /// Rewrite `path` with the first matching location.
    pub fn rewrite(&self, path: &str) -> Option<String> {
        let locations = self.locations.read().unwrap_or_else(PoisonError::into_inner);
        locations
            .iter()
            .find(|l| path.starts_with(l.src.as_str()))
            .map(|l| {
                let mut rewritten = String::with_capacity(l.dst.len() + path.len() - l.src.len());
                rewritten.push_str(&l.dst);
                rewritten.push_str(&path[l.src.len()..]);
                rewritten
            })
    }

    pub fn snapshot(&self) -> Vec<Location> {
        self.locations.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.locations.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
