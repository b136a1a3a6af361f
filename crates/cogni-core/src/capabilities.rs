//! Capability metadata for knowledge stores
//!
//! Remote stores differ in which optional operations they implement. Instead
//! of probing for missing endpoints at call time, a store advertises its
//! capabilities up front and callers negotiate against that list.

use serde::{Deserialize, Serialize};

/// An optional operation a knowledge store may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreCapability {
    Ingest,
    Search,
    Stats,
    Delete,
}

/// Metadata describing a store implementation.
#[derive(Debug, Clone)]
pub struct StoreMetadata {
    pub name: String,
    pub capabilities: Vec<StoreCapability>,
}

impl StoreMetadata {
    pub fn new(name: impl Into<String>, capabilities: Vec<StoreCapability>) -> Self {
        Self {
            name: name.into(),
            capabilities,
        }
    }

    pub fn supports(&self, capability: StoreCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}
