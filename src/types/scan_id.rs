//! Identifier handed back with every scan summary.
//!
//! A `ScanId` lets the caller (or a collaborating store) refer to one
//! specific scan without any shared "latest results" state in the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A unique identifier for a scan.
///
/// Uses UUID v4 internally for globally unique identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(Uuid);

impl ScanId {
    /// Generate a new random scan ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get a short representation (first 8 characters).
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_id_generation() {
        assert_ne!(ScanId::new(), ScanId::new());
    }

    #[test]
    fn test_scan_id_display() {
        let id = ScanId::new();
        assert_eq!(id.to_string().len(), 36);
        assert!(id.to_string().starts_with(&id.short()));
    }
}
