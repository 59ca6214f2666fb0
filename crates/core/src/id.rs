//! Strongly-typed job identifier.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Opaque identifier of a transform job.
///
/// The key is the only handle a client ever holds: the blob paths, the
/// webhook address, and the delayed purge are all derived from it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(Uuid);

impl JobKey {
    /// Generate a fresh key.
    ///
    /// Uses UUIDv7 (time-ordered, 74 random bits): collision-resistant
    /// across the deployment lifetime without any coordination. Prefer
    /// passing keys explicitly in tests for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobKey {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for JobKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for JobKey {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<JobKey> for Uuid {
    fn from(value: JobKey) -> Self {
        value.0
    }
}

impl FromStr for JobKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| DomainError::invalid_id(format!("JobKey: {}", e)))?;
        Ok(Self(uuid))
    }
}
