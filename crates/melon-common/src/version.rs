//! Schema versions for persisted farm records.

use serde::{Deserialize, Serialize};

/// Current schema version of persisted farm records.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Version assigned to bare values written before records were enveloped.
pub const LEGACY_SCHEMA_VERSION: u32 = 0;

/// How a stored record relates to the running build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionCompatibility {
    /// Written by this schema, load as-is.
    Current,
    /// Older schema, run migrations first.
    MigrationRequired,
    /// Written by a newer build, cannot be read safely.
    TooNew,
}

impl VersionCompatibility {
    /// Classifies a stored version against [`CURRENT_SCHEMA_VERSION`].
    #[must_use]
    pub const fn of(found: u32) -> Self {
        if found == CURRENT_SCHEMA_VERSION {
            Self::Current
        } else if found < CURRENT_SCHEMA_VERSION {
            Self::MigrationRequired
        } else {
            Self::TooNew
        }
    }

    /// Checks if the record can be loaded (possibly after migration).
    #[must_use]
    pub const fn is_loadable(self) -> bool {
        !matches!(self, Self::TooNew)
    }
}
