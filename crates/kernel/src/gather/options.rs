//! Policies for a gathering pass.

use serde::{Deserialize, Serialize};

/// How providers with an unmet prerequisite are reported.
///
/// Both policies skip the provider; they differ in how loudly a skip whose
/// prerequisite was never established (its provider failed or is missing)
/// is surfaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrerequisitePolicy {
    /// Log every skip at debug level.
    #[default]
    Lenient,
    /// Log skips caused by a failed dependency as warnings and count them.
    Strict,
}

/// What a pass does when a storage write fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageErrorPolicy {
    /// Keep evaluating; failures are collected in the report.
    #[default]
    Continue,
    /// Stop the pass at the first failed write.
    Abort,
}

/// Options for a gathering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatherOptions {
    pub prerequisites: PrerequisitePolicy,
    pub storage_errors: StorageErrorPolicy,
}

impl GatherOptions {
    pub fn strict(mut self) -> Self {
        self.prerequisites = PrerequisitePolicy::Strict;
        self
    }

    pub fn abort_on_storage_error(mut self) -> Self {
        self.storage_errors = StorageErrorPolicy::Abort;
        self
    }
}

impl std::str::FromStr for PrerequisitePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown prerequisite policy '{other}'")),
        }
    }
}

impl std::str::FromStr for StorageErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown storage error policy '{other}'")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lenient_and_continue() {
        let options = GatherOptions::default();
        assert_eq!(options.prerequisites, PrerequisitePolicy::Lenient);
        assert_eq!(options.storage_errors, StorageErrorPolicy::Continue);
    }

    #[test]
    fn policies_parse_case_insensitively() {
        assert_eq!("Strict".parse::<PrerequisitePolicy>().unwrap(), PrerequisitePolicy::Strict);
        assert_eq!(" abort ".parse::<StorageErrorPolicy>().unwrap(), StorageErrorPolicy::Abort);
        assert!("sometimes".parse::<StorageErrorPolicy>().is_err());
    }
}
