//! Versioned partition naming.

use serde::{Deserialize, Serialize};

/// Logical role of a cache partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionRole {
    /// Install-time assets and cache-first sub-resources.
    Static,
    /// Navigations and stale-while-revalidate content.
    Dynamic,
    /// Deprecated general-purpose partition, only ever deleted.
    Legacy,
}

impl PartitionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionRole::Static => "static",
            PartitionRole::Dynamic => "dynamic",
            PartitionRole::Legacy => "legacy",
        }
    }
}

/// Current partition names for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    static_name: String,
    dynamic_name: String,
    legacy_name: String,
}

impl CacheNames {
    /// `{prefix}-{role}-{version}`, or `{role}-{version}` when the prefix is empty.
    pub fn new(prefix: &str, version: &str, legacy_version: &str) -> Self {
        let name = |role: PartitionRole, version: &str| {
            if prefix.is_empty() {
                format!("{}-{version}", role.as_str())
            } else {
                format!("{prefix}-{}-{version}", role.as_str())
            }
        };

        Self {
            static_name: name(PartitionRole::Static, version),
            dynamic_name: name(PartitionRole::Dynamic, version),
            legacy_name: name(PartitionRole::Legacy, legacy_version),
        }
    }

    pub fn name(&self, role: PartitionRole) -> &str {
        match role {
            PartitionRole::Static => &self.static_name,
            PartitionRole::Dynamic => &self.dynamic_name,
            PartitionRole::Legacy => &self.legacy_name,
        }
    }

    pub fn static_name(&self) -> &str {
        &self.static_name
    }

    pub fn dynamic_name(&self) -> &str {
        &self.dynamic_name
    }

    /// Names that survive activation. The legacy name is never current.
    pub fn allow_list(&self) -> [&str; 2] {
        [&self.static_name, &self.dynamic_name]
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.allow_list().contains(&name)
    }

    /// Role of a partition name under this deployment, if it is one of ours.
    pub fn role_of(&self, name: &str) -> Option<PartitionRole> {
        [PartitionRole::Static, PartitionRole::Dynamic, PartitionRole::Legacy]
            .into_iter()
            .find(|role| self.name(*role) == name)
    }
}
