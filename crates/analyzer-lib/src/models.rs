//! Core data models for the placement analyzer

use crate::error::{AnalyzerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp type used for pod lifecycle observations
pub type Timestamp = DateTime<Utc>;

/// One observation of a pod, filed under one of its owning controllers.
///
/// A pod with several owner references produces one element per owner.
/// The serialized field names match the snapshot format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodElement {
    pub namespace: String,
    /// Owner kind, e.g. `ReplicaSet`
    pub kind: String,
    /// Owner name
    pub kind_name: String,
    pub pod_name: String,
    /// Node the pod was scheduled to, empty when unscheduled
    #[serde(default)]
    pub node: String,
    #[serde(alias = "CreationTimestamp")]
    pub creation_timestamp: Timestamp,
    #[serde(default, alias = "DeletionTimestamp")]
    pub deletion_timestamp: Option<Timestamp>,
}

impl PodElement {
    /// Key of the controller owning this pod
    pub fn owner_key(&self) -> OwnerKey {
        OwnerKey::new(&self.namespace, &self.kind, &self.kind_name)
    }

    /// Key of this pod instance; creation time separates reused names
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            owner: self.owner_key(),
            pod_name: self.pod_name.clone(),
            creation_timestamp: self.creation_timestamp,
        }
    }

    /// `namespace/kind/name/pod`, used when rendering chains
    pub fn unique_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.namespace, self.kind, self.kind_name, self.pod_name
        )
    }

    pub fn is_deleted(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    /// Reject records the matcher cannot reason about
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("namespace", &self.namespace),
            ("kind", &self.kind),
            ("kindName", &self.kind_name),
            ("podName", &self.pod_name),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(AnalyzerError::InvalidRecord {
                    reason: format!("{} must not be empty", field),
                });
            }
        }

        if let Some(deleted_at) = self.deletion_timestamp {
            if deleted_at < self.creation_timestamp {
                return Err(AnalyzerError::InvalidRecord {
                    reason: format!(
                        "pod {} deleted at {} before its creation at {}",
                        self.unique_key(),
                        deleted_at.to_rfc3339(),
                        self.creation_timestamp.to_rfc3339()
                    ),
                });
            }
        }

        Ok(())
    }
}

impl fmt::Display for PodElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ns={}, kind={}, kindname={}, podname={}, node={}, ct={}, dt={}",
            self.namespace,
            self.kind,
            self.kind_name,
            self.pod_name,
            self.node,
            self.creation_timestamp.to_rfc3339(),
            self.deletion_timestamp
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string())
        )
    }
}

/// Identifies an owning controller: `namespace/kind/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerKey {
    pub namespace: String,
    pub kind: String,
    pub name: String,
}

impl OwnerKey {
    pub fn new(namespace: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.kind, self.name)
    }
}

impl FromStr for OwnerKey {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(ns), Some(kind), Some(name))
                if !ns.is_empty() && !kind.is_empty() && !name.is_empty() =>
            {
                Ok(Self::new(ns, kind, name))
            }
            _ => Err(AnalyzerError::InvalidOwnerKey(s.to_string())),
        }
    }
}

impl Serialize for OwnerKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OwnerKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifies a single pod instance within its owner
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub owner: OwnerKey,
    pub pod_name: String,
    pub creation_timestamp: Timestamp,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.owner,
            self.pod_name,
            self.creation_timestamp.to_rfc3339()
        )
    }
}
