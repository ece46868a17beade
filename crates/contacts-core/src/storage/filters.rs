use crate::types::{LinkType, Resource, ResourceKind};
use std::collections::HashMap;

/// Filter criteria for querying resources
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub kinds: Option<Vec<ResourceKind>>,
    /// Exact match on a text property.
    pub text_equals: Option<(String, String)>,
    /// Boolean property that must be set to true.
    pub flag: Option<String>,
    pub limit: Option<usize>,
}

impl ResourceFilter {
    /// Create a new empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by resource kinds
    pub fn with_kinds(mut self, kinds: Vec<ResourceKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    /// Filter by a single resource kind
    pub fn of_kind(self, kind: ResourceKind) -> Self {
        self.with_kinds(vec![kind])
    }

    /// Only resources whose text property `key` equals `value`
    pub fn with_text(mut self, key: &str, value: &str) -> Self {
        self.text_equals = Some((key.to_string(), value.to_string()));
        self
    }

    /// Only resources carrying the boolean marker `key`
    pub fn with_flag(mut self, key: &str) -> Self {
        self.flag = Some(key.to_string());
        self
    }

    /// Limit number of results
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check a resource against everything but the limit
    pub fn matches(&self, resource: &Resource) -> bool {
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&resource.kind) {
                return false;
            }
        }

        if let Some((ref key, ref value)) = self.text_equals {
            if resource.text(key) != value {
                return false;
            }
        }

        if let Some(ref key) = self.flag {
            if !resource.flag(key) {
                return false;
            }
        }

        true
    }
}

/// Storage statistics
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    pub resource_count: u64,
    pub link_count: u64,
    pub resource_counts_by_kind: HashMap<ResourceKind, u64>,
    pub link_counts_by_type: HashMap<LinkType, u64>,
}
