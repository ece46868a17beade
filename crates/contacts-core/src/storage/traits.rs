use crate::error::Result;
use crate::storage::filters::{ResourceFilter, StorageStats};
use crate::types::{Link, LinkId, Resource, ResourceId};

/// Storage trait for the resource graph
pub trait Storage: Send + Sync {
    // === Resource Operations ===

    /// Store a resource (insert or update)
    fn put_resource(&self, resource: &Resource) -> Result<()>;

    /// Retrieve a resource by ID
    fn get_resource(&self, id: ResourceId) -> Result<Option<Resource>>;

    /// Hard delete a resource together with every link touching it
    fn delete_resource(&self, id: ResourceId) -> Result<()>;

    /// List resources matching the filter, oldest first
    fn list_resources(&self, filter: ResourceFilter) -> Result<Vec<Resource>>;

    /// Count resources matching the filter
    fn count_resources(&self, filter: ResourceFilter) -> Result<u64> {
        Ok(self.list_resources(filter)?.len() as u64)
    }

    // === Link Operations ===

    /// Store a link. Both endpoints must exist.
    fn put_link(&self, link: &Link) -> Result<()>;

    /// Retrieve a link by ID
    fn get_link(&self, id: LinkId) -> Result<Option<Link>>;

    /// Delete a link
    fn delete_link(&self, id: LinkId) -> Result<()>;

    /// Links stored with `id` as their source, in creation order
    fn links_from(&self, id: ResourceId) -> Result<Vec<Link>>;

    /// Links stored with `id` as their target, in creation order
    fn links_to(&self, id: ResourceId) -> Result<Vec<Link>>;

    // === Maintenance ===

    /// Get storage statistics
    fn stats(&self) -> Result<StorageStats>;
}
