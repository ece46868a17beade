use crate::error::{ContactsError, Result};
use crate::storage::filters::{ResourceFilter, StorageStats};
use crate::storage::traits::Storage;
use crate::types::{Link, LinkId, Resource, ResourceId};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    resources: HashMap<ResourceId, Resource>,
    links: HashMap<LinkId, Link>,
    by_from: HashMap<ResourceId, Vec<LinkId>>,
    by_to: HashMap<ResourceId, Vec<LinkId>>,
}

impl Inner {
    fn unindex_link(&mut self, link: &Link) {
        if let Some(ids) = self.by_from.get_mut(&link.from) {
            ids.retain(|id| *id != link.id);
        }
        if let Some(ids) = self.by_to.get_mut(&link.to) {
            ids.retain(|id| *id != link.id);
        }
    }

    fn collect(&self, ids: Option<&Vec<LinkId>>) -> Vec<Link> {
        ids.map(|ids| {
            ids.iter()
                .filter_map(|id| self.links.get(id).cloned())
                .collect()
        })
        .unwrap_or_default()
    }
}

/// Volatile storage backed by hash maps. Used for tests and short-lived
/// sessions.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| ContactsError::Validation("Memory storage lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| ContactsError::Validation("Memory storage lock poisoned".into()))
    }
}

impl Storage for MemoryStorage {
    fn put_resource(&self, resource: &Resource) -> Result<()> {
        resource.validate().map_err(ContactsError::Validation)?;
        self.write()?.resources.insert(resource.id, resource.clone());
        Ok(())
    }

    fn get_resource(&self, id: ResourceId) -> Result<Option<Resource>> {
        Ok(self.read()?.resources.get(&id).cloned())
    }

    fn delete_resource(&self, id: ResourceId) -> Result<()> {
        let mut inner = self.write()?;
        if inner.resources.remove(&id).is_none() {
            return Err(ContactsError::NodeNotFound(id));
        }

        let mut touching: Vec<LinkId> = inner.by_from.remove(&id).unwrap_or_default();
        touching.extend(inner.by_to.remove(&id).unwrap_or_default());
        for link_id in touching {
            if let Some(link) = inner.links.remove(&link_id) {
                inner.unindex_link(&link);
            }
        }
        Ok(())
    }

    fn list_resources(&self, filter: ResourceFilter) -> Result<Vec<Resource>> {
        let inner = self.read()?;
        let mut out: Vec<Resource> = inner
            .resources
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        // UUIDv7 ids sort by creation time
        out.sort_by_key(|r| r.id);
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn put_link(&self, link: &Link) -> Result<()> {
        link.validate()
            .map_err(|reason| ContactsError::InvalidLink { reason })?;

        let mut inner = self.write()?;
        for end in [link.from, link.to] {
            if !inner.resources.contains_key(&end) {
                return Err(ContactsError::NodeNotFound(end));
            }
        }

        if let Some(old) = inner.links.remove(&link.id) {
            inner.unindex_link(&old);
        }
        inner.by_from.entry(link.from).or_default().push(link.id);
        inner.by_to.entry(link.to).or_default().push(link.id);
        inner.links.insert(link.id, link.clone());
        Ok(())
    }

    fn get_link(&self, id: LinkId) -> Result<Option<Link>> {
        Ok(self.read()?.links.get(&id).cloned())
    }

    fn delete_link(&self, id: LinkId) -> Result<()> {
        let mut inner = self.write()?;
        let link = inner
            .links
            .remove(&id)
            .ok_or(ContactsError::LinkNotFound(id))?;
        inner.unindex_link(&link);
        Ok(())
    }

    fn links_from(&self, id: ResourceId) -> Result<Vec<Link>> {
        let inner = self.read()?;
        Ok(inner.collect(inner.by_from.get(&id)))
    }

    fn links_to(&self, id: ResourceId) -> Result<Vec<Link>> {
        let inner = self.read()?;
        Ok(inner.collect(inner.by_to.get(&id)))
    }

    fn stats(&self) -> Result<StorageStats> {
        let inner = self.read()?;
        let mut stats = StorageStats {
            resource_count: inner.resources.len() as u64,
            link_count: inner.links.len() as u64,
            ..Default::default()
        };
        for r in inner.resources.values() {
            *stats.resource_counts_by_kind.entry(r.kind).or_insert(0) += 1;
        }
        for l in inner.links.values() {
            *stats
                .link_counts_by_type
                .entry(l.link_type.clone())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LinkType, ResourceKind};

    #[test]
    fn test_delete_resource_cascades_links() {
        let storage = MemoryStorage::new();
        let a = Resource::new(ResourceKind::Contact);
        let b = Resource::new(ResourceKind::Category);
        storage.put_resource(&a).unwrap();
        storage.put_resource(&b).unwrap();

        let link = Link::new(a.id, b.id, LinkType::new("category").unwrap());
        storage.put_link(&link).unwrap();
        assert_eq!(storage.links_to(b.id).unwrap().len(), 1);

        storage.delete_resource(a.id).unwrap();
        assert!(storage.get_link(link.id).unwrap().is_none());
        assert!(storage.links_to(b.id).unwrap().is_empty());
        assert!(matches!(
            storage.delete_resource(a.id),
            Err(ContactsError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_link_requires_endpoints() {
        let storage = MemoryStorage::new();
        let a = Resource::new(ResourceKind::Contact);
        storage.put_resource(&a).unwrap();
        let dangling = Link::new(a.id, uuid::Uuid::now_v7(), LinkType::new("related").unwrap());
        assert!(matches!(
            storage.put_link(&dangling),
            Err(ContactsError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_list_is_creation_ordered() {
        let storage = MemoryStorage::new();
        let ids: Vec<_> = (0..5)
            .map(|_| {
                let r = Resource::new(ResourceKind::Contact);
                storage.put_resource(&r).unwrap();
                r.id
            })
            .collect();
        let listed: Vec<_> = storage
            .list_resources(ResourceFilter::new().of_kind(ResourceKind::Contact))
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(listed, ids);
    }
}
