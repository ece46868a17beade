use crate::error::{ContactsError, Result};
use crate::graph::body::searchable_body;
use crate::schema::ContactSchema;
use crate::services::IndexScheduler;
use crate::storage::{ResourceFilter, Storage};
use crate::types::{Link, LinkDirection, LinkType, PropValue, Resource, ResourceId, ResourceKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Notified about resource lifecycle events.
pub trait GraphObserver: Send + Sync {
    /// A resource and all of its links were removed.
    fn resource_deleted(&self, _id: ResourceId, _kind: ResourceKind) {}

    /// Properties of a resource changed. Inside an update scope this fires
    /// once, when the outermost scope ends.
    fn resource_updated(&self, _id: ResourceId) {}
}

/// Open begin/end update scope on one resource
#[derive(Debug)]
struct UpdateScope {
    depth: u32,
    body: String,
    dirty: bool,
}

/// Typed façade over a [`Storage`] backend.
///
/// Enforces link semantics the store owns: registered link types only, no
/// self-loops, no duplicate (source, type, target) triples, and the
/// per-type outgoing cardinality from [`LinkSpec`](crate::schema::LinkSpec).
/// All mutation is expected to happen on one owner thread.
pub struct ResourceGraph<S: Storage> {
    storage: Arc<S>,
    schema: Arc<ContactSchema>,
    indexer: Arc<dyn IndexScheduler>,
    reindex_on_change: bool,
    scopes: Mutex<HashMap<ResourceId, UpdateScope>>,
    observers: RwLock<Vec<Arc<dyn GraphObserver>>>,
}

impl<S: Storage> ResourceGraph<S> {
    pub fn new(
        storage: Arc<S>,
        schema: Arc<ContactSchema>,
        indexer: Arc<dyn IndexScheduler>,
    ) -> Self {
        Self {
            storage,
            schema,
            indexer,
            reindex_on_change: true,
            scopes: Mutex::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn with_reindex(mut self, enabled: bool) -> Self {
        self.reindex_on_change = enabled;
        self
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn schema(&self) -> &ContactSchema {
        &self.schema
    }

    pub fn subscribe(&self, observer: Arc<dyn GraphObserver>) -> Result<()> {
        self.observers
            .write()
            .map_err(|_| ContactsError::Validation("Observer list lock poisoned".into()))?
            .push(observer);
        Ok(())
    }

    fn observers(&self) -> Vec<Arc<dyn GraphObserver>> {
        self.observers
            .read()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    fn scopes(&self) -> Result<MutexGuard<'_, HashMap<ResourceId, UpdateScope>>> {
        self.scopes
            .lock()
            .map_err(|_| ContactsError::Validation("Update scope lock poisoned".into()))
    }

    // === Resources ===

    pub fn create(&self, kind: ResourceKind) -> Result<Resource> {
        let resource = Resource::new(kind);
        self.storage.put_resource(&resource)?;
        Ok(resource)
    }

    pub fn get(&self, id: ResourceId) -> Result<Option<Resource>> {
        self.storage.get_resource(id)
    }

    pub fn exists(&self, id: ResourceId) -> Result<bool> {
        Ok(self.storage.get_resource(id)?.is_some())
    }

    pub fn require(&self, id: ResourceId) -> Result<Resource> {
        self.storage
            .get_resource(id)?
            .ok_or(ContactsError::NodeNotFound(id))
    }

    /// Load a resource and check its kind.
    pub fn require_kind(&self, id: ResourceId, kinds: &[ResourceKind]) -> Result<Resource> {
        let resource = self.require(id)?;
        if !kinds.contains(&resource.kind) {
            return Err(ContactsError::WrongKind {
                id,
                expected: kinds
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(" or "),
                found: resource.kind.to_string(),
            });
        }
        Ok(resource)
    }

    pub fn list(&self, filter: ResourceFilter) -> Result<Vec<Resource>> {
        self.storage.list_resources(filter)
    }

    /// Text property, empty when the property or the resource is missing.
    pub fn text(&self, id: ResourceId, key: &str) -> Result<String> {
        Ok(self
            .storage
            .get_resource(id)?
            .map(|r| r.text(key).to_string())
            .unwrap_or_default())
    }

    /// Read-modify-write of one resource's properties.
    pub fn update<F>(&self, id: ResourceId, f: F) -> Result<()>
    where
        F: FnOnce(&mut Resource),
    {
        let mut resource = self.require(id)?;
        let before = resource.props.clone();
        f(&mut resource);
        if resource.props == before {
            return Ok(());
        }
        self.storage.put_resource(&resource)?;
        self.mark_updated(id)
    }

    pub fn set_prop(&self, id: ResourceId, key: &str, value: impl Into<PropValue>) -> Result<()> {
        let value = value.into();
        self.update(id, |r| r.set(key, value))
    }

    pub fn delete_prop(&self, id: ResourceId, key: &str) -> Result<Option<PropValue>> {
        let mut removed = None;
        self.update(id, |r| removed = r.remove(key))?;
        Ok(removed)
    }

    fn mark_updated(&self, id: ResourceId) -> Result<()> {
        let in_scope = {
            let mut scopes = self.scopes()?;
            match scopes.get_mut(&id) {
                Some(scope) => {
                    scope.dirty = true;
                    true
                }
                None => false,
            }
        };
        if !in_scope {
            for observer in self.observers() {
                observer.resource_updated(id);
            }
        }
        Ok(())
    }

    /// Hard delete a resource and every link touching it.
    pub fn delete(&self, id: ResourceId) -> Result<()> {
        let resource = self.require(id)?;
        self.storage.delete_resource(id)?;
        self.scopes()?.remove(&id);
        for observer in self.observers() {
            observer.resource_deleted(id, resource.kind);
        }
        Ok(())
    }

    // === Update scopes ===

    /// Open (or re-enter) a batched update scope on `id`.
    pub fn begin_update(&self, id: ResourceId) -> Result<()> {
        let mut scopes = self.scopes()?;
        if let Some(scope) = scopes.get_mut(&id) {
            scope.depth += 1;
            return Ok(());
        }
        drop(scopes);

        let body = searchable_body(&self.require(id)?);
        self.scopes()?.insert(
            id,
            UpdateScope {
                depth: 1,
                body,
                dirty: false,
            },
        );
        Ok(())
    }

    /// Close one level of the update scope on `id`. When the outermost
    /// scope closes, fires the batched change notification and requests
    /// re-indexing if the searchable body changed. Returns whether it did.
    pub fn end_update(&self, id: ResourceId) -> Result<bool> {
        let scope = {
            let mut scopes = self.scopes()?;
            let scope = scopes.get_mut(&id).ok_or_else(|| {
                ContactsError::consistency(format!("end_update on {} without begin_update", id))
            })?;
            scope.depth -= 1;
            if scope.depth > 0 {
                return Ok(false);
            }
            scopes.remove(&id)
        };
        let Some(scope) = scope else {
            return Ok(false);
        };

        let Some(resource) = self.get(id)? else {
            return Ok(false);
        };
        if scope.dirty {
            for observer in self.observers() {
                observer.resource_updated(id);
            }
        }
        let changed = searchable_body(&resource) != scope.body;
        if changed && self.reindex_on_change {
            self.indexer.request_reindex(id);
        }
        Ok(changed)
    }

    pub fn in_update(&self, id: ResourceId) -> Result<bool> {
        Ok(self.scopes()?.contains_key(&id))
    }

    /// Ask for re-indexing outside of an update scope, e.g. for a resource
    /// that was just materialized.
    pub fn request_reindex(&self, id: ResourceId) {
        if self.reindex_on_change {
            self.indexer.request_reindex(id);
        }
    }

    // === Links ===

    fn spec_directed(&self, link_type: &LinkType) -> Result<bool> {
        self.schema
            .link_spec(link_type)
            .map(|s| s.directed)
            .ok_or_else(|| ContactsError::InvalidLink {
                reason: format!("Link type '{}' is not registered", link_type),
            })
    }

    fn find_links(&self, a: ResourceId, b: ResourceId, link_type: &LinkType) -> Result<Vec<Link>> {
        let directed = self.spec_directed(link_type)?;
        let mut found: Vec<Link> = self
            .storage
            .links_from(a)?
            .into_iter()
            .filter(|l| l.to == b && l.link_type == *link_type)
            .collect();
        if !directed {
            found.extend(
                self.storage
                    .links_from(b)?
                    .into_iter()
                    .filter(|l| l.to == a && l.link_type == *link_type),
            );
        }
        Ok(found)
    }

    pub fn has_link(&self, a: ResourceId, b: ResourceId, link_type: &LinkType) -> Result<bool> {
        Ok(!self.find_links(a, b, link_type)?.is_empty())
    }

    /// Add `from -> to`. Returns false when the link already exists.
    pub fn add_link(&self, from: ResourceId, to: ResourceId, link_type: &LinkType) -> Result<bool> {
        if from == to {
            return Err(ContactsError::InvalidLink {
                reason: format!("Refusing self-link '{}' on {}", link_type, from),
            });
        }
        if self.has_link(from, to, link_type)? {
            return Ok(false);
        }

        if let Some(max) = self.schema.link_spec(link_type).and_then(|s| s.max_outgoing) {
            let existing = self
                .storage
                .links_from(from)?
                .iter()
                .filter(|l| l.link_type == *link_type)
                .count();
            if existing >= max {
                return Err(ContactsError::LinkRestriction {
                    from,
                    link_type: link_type.to_string(),
                    max,
                });
            }
        }

        self.storage
            .put_link(&Link::new(from, to, link_type.clone()))?;
        Ok(true)
    }

    /// Remove `a -> b` (either direction for undirected types).
    /// Returns false when there was nothing to remove.
    pub fn remove_link(&self, a: ResourceId, b: ResourceId, link_type: &LinkType) -> Result<bool> {
        let links = self.find_links(a, b, link_type)?;
        for link in &links {
            self.storage.delete_link(link.id)?;
        }
        Ok(!links.is_empty())
    }

    /// Targets of directed links leaving `id`, or peers for undirected types.
    pub fn outgoing(&self, id: ResourceId, link_type: &LinkType) -> Result<Vec<ResourceId>> {
        let directed = self.spec_directed(link_type)?;
        let mut peers: Vec<ResourceId> = self
            .storage
            .links_from(id)?
            .into_iter()
            .filter(|l| l.link_type == *link_type)
            .map(|l| l.to)
            .collect();
        if !directed {
            for link in self.storage.links_to(id)? {
                if link.link_type == *link_type && !peers.contains(&link.from) {
                    peers.push(link.from);
                }
            }
        }
        Ok(peers)
    }

    /// Sources of directed links arriving at `id`, or peers for undirected types.
    pub fn incoming(&self, id: ResourceId, link_type: &LinkType) -> Result<Vec<ResourceId>> {
        if !self.spec_directed(link_type)? {
            return self.outgoing(id, link_type);
        }
        Ok(self
            .storage
            .links_to(id)?
            .into_iter()
            .filter(|l| l.link_type == *link_type)
            .map(|l| l.from)
            .collect())
    }

    /// Every link type present on `id`, with the direction it is seen from
    /// `id`. Undirected types are always reported as outgoing.
    pub fn link_types(&self, id: ResourceId) -> Result<Vec<(LinkType, LinkDirection)>> {
        let mut types: Vec<(LinkType, LinkDirection)> = Vec::new();
        let mut push = |t: LinkType, d: LinkDirection| {
            if !types.iter().any(|(et, ed)| *et == t && *ed == d) {
                types.push((t, d));
            }
        };
        for link in self.storage.links_from(id)? {
            push(link.link_type, LinkDirection::Outgoing);
        }
        for link in self.storage.links_to(id)? {
            let direction = if self.schema.is_directed(&link.link_type) {
                LinkDirection::Incoming
            } else {
                LinkDirection::Outgoing
            };
            push(link.link_type, direction);
        }
        Ok(types)
    }

    /// Number of `link_type` links on `id` in the given direction.
    pub fn link_count(
        &self,
        id: ResourceId,
        link_type: &LinkType,
        direction: LinkDirection,
    ) -> Result<usize> {
        Ok(match direction {
            LinkDirection::Outgoing => self.outgoing(id, link_type)?.len(),
            LinkDirection::Incoming => self.incoming(id, link_type)?.len(),
        })
    }

    /// True when nothing links to or from `id`.
    pub fn is_isolated(&self, id: ResourceId) -> Result<bool> {
        Ok(self.storage.links_from(id)?.is_empty() && self.storage.links_to(id)?.is_empty())
    }
}
