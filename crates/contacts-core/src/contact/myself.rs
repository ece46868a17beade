use crate::error::{ContactsError, Result};
use crate::graph::{GraphObserver, ResourceGraph};
use crate::schema::props;
use crate::storage::{ResourceFilter, Storage};
use crate::types::{ResourceId, ResourceKind};
use std::sync::Mutex;

/// Cached id of the contact that represents the user.
///
/// Looked up lazily. Subscribed to the graph, it forgets the answer when
/// the cached contact is deleted or changed, or when any resource changes
/// while nobody is marked.
#[derive(Debug, Default)]
pub struct MyselfCache {
    // None: not looked up yet
    cached: Mutex<Option<Option<ResourceId>>>,
}

impl MyselfCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<S: Storage>(&self, graph: &ResourceGraph<S>) -> Result<Option<ResourceId>> {
        if let Some(cached) = self.peek() {
            return Ok(cached);
        }

        let marked = graph.list(
            ResourceFilter::new()
                .of_kind(ResourceKind::Contact)
                .with_flag(props::MYSELF),
        )?;
        let found = match marked.as_slice() {
            [] => None,
            [one] => Some(one.id),
            many => {
                return Err(ContactsError::consistency(format!(
                    "{} contacts are marked as myself",
                    many.len()
                )))
            }
        };
        self.store(Some(found));
        Ok(found)
    }

    /// Mark `contact` as the user, clearing the marker everywhere else.
    pub fn set<S: Storage>(&self, graph: &ResourceGraph<S>, contact: ResourceId) -> Result<()> {
        graph.require_kind(contact, &[ResourceKind::Contact])?;
        let marked = graph.list(
            ResourceFilter::new()
                .of_kind(ResourceKind::Contact)
                .with_flag(props::MYSELF),
        )?;
        for other in marked {
            if other.id != contact {
                graph.delete_prop(other.id, props::MYSELF)?;
            }
        }
        graph.set_prop(contact, props::MYSELF, true)?;
        self.store(Some(Some(contact)));
        log::debug!("Contact {} is now myself", contact);
        Ok(())
    }

    pub fn invalidate(&self) {
        self.store(None);
    }

    fn peek(&self) -> Option<Option<ResourceId>> {
        self.cached.lock().map(|c| *c).unwrap_or(None)
    }

    fn store(&self, value: Option<Option<ResourceId>>) {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = value;
        }
    }
}

impl GraphObserver for MyselfCache {
    fn resource_deleted(&self, id: ResourceId, kind: ResourceKind) {
        if kind == ResourceKind::Contact && self.peek() == Some(Some(id)) {
            self.invalidate();
        }
    }

    // The marker may have moved
    fn resource_updated(&self, id: ResourceId) {
        match self.peek() {
            Some(Some(cached)) if cached != id => {}
            Some(_) => self.invalidate(),
            None => {}
        }
    }
}
