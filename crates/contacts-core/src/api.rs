use crate::config::EngineConfig;
use crate::contact::{ContactManager, MaintenanceReport, NameParts};
use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::schema::{props, ContactSchema, Role};
use crate::services::{JobPriority, QueuedIndexer, ResourceOwner};
use crate::storage::{MemoryStorage, RedbStorage, Storage, StorageStats};
use crate::types::{Resource, ResourceId, ResourceKind};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

/// Config for embedded library mode.
#[derive(Debug, Clone, Default)]
pub struct LibraryConfig {
    pub engine: EngineConfig,
    /// Link types known to the store. Register application links here
    /// before opening.
    pub schema: ContactSchema,
}

/// High-level, embedded contacts API.
///
/// Every mutation runs as a job on one owner thread; the methods here
/// submit the job and wait for it.
///
/// # Example
/// ```rust,no_run
/// use contacts_core::{Contacts, LibraryConfig, NameParts};
///
/// let contacts = Contacts::open("./contacts.redb", LibraryConfig::default()).unwrap();
/// let a = contacts.find_or_create_contact("ann@example.org", "Ann Lee").unwrap();
/// let b = contacts.find_or_create_contact("ann.lee@example.com", "Ann Lee").unwrap();
/// let merged = contacts.merge(NameParts::new("Ann", "Lee"), vec![a, b]).unwrap();
/// contacts.split_all(merged).unwrap();
/// ```
pub struct Contacts<S: Storage + 'static> {
    storage: Arc<S>,
    indexer: Arc<QueuedIndexer>,
    owner: ResourceOwner<ContactManager<S>>,
}

impl Contacts<RedbStorage> {
    /// Open (or create) a contacts database at the given path.
    pub fn open(path: impl AsRef<Path>, config: LibraryConfig) -> Result<Self> {
        let storage = Arc::new(RedbStorage::open(path.as_ref())?);
        Self::start(storage, config)
    }
}

impl Contacts<MemoryStorage> {
    pub fn in_memory(config: LibraryConfig) -> Result<Self> {
        Self::start(Arc::new(MemoryStorage::new()), config)
    }
}

impl<S: Storage + 'static> Contacts<S> {
    fn start(storage: Arc<S>, config: LibraryConfig) -> Result<Self> {
        config.engine.validate()?;
        let indexer = Arc::new(QueuedIndexer::new());
        let graph = ResourceGraph::new(storage.clone(), Arc::new(config.schema), indexer.clone())
            .with_reindex(config.engine.reindex_on_change);
        let thread_name = config.engine.owner_thread_name.clone();
        let manager = ContactManager::new(Arc::new(graph), config.engine)?;
        let owner = ResourceOwner::spawn(&thread_name, manager)?;
        Ok(Self {
            storage,
            indexer,
            owner,
        })
    }

    /// Run `job` on the owner thread and wait for its result.
    pub fn run<F, R>(&self, priority: JobPriority, job: F) -> Result<R>
    where
        F: FnOnce(&ContactManager<S>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.owner.submit(priority, move |manager| job(manager))?.wait()?
    }

    pub fn merge(&self, name: NameParts, contacts: Vec<ResourceId>) -> Result<ResourceId> {
        self.run(JobPriority::Immediate, move |m| m.merge(&name, &contacts))
    }

    pub fn split(&self, contact: ResourceId, keepers: Vec<ResourceId>) -> Result<Vec<ResourceId>> {
        self.run(JobPriority::Immediate, move |m| m.split(contact, &keepers))
    }

    pub fn split_all(&self, contact: ResourceId) -> Result<Vec<ResourceId>> {
        self.run(JobPriority::Immediate, move |m| m.split_all(contact))
    }

    pub fn snapshots(&self, contact: ResourceId) -> Result<Vec<ResourceId>> {
        self.run(JobPriority::Normal, move |m| m.snapshots(contact))
    }

    pub fn find_or_create_contact(&self, address: &str, display: &str) -> Result<ResourceId> {
        let (address, display) = (address.to_string(), display.to_string());
        self.run(JobPriority::Normal, move |m| m.find_or_create_contact(&address, &display))
    }

    pub fn find_or_create_account(&self, address: &str, personal: bool) -> Result<ResourceId> {
        let address = address.to_string();
        self.run(JobPriority::Normal, move |m| m.find_or_create_account(&address, personal))
    }

    /// Store a new piece of correspondence.
    pub fn add_correspondence(
        &self,
        subject: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<ResourceId> {
        let subject = subject.to_string();
        self.run(JobPriority::Normal, move |m| {
            let graph = m.graph();
            let item = graph.create(ResourceKind::Correspondence)?.id;
            graph.set_prop(item, props::SUBJECT, subject)?;
            if let Some(date) = date {
                graph.set_prop(item, props::DATE, date)?;
            }
            Ok(item)
        })
    }

    pub fn link_correspondence(
        &self,
        item: ResourceId,
        role: Role,
        contact: ResourceId,
        account: Option<ResourceId>,
        display: &str,
    ) -> Result<()> {
        let display = display.to_string();
        self.run(JobPriority::Normal, move |m| {
            m.link_correspondence(item, role, contact, account, &display)
        })
    }

    pub fn myself(&self) -> Result<Option<ResourceId>> {
        self.run(JobPriority::Normal, |m| m.myself())
    }

    pub fn set_myself(&self, contact: ResourceId) -> Result<()> {
        self.run(JobPriority::Normal, move |m| m.set_myself(contact))
    }

    /// Prune stragglers now.
    pub fn maintain(&self) -> Result<MaintenanceReport> {
        self.run(JobPriority::Idle, |m| m.run_maintenance())
    }

    /// Queue a maintenance pass for when the owner is otherwise idle.
    pub fn schedule_maintenance(&self) -> Result<()> {
        self.owner.enqueue(JobPriority::Idle, |m| {
            if let Err(e) = m.run_maintenance() {
                log::warn!("Maintenance pass failed: {}", e);
            }
        })
    }

    /// Read a resource. Reads do not go through the owner.
    pub fn get(&self, id: ResourceId) -> Result<Option<Resource>> {
        self.storage.get_resource(id)
    }

    /// Ids whose search entry is stale, oldest first. Draining hands them
    /// over to the caller.
    pub fn take_reindex_requests(&self) -> Vec<ResourceId> {
        self.indexer.drain()
    }

    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.stats()
    }

    /// Stop the owner thread after the queued jobs ran.
    pub fn close(self) {
        self.owner.shutdown();
    }
}
