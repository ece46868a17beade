//! Contact identity operations: merging duplicates, undoing merges, and the
//! lookups and bookkeeping around them.

mod fields;
mod lookup;
mod maintenance;
mod merge;
mod myself;
pub mod names;
mod relink;
mod split;

pub use fields::{merge_text, normalize_phone, FieldMerger};
pub use lookup::{
    find_account, find_or_create_account, find_or_create_contact, link_correspondence,
    normalize_address,
};
pub use maintenance::{prune_hung_contacts, prune_orphan_names, run_maintenance, MaintenanceReport};
pub use merge::{ContactMergeEngine, NameParts};
pub use myself::MyselfCache;
pub use names::{display_name, parse_display_name, ParsedName};
pub use relink::{LinkRelinker, RelinkStats};
pub use split::ContactSplitEngine;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::schema::Role;
use crate::services::ProgressSink;
use crate::snapshot::{BincodeSnapshotCodec, SnapshotCodec};
use crate::storage::Storage;
use crate::types::ResourceId;
use std::sync::Arc;

/// Everything the contact operations need, bundled for the owner thread.
pub struct ContactManager<S: Storage, C: SnapshotCodec = BincodeSnapshotCodec> {
    graph: Arc<ResourceGraph<S>>,
    codec: C,
    config: EngineConfig,
    myself: Arc<MyselfCache>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl<S: Storage> ContactManager<S, BincodeSnapshotCodec> {
    pub fn new(graph: Arc<ResourceGraph<S>>, config: EngineConfig) -> Result<Self> {
        let codec = BincodeSnapshotCodec::for_schema(graph.schema());
        Self::with_codec(graph, codec, config)
    }
}

impl<S: Storage, C: SnapshotCodec> ContactManager<S, C> {
    pub fn with_codec(
        graph: Arc<ResourceGraph<S>>,
        codec: C,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let myself = Arc::new(MyselfCache::new());
        graph.subscribe(myself.clone())?;
        Ok(Self {
            graph,
            codec,
            config,
            myself,
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn graph(&self) -> &ResourceGraph<S> {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn merge(&self, name: &NameParts, contacts: &[ResourceId]) -> Result<ResourceId> {
        let engine = ContactMergeEngine::new(&self.graph, &self.codec, &self.config);
        match self.progress.as_deref() {
            Some(progress) => engine.with_progress(progress).merge(name, contacts),
            None => engine.merge(name, contacts),
        }
    }

    pub fn split(&self, contact: ResourceId, keepers: &[ResourceId]) -> Result<Vec<ResourceId>> {
        let engine = ContactSplitEngine::new(&self.graph, &self.codec, &self.config);
        match self.progress.as_deref() {
            Some(progress) => engine.with_progress(progress).split(contact, keepers),
            None => engine.split(contact, keepers),
        }
    }

    /// Snapshot keepers held by a merged contact.
    pub fn snapshots(&self, contact: ResourceId) -> Result<Vec<ResourceId>> {
        self.graph.outgoing(contact, &self.graph.schema().holds_snapshot)
    }

    /// Undo a merge completely.
    pub fn split_all(&self, contact: ResourceId) -> Result<Vec<ResourceId>> {
        let keepers = self.snapshots(contact)?;
        self.split(contact, &keepers)
    }

    pub fn myself(&self) -> Result<Option<ResourceId>> {
        self.myself.get(&self.graph)
    }

    pub fn set_myself(&self, contact: ResourceId) -> Result<()> {
        self.myself.set(&self.graph, contact)
    }

    pub fn find_or_create_account(&self, address: &str, personal: bool) -> Result<ResourceId> {
        find_or_create_account(&self.graph, address, personal)
    }

    pub fn find_or_create_contact(&self, address: &str, display: &str) -> Result<ResourceId> {
        find_or_create_contact(&self.graph, address, display)
    }

    pub fn link_correspondence(
        &self,
        item: ResourceId,
        role: Role,
        contact: ResourceId,
        account: Option<ResourceId>,
        display: &str,
    ) -> Result<()> {
        link_correspondence(&self.graph, item, role, contact, account, display)
    }

    pub fn run_maintenance(&self) -> Result<MaintenanceReport> {
        run_maintenance(&self.graph)
    }
}

/// Delete a contact together with the phone entries it owns.
pub(crate) fn delete_contact<S: Storage>(
    graph: &ResourceGraph<S>,
    contact: ResourceId,
) -> Result<()> {
    for phone in graph.outgoing(contact, &graph.schema().phone)? {
        graph.delete(phone)?;
    }
    graph.delete(contact)
}

#[cfg(test)]
mod tests;
