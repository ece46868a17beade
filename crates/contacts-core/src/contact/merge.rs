use crate::config::EngineConfig;
use crate::contact::delete_contact;
use crate::contact::fields::FieldMerger;
use crate::contact::names::display_name;
use crate::contact::relink::LinkRelinker;
use crate::error::{ContactsError, Result};
use crate::graph::ResourceGraph;
use crate::schema::props;
use crate::services::{percent, ProgressSink};
use crate::snapshot::SnapshotCodec;
use crate::storage::Storage;
use crate::types::{PropValue, ResourceId, ResourceKind};
use std::collections::HashSet;

/// Name of the contact a merge produces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameParts {
    pub title: String,
    pub first: String,
    pub middle: String,
    pub last: String,
    pub suffix: String,
}

impl NameParts {
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_middle(mut self, middle: impl Into<String>) -> Self {
        self.middle = middle.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    fn fields(&self) -> [(&'static str, &str); 5] {
        [
            (props::TITLE, self.title.as_str()),
            (props::FIRST_NAME, self.first.as_str()),
            (props::MIDDLE_NAME, self.middle.as_str()),
            (props::LAST_NAME, self.last.as_str()),
            (props::SUFFIX, self.suffix.as_str()),
        ]
    }
}

pub(crate) const MERGE_PROGRESS_TITLE: &str = "Merging contacts";

/// Collapses several contacts into one new contact, keeping a snapshot of
/// each so the merge can be undone.
pub struct ContactMergeEngine<'a, S: Storage, C: SnapshotCodec> {
    graph: &'a ResourceGraph<S>,
    codec: &'a C,
    config: &'a EngineConfig,
    progress: Option<&'a dyn ProgressSink>,
}

impl<'a, S: Storage, C: SnapshotCodec> ContactMergeEngine<'a, S, C> {
    pub fn new(graph: &'a ResourceGraph<S>, codec: &'a C, config: &'a EngineConfig) -> Self {
        Self {
            graph,
            codec,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Merge `contacts` into a new contact named `name` and return it.
    /// The merged-away contacts are deleted.
    pub fn merge(&self, name: &NameParts, contacts: &[ResourceId]) -> Result<ResourceId> {
        self.check(name, contacts)?;

        let target = self.graph.create(ResourceKind::Contact)?.id;
        self.graph.begin_update(target)?;
        let result = self.merge_into(target, name, contacts);
        let reindexed = self.graph.end_update(target)?;
        result?;

        for source in contacts {
            delete_contact(self.graph, *source)?;
        }

        log::info!(
            "Merged {} contacts into {} (reindex requested: {})",
            contacts.len(),
            target,
            reindexed
        );
        Ok(target)
    }

    /// All argument checks, before anything is written.
    fn check(&self, name: &NameParts, contacts: &[ResourceId]) -> Result<()> {
        if name.first.trim().is_empty() && name.last.trim().is_empty() {
            return Err(ContactsError::precondition(
                "Merged contact needs a first or last name",
            ));
        }
        if contacts.len() < 2 {
            return Err(ContactsError::precondition(format!(
                "Merge needs at least two contacts, got {}",
                contacts.len()
            )));
        }
        let mut seen = HashSet::new();
        for id in contacts {
            if !seen.insert(*id) {
                return Err(ContactsError::precondition(format!(
                    "Contact {} is listed twice",
                    id
                )));
            }
            self.graph.require_kind(*id, &[ResourceKind::Contact])?;
        }
        Ok(())
    }

    fn merge_into(
        &self,
        target: ResourceId,
        name: &NameParts,
        contacts: &[ResourceId],
    ) -> Result<()> {
        for (key, value) in name.fields() {
            if !value.trim().is_empty() {
                self.graph.set_prop(target, key, value.trim())?;
            }
        }

        let holds_snapshot = &self.graph.schema().holds_snapshot;

        // Every image is taken before any source is relinked, so links
        // between the sources are captured as they were.
        let mut source_names = Vec::with_capacity(contacts.len());
        for source in contacts {
            let source_name = display_name(self.graph, *source)?;
            // A contact that is itself a merge result brings its keepers
            // along through the relink instead.
            if self.graph.outgoing(*source, holds_snapshot)?.is_empty() {
                let blob = self.codec.serialize(self.graph, *source)?;
                let keeper = self.graph.create(ResourceKind::SnapshotKeeper)?.id;
                self.graph.set_prop(keeper, props::SNAPSHOT, PropValue::Blob(blob))?;
                self.graph.set_prop(keeper, props::NAME, source_name.as_str())?;
                self.graph.add_link(target, keeper, holds_snapshot)?;
            }
            source_names.push(source_name);
        }

        let fields = FieldMerger::new(self.graph, &self.config.field_separator);
        let relinker = LinkRelinker::new(self.graph);

        for (done, (source, source_name)) in contacts.iter().zip(&source_names).enumerate() {
            fields.merge_fields(*source, target)?;
            relinker.relink(*source, target)?;

            if self.graph.require(*source)?.flag(props::MYSELF) {
                self.graph.delete_prop(*source, props::MYSELF)?;
                self.graph.set_prop(target, props::MYSELF, true)?;
            }

            if let Some(progress) = self.progress {
                progress.report(
                    percent(done + 1, contacts.len()),
                    MERGE_PROGRESS_TITLE,
                    source_name,
                );
            }
        }
        Ok(())
    }
}
