use crate::config::EngineConfig;
use crate::contact::delete_contact;
use crate::contact::names::{self, display_name, is_same_name};
use crate::error::{ContactsError, Result};
use crate::graph::ResourceGraph;
use crate::schema::{props, ContactSchema, Role};
use crate::services::{percent, ProgressSink};
use crate::snapshot::{LinkMaterializationPolicy, SnapshotCodec};
use crate::storage::Storage;
use crate::types::{LinkDirection, LinkType, ResourceId, ResourceKind};
use std::collections::HashSet;

const SPLIT_PROGRESS_TITLE: &str = "Splitting contact";

/// While a merged-away contact is restored, takes each of its
/// correspondence and name links back from the merged contact.
struct ReclaimFromMerged<'g, S: Storage> {
    graph: &'g ResourceGraph<S>,
    merged: ResourceId,
}

impl<S: Storage> LinkMaterializationPolicy for ReclaimFromMerged<'_, S> {
    fn admit(
        &mut self,
        _parent: ResourceId,
        peer: ResourceId,
        link_type: &LinkType,
        direction: LinkDirection,
    ) -> Result<bool> {
        let schema = self.graph.schema();
        if direction == LinkDirection::Incoming
            && (schema.is_major(link_type) || *link_type == schema.base_contact)
        {
            // Absent when the link was rearranged after the merge
            self.graph.remove_link(peer, self.merged, link_type)?;
        }
        Ok(true)
    }
}

/// Undoes a merge, fully or for some of the merged-away contacts.
pub struct ContactSplitEngine<'a, S: Storage, C: SnapshotCodec> {
    graph: &'a ResourceGraph<S>,
    codec: &'a C,
    config: &'a EngineConfig,
    progress: Option<&'a dyn ProgressSink>,
}

impl<'a, S: Storage, C: SnapshotCodec> ContactSplitEngine<'a, S, C> {
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

    fn schema(&self) -> &ContactSchema {
        self.graph.schema()
    }

    /// Restore the contacts held by `keepers` out of `contact`. When every
    /// keeper of `contact` is named this is a full split and `contact` is
    /// dissolved; otherwise `contact` stays and is returned last.
    pub fn split(&self, contact: ResourceId, keepers: &[ResourceId]) -> Result<Vec<ResourceId>> {
        let full = self.check(contact, keepers)?;

        self.graph.begin_update(contact)?;
        let result = self.split_scoped(contact, keepers, full);
        self.graph.end_update(contact)?;
        let mut restored = result?;

        for id in &restored {
            self.graph.request_reindex(*id);
        }

        if full && self.config.delete_emptied_contact {
            delete_contact(self.graph, contact)?;
        } else {
            restored.push(contact);
        }

        log::info!(
            "Split {} into {} contacts ({} split)",
            contact,
            restored.len(),
            if full { "full" } else { "partial" }
        );
        Ok(restored)
    }

    /// Validates arguments and tells whether the split is full.
    fn check(&self, contact: ResourceId, keepers: &[ResourceId]) -> Result<bool> {
        self.graph.require_kind(contact, &[ResourceKind::Contact])?;
        let held = self.graph.outgoing(contact, &self.schema().holds_snapshot)?;
        if held.is_empty() || keepers.is_empty() {
            return Err(ContactsError::precondition(format!(
                "Nothing to split on contact {}",
                contact
            )));
        }

        let mut seen = HashSet::new();
        for keeper in keepers {
            if !seen.insert(*keeper) {
                return Err(ContactsError::precondition(format!(
                    "Snapshot {} is listed twice",
                    keeper
                )));
            }
            self.graph
                .require_kind(*keeper, &[ResourceKind::SnapshotKeeper])?;
            if !held.contains(keeper) {
                return Err(ContactsError::precondition(format!(
                    "Snapshot {} does not belong to contact {}",
                    keeper, contact
                )));
            }
        }
        Ok(held.iter().all(|k| seen.contains(k)))
    }

    fn split_scoped(
        &self,
        contact: ResourceId,
        keepers: &[ResourceId],
        full: bool,
    ) -> Result<Vec<ResourceId>> {
        let restored = self.restore(contact, keepers)?;
        for r in &restored {
            self.revive_names(*r)?;
        }

        // The marker travels back with the snapshot it came from.
        let mut restored_myself = false;
        for r in &restored {
            restored_myself |= self.graph.require(*r)?.flag(props::MYSELF);
        }
        if restored_myself {
            self.graph.delete_prop(contact, props::MYSELF)?;
        }

        self.reclaim_by_account(contact, &restored)?;

        if full {
            let best = self.best_candidate(&restored)?;
            self.assign_leftovers(contact, &restored, best)?;
            self.rehome_names(contact, &restored, Some(best))?;
        } else {
            self.rehome_names(contact, &restored, None)?;
            self.cleanup(contact, &restored)?;
        }
        Ok(restored)
    }

    fn restore(&self, contact: ResourceId, keepers: &[ResourceId]) -> Result<Vec<ResourceId>> {
        let mut restored = Vec::with_capacity(keepers.len());
        for (done, keeper) in keepers.iter().enumerate() {
            let resource = self.graph.require(*keeper)?;
            let blob = resource
                .get(props::SNAPSHOT)
                .and_then(|v| v.as_blob())
                .ok_or_else(|| {
                    ContactsError::consistency(format!(
                        "Snapshot keeper {} holds no snapshot",
                        keeper
                    ))
                })?;

            let mut policy = ReclaimFromMerged {
                graph: self.graph,
                merged: contact,
            };
            let id = self.codec.deserialize(self.graph, blob, &mut policy)?;
            self.graph.delete(*keeper)?;
            restored.push(id);

            if let Some(progress) = self.progress {
                progress.report(
                    percent(done + 1, keepers.len()),
                    SPLIT_PROGRESS_TITLE,
                    resource.text(props::NAME),
                );
            }
        }
        Ok(restored)
    }

    /// A name record retired on merge came back with its snapshot. Put it
    /// on the correspondence of `restored` that carries the record it was
    /// retired into.
    fn revive_names(&self, restored: ResourceId) -> Result<()> {
        let schema = self.schema();
        for name in names::names_of(self.graph, restored)? {
            if !names::is_folded(self.graph, name)? {
                continue;
            }
            self.graph.delete_prop(name, props::FOLDED)?;
            let text = self.graph.text(name, props::NAME)?;
            let account = names::name_account(self.graph, name)?;

            for role in Role::ALL {
                let link = schema.name_link(role);
                for item in self.graph.incoming(restored, schema.major(role))? {
                    for other in self.graph.outgoing(item, link)? {
                        if other != name
                            && self.graph.text(other, props::NAME)? == text
                            && names::name_account(self.graph, other)? == account
                        {
                            self.graph.add_link(item, name, link)?;
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Correspondence that arrived after the merge goes to the restored
    /// contact owning the account it was exchanged through.
    fn reclaim_by_account(&self, contact: ResourceId, restored: &[ResourceId]) -> Result<()> {
        let schema = self.schema();
        let mut accounts = Vec::with_capacity(restored.len());
        for r in restored {
            accounts.push((*r, self.graph.outgoing(*r, &schema.account)?));
        }

        for role in Role::ALL {
            let major = schema.major(role);
            for item in self.graph.incoming(contact, major)? {
                let used = self.graph.outgoing(item, schema.account_link(role))?;
                let owner = accounts
                    .iter()
                    .find(|(_, owned)| owned.iter().any(|a| used.contains(a)))
                    .map(|(r, _)| *r);
                if let Some(owner) = owner {
                    self.graph.remove_link(item, contact, major)?;
                    self.graph.add_link(item, owner, major)?;
                }
            }
        }
        Ok(())
    }

    /// Restored contact with the most correspondence; ties go to the first.
    fn best_candidate(&self, restored: &[ResourceId]) -> Result<ResourceId> {
        let mut best: Option<(ResourceId, usize)> = None;
        for r in restored {
            let mut count = 0;
            for role in Role::ALL {
                count += self
                    .graph
                    .link_count(*r, self.schema().major(role), LinkDirection::Incoming)?;
            }
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((*r, count));
            }
        }
        best.map(|(r, _)| r)
            .ok_or_else(|| ContactsError::consistency("Full split restored no contacts"))
    }

    /// Whatever no snapshot accounted for goes to `best`.
    fn assign_leftovers(
        &self,
        contact: ResourceId,
        restored: &[ResourceId],
        best: ResourceId,
    ) -> Result<()> {
        let schema = self.schema();

        let mut covered = HashSet::new();
        for r in restored {
            covered.extend(self.graph.outgoing(*r, &schema.category)?);
        }
        for category in self.graph.outgoing(contact, &schema.category)? {
            if !covered.contains(&category) {
                self.graph.add_link(best, category, &schema.category)?;
            }
        }

        for role in Role::ALL {
            let major = schema.major(role);
            for item in self.graph.incoming(contact, major)? {
                self.graph.remove_link(item, contact, major)?;
                self.graph.add_link(item, best, major)?;
            }
        }

        let mut owned = HashSet::new();
        for r in restored {
            owned.extend(self.graph.outgoing(*r, &schema.account)?);
        }
        for account in self.graph.outgoing(contact, &schema.account)? {
            if !owned.contains(&account) {
                self.graph.add_link(best, account, &schema.account)?;
            }
        }
        Ok(())
    }

    /// Name records still bound to `contact` follow their correspondence to
    /// whichever restored contact now holds it. Records that merely repeat
    /// the new owner's name are dropped. Unowned records go to `fallback`,
    /// or stay when there is none.
    fn rehome_names(
        &self,
        contact: ResourceId,
        restored: &[ResourceId],
        fallback: Option<ResourceId>,
    ) -> Result<()> {
        let schema = self.schema();
        for name in names::names_of(self.graph, contact)? {
            let mut owner = None;
            let mut still_here = false;
            for role in Role::ALL {
                for item in self.graph.incoming(name, schema.name_link(role))? {
                    let holders = self.graph.outgoing(item, schema.major(role))?;
                    if holders.contains(&contact) {
                        still_here = true;
                    } else if owner.is_none() {
                        owner = restored.iter().copied().find(|r| holders.contains(r));
                    }
                }
            }
            if still_here && fallback.is_none() {
                continue;
            }

            let Some(owner) = owner.or(fallback) else {
                continue;
            };
            let text = self.graph.text(name, props::NAME)?;
            if is_same_name(&text, &display_name(self.graph, owner)?)
                || !names::is_referenced(self.graph, name)?
            {
                self.graph.delete(name)?;
                continue;
            }
            self.graph.remove_link(name, contact, &schema.base_contact)?;
            let account = names::name_account(self.graph, name)?;
            match names::matching_names(self.graph, owner, &text, account)?.first() {
                Some(survivor) => names::fold_name(self.graph, name, *survivor)?,
                None => {
                    self.graph.add_link(name, owner, &schema.base_contact)?;
                }
            }
        }
        Ok(())
    }

    /// Tidy the contact that survives a partial split.
    fn cleanup(&self, contact: ResourceId, restored: &[ResourceId]) -> Result<()> {
        let schema = self.schema();

        // Retired records wait for the keepers still held here
        let display = display_name(self.graph, contact)?;
        for name in names::names_of(self.graph, contact)? {
            if names::is_folded(self.graph, name)? {
                continue;
            }
            let text = self.graph.text(name, props::NAME)?;
            if is_same_name(&text, &display) {
                self.graph.delete(name)?;
            }
        }

        let mut restored_accounts = HashSet::new();
        for r in restored {
            restored_accounts.extend(self.graph.outgoing(*r, &schema.account)?);
        }
        for account in self.graph.outgoing(contact, &schema.account)? {
            if restored_accounts.contains(&account) && !self.still_used(contact, account)? {
                self.graph.remove_link(contact, account, &schema.account)?;
            }
        }

        for name in names::names_of(self.graph, contact)? {
            if !names::is_folded(self.graph, name)? && !names::is_referenced(self.graph, name)? {
                self.graph.delete(name)?;
            }
        }
        Ok(())
    }

    /// True when some correspondence of `contact` went through `account`.
    fn still_used(&self, contact: ResourceId, account: ResourceId) -> Result<bool> {
        let schema = self.schema();
        for role in Role::ALL {
            for item in self.graph.incoming(contact, schema.major(role))? {
                if self
                    .graph
                    .outgoing(item, schema.account_link(role))?
                    .contains(&account)
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
