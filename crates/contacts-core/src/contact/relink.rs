use crate::contact::names::{self, display_name};
use crate::error::{ContactsError, Result};
use crate::graph::ResourceGraph;
use crate::schema::{props, Role};
use crate::storage::Storage;
use crate::types::{LinkDirection, LinkType, ResourceId, ResourceKind};

/// What one relink moved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelinkStats {
    pub props_moved: usize,
    pub links_moved: usize,
    pub self_loops_dropped: usize,
    pub names_rebound: usize,
    pub names_folded: usize,
    pub names_created: usize,
}

/// Moves everything that is not a native contact field from one contact to
/// another, keeping per-correspondence names correct.
pub struct LinkRelinker<'a, S: Storage> {
    graph: &'a ResourceGraph<S>,
}

impl<'a, S: Storage> LinkRelinker<'a, S> {
    pub fn new(graph: &'a ResourceGraph<S>) -> Self {
        Self { graph }
    }

    pub fn relink(&self, source: ResourceId, target: ResourceId) -> Result<RelinkStats> {
        self.graph.require_kind(source, &[ResourceKind::Contact])?;
        self.graph
            .require_kind(target, &[ResourceKind::Contact, ResourceKind::MailingList])?;
        if source == target {
            return Err(ContactsError::precondition("Cannot relink a contact onto itself"));
        }

        self.graph.begin_update(source)?;
        self.graph.begin_update(target)?;
        let result = self.relink_scoped(source, target);
        self.graph.end_update(target)?;
        self.graph.end_update(source)?;

        let stats = result?;
        log::debug!("Relinked {} -> {}: {:?}", source, target, stats);
        Ok(stats)
    }

    fn relink_scoped(&self, source: ResourceId, target: ResourceId) -> Result<RelinkStats> {
        let schema = self.graph.schema();
        let mut stats = RelinkStats::default();

        // Captured before pass-through moves the account links away.
        let source_accounts = self.graph.outgoing(source, &schema.account)?;
        let source_name = display_name(self.graph, source)?;

        self.move_properties(source, target, &mut stats)?;
        self.move_outgoing_links(source, target, &mut stats)?;
        self.rebind_names(source, target, &mut stats)?;
        self.move_incoming_links(source, target, &source_accounts, &source_name, &mut stats)?;
        Ok(stats)
    }

    fn move_properties(
        &self,
        source: ResourceId,
        target: ResourceId,
        stats: &mut RelinkStats,
    ) -> Result<()> {
        let resource = self.graph.require(source)?;
        for (key, value) in resource.props {
            if self.graph.schema().is_native_field(&key) {
                continue;
            }
            self.graph.delete_prop(source, &key)?;
            self.graph.set_prop(target, &key, value)?;
            stats.props_moved += 1;
        }
        Ok(())
    }

    fn move_outgoing_links(
        &self,
        source: ResourceId,
        target: ResourceId,
        stats: &mut RelinkStats,
    ) -> Result<()> {
        let schema = self.graph.schema();
        for (link_type, direction) in self.graph.link_types(source)? {
            if direction != LinkDirection::Outgoing || schema.is_native_link(&link_type) {
                continue;
            }
            for peer in self.graph.outgoing(source, &link_type)? {
                self.graph.remove_link(source, peer, &link_type)?;
                if peer == target {
                    stats.self_loops_dropped += 1;
                    continue;
                }
                if self.add_or_warn(target, peer, &link_type)? {
                    stats.links_moved += 1;
                }
            }
        }
        Ok(())
    }

    /// Name records of `source` move to `target`. One that repeats a live
    /// record of `target` (same text and account) is retired into it.
    fn rebind_names(
        &self,
        source: ResourceId,
        target: ResourceId,
        stats: &mut RelinkStats,
    ) -> Result<()> {
        let base = self.graph.schema().base_contact.clone();
        for name in names::names_of(self.graph, source)? {
            self.graph.remove_link(name, source, &base)?;

            let text = self.graph.text(name, props::NAME)?;
            let account = names::name_account(self.graph, name)?;
            let duplicates = names::matching_names(self.graph, target, &text, account)?;

            match duplicates.first() {
                Some(survivor) => {
                    if duplicates.len() > 1 {
                        log::warn!(
                            "{} names '{}' already on {}, folding into {}",
                            duplicates.len(),
                            text,
                            target,
                            survivor
                        );
                    }
                    names::retire_name(self.graph, name, *survivor)?;
                    self.graph.add_link(name, target, &base)?;
                    stats.names_folded += 1;
                }
                None => {
                    self.graph.add_link(name, target, &base)?;
                    stats.names_rebound += 1;
                }
            }
        }
        Ok(())
    }

    fn move_incoming_links(
        &self,
        source: ResourceId,
        target: ResourceId,
        source_accounts: &[ResourceId],
        source_name: &str,
        stats: &mut RelinkStats,
    ) -> Result<()> {
        let schema = self.graph.schema();
        for (link_type, direction) in self.graph.link_types(source)? {
            if direction != LinkDirection::Incoming {
                continue;
            }
            for item in self.graph.incoming(source, &link_type)? {
                if item == target {
                    self.graph.remove_link(item, source, &link_type)?;
                    stats.self_loops_dropped += 1;
                    continue;
                }
                // Target already takes part in this role; its own name stands.
                if self.graph.has_link(item, target, &link_type)? {
                    self.graph.remove_link(item, source, &link_type)?;
                    continue;
                }

                if let Some(role) = schema.major_role(&link_type) {
                    if !source_name.is_empty() && !self.has_name_on(item, role, target)? {
                        let account = self.shared_account(item, role, source_accounts)?;
                        let name =
                            names::find_or_create_name(self.graph, target, source_name, account)?;
                        if self.graph.add_link(item, name, schema.name_link(role))? {
                            stats.names_created += 1;
                        }
                    }
                }

                // Free the slot first; "from" allows only one.
                self.graph.remove_link(item, source, &link_type)?;
                if self.add_or_warn(item, target, &link_type)? {
                    stats.links_moved += 1;
                }
            }
        }
        Ok(())
    }

    /// True when `item` already names a participant bound to `contact` in `role`.
    fn has_name_on(&self, item: ResourceId, role: Role, contact: ResourceId) -> Result<bool> {
        let base = &self.graph.schema().base_contact;
        for name in self.graph.outgoing(item, self.graph.schema().name_link(role))? {
            if self.graph.outgoing(name, base)?.contains(&contact) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// First account of the source that `item` was exchanged through.
    fn shared_account(
        &self,
        item: ResourceId,
        role: Role,
        source_accounts: &[ResourceId],
    ) -> Result<Option<ResourceId>> {
        let used = self.graph.outgoing(item, self.graph.schema().account_link(role))?;
        Ok(source_accounts.iter().copied().find(|a| used.contains(a)))
    }

    fn add_or_warn(&self, from: ResourceId, to: ResourceId, link_type: &LinkType) -> Result<bool> {
        match self.graph.add_link(from, to, link_type) {
            Ok(added) => Ok(added),
            Err(ContactsError::LinkRestriction { max, .. }) => {
                log::warn!(
                    "Dropping '{}' link {} -> {}: at most {} allowed",
                    link_type,
                    from,
                    to,
                    max
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
