use crate::contact::names;
use crate::error::Result;
use crate::graph::{full_name, ResourceGraph};
use crate::schema::props;
use crate::storage::{ResourceFilter, Storage};
use crate::types::ResourceKind;

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub orphan_names_removed: usize,
    pub hung_contacts_removed: usize,
}

/// Delete name records that lost their contact or that no correspondence
/// uses any more. Records retired on merge stay while their contact still
/// holds snapshots.
pub fn prune_orphan_names<S: Storage>(graph: &ResourceGraph<S>) -> Result<usize> {
    let mut removed = 0;
    let schema = graph.schema();
    for name in graph.list(ResourceFilter::new().of_kind(ResourceKind::ContactName))? {
        let base = graph.outgoing(name.id, &schema.base_contact)?;
        let Some(contact) = base.first() else {
            graph.delete(name.id)?;
            removed += 1;
            continue;
        };
        // A snapshot on the contact may still take it back
        let retired = name.flag(props::FOLDED);
        if retired && !graph.outgoing(*contact, &schema.holds_snapshot)?.is_empty() {
            continue;
        }
        if !names::is_referenced(graph, name.id)? {
            graph.delete(name.id)?;
            removed += 1;
        }
    }
    if removed > 0 {
        log::info!("Pruned {} orphan contact names", removed);
    }
    Ok(removed)
}

/// Delete nameless contacts nothing links to, except the user's own.
pub fn prune_hung_contacts<S: Storage>(graph: &ResourceGraph<S>) -> Result<usize> {
    let mut removed = 0;
    for contact in graph.list(ResourceFilter::new().of_kind(ResourceKind::Contact))? {
        if contact.flag(props::MYSELF) || !full_name(&contact).is_empty() {
            continue;
        }
        if graph.is_isolated(contact.id)? {
            graph.delete(contact.id)?;
            removed += 1;
        }
    }
    if removed > 0 {
        log::info!("Pruned {} hung contacts", removed);
    }
    Ok(removed)
}

pub fn run_maintenance<S: Storage>(graph: &ResourceGraph<S>) -> Result<MaintenanceReport> {
    Ok(MaintenanceReport {
        orphan_names_removed: prune_orphan_names(graph)?,
        hung_contacts_removed: prune_hung_contacts(graph)?,
    })
}
