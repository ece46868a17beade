use crate::contact::names::{self, display_name, is_same_name, parse_display_name};
use crate::error::{ContactsError, Result};
use crate::graph::{full_name, ResourceGraph};
use crate::schema::{props, Role};
use crate::storage::{ResourceFilter, Storage};
use crate::types::{ResourceId, ResourceKind};

/// Canonical form of an e-mail address.
pub fn normalize_address(address: &str) -> Result<String> {
    let normalized = address.trim().to_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return Err(ContactsError::precondition(format!(
            "Not an e-mail address: {:?}",
            address
        )));
    }
    Ok(normalized)
}

pub fn find_account<S: Storage>(
    graph: &ResourceGraph<S>,
    address: &str,
) -> Result<Option<ResourceId>> {
    let normalized = normalize_address(address)?;
    Ok(graph
        .list(
            ResourceFilter::new()
                .of_kind(ResourceKind::EmailAccount)
                .with_text(props::EMAIL, &normalized)
                .with_limit(1),
        )?
        .first()
        .map(|a| a.id))
}

/// The account for `address`, created on first sight.
pub fn find_or_create_account<S: Storage>(
    graph: &ResourceGraph<S>,
    address: &str,
    personal: bool,
) -> Result<ResourceId> {
    if let Some(id) = find_account(graph, address)? {
        return Ok(id);
    }
    let id = graph.create(ResourceKind::EmailAccount)?.id;
    graph.set_prop(id, props::EMAIL, normalize_address(address)?)?;
    graph.set_prop(id, props::PERSONAL, personal)?;
    log::debug!("Created account {} for {}", id, address.trim());
    Ok(id)
}

/// Resolve the contact behind an address as seen with `display_name`.
///
/// Prefers a contact of that account whose name matches, then the only
/// contact of the account when no name is given, and creates one
/// otherwise.
pub fn find_or_create_contact<S: Storage>(
    graph: &ResourceGraph<S>,
    address: &str,
    display: &str,
) -> Result<ResourceId> {
    let schema = graph.schema();
    let account = find_or_create_account(graph, address, true)?;
    let display = names::strip_decorations(display.trim()).trim();
    let parsed = parse_display_name(display);

    let owners = graph.incoming(account, &schema.account)?;
    for owner in &owners {
        let resource = graph.require(*owner)?;
        if resource.kind != ResourceKind::Contact {
            continue;
        }
        let name = full_name(&resource);
        if display.is_empty() || name == display || is_same_name(display, &name) {
            return Ok(*owner);
        }
        if !parsed.is_empty()
            && resource.text(props::FIRST_NAME) == parsed.first
            && resource.text(props::LAST_NAME) == parsed.last
        {
            return Ok(*owner);
        }
    }

    let contact = graph.create(ResourceKind::Contact)?.id;
    graph.begin_update(contact)?;
    for (key, value) in [
        (props::FIRST_NAME, &parsed.first),
        (props::MIDDLE_NAME, &parsed.middle),
        (props::LAST_NAME, &parsed.last),
    ] {
        if !value.is_empty() {
            graph.set_prop(contact, key, value.as_str())?;
        }
    }
    let linked = graph.add_link(contact, account, &schema.account);
    graph.end_update(contact)?;
    linked?;

    log::debug!(
        "Created contact {} for {} ({} known owner(s) of the account)",
        contact,
        address.trim(),
        owners.len()
    );
    Ok(contact)
}

/// Record that `contact` took part in `item` in `role`, optionally through
/// `account` and under `display`.
///
/// A [`ContactName`](ResourceKind::ContactName) is attached only when the
/// display name differs from the contact's own.
pub fn link_correspondence<S: Storage>(
    graph: &ResourceGraph<S>,
    item: ResourceId,
    role: Role,
    contact: ResourceId,
    account: Option<ResourceId>,
    display: &str,
) -> Result<()> {
    let schema = graph.schema();
    let correspondence = graph.require_kind(item, &[ResourceKind::Correspondence])?;
    graph.require_kind(contact, &[ResourceKind::Contact, ResourceKind::MailingList])?;
    if let Some(account) = account {
        graph.require_kind(account, &[ResourceKind::EmailAccount])?;
    }

    graph.add_link(item, contact, schema.major(role))?;
    if let Some(account) = account {
        graph.add_link(item, account, schema.account_link(role))?;
        graph.add_link(contact, account, &schema.account)?;
    }

    let display = display.trim();
    if !display.is_empty() && !is_same_name(display, &display_name(graph, contact)?) {
        let name = names::find_or_create_name(graph, contact, display, account)?;
        graph.add_link(item, name, schema.name_link(role))?;
    }

    if let Some(date) = correspondence.date(props::DATE) {
        let last = graph.require(contact)?.date(props::LAST_CORRESPONDENCE);
        if last.map_or(true, |last| date > last) {
            graph.set_prop(contact, props::LAST_CORRESPONDENCE, date)?;
        }
    }
    Ok(())
}
