//! Display names and per-correspondence [`ContactName`] records.
//!
//! [`ContactName`]: crate::types::ResourceKind::ContactName

use crate::error::{ContactsError, Result};
use crate::graph::{full_name, ResourceGraph};
use crate::schema::{props, Role};
use crate::storage::Storage;
use crate::types::{ResourceId, ResourceKind};

/// Name parts recovered from a free-form display name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedName {
    pub first: String,
    pub middle: String,
    pub last: String,
}

impl ParsedName {
    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.middle.is_empty() && self.last.is_empty()
    }
}

/// Split a display name such as `"Smith, John"` or `John Q Smith` into
/// first/middle/last. The last word is the last name unless the
/// `Last, First` form is used.
pub fn parse_display_name(raw: &str) -> ParsedName {
    let cleaned = strip_decorations(raw.trim()).trim();
    if cleaned.is_empty() {
        return ParsedName::default();
    }

    if let Some((last, rest)) = cleaned.split_once(',') {
        let mut words = rest.split_whitespace();
        let first = words.next().unwrap_or("").to_string();
        return ParsedName {
            first,
            middle: words.collect::<Vec<_>>().join(" "),
            last: last.trim().to_string(),
        };
    }

    let words: Vec<&str> = cleaned.split_whitespace().collect();
    match words.as_slice() {
        [] => ParsedName::default(),
        [only] => ParsedName {
            first: only.to_string(),
            ..Default::default()
        },
        [first, middle @ .., last] => ParsedName {
            first: first.to_string(),
            middle: middle.join(" "),
            last: last.to_string(),
        },
    }
}

/// Remove one leading newline and one layer of surrounding quotes.
pub fn strip_decorations(text: &str) -> &str {
    let text = text.strip_prefix('\n').unwrap_or(text);
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// True when `text` says nothing beyond `display`.
pub fn is_same_name(text: &str, display: &str) -> bool {
    !display.is_empty() && (text == display || strip_decorations(text) == display)
}

/// How a contact is shown: its full name, or its first e-mail address when
/// it has no name parts.
pub fn display_name<S: Storage>(graph: &ResourceGraph<S>, contact: ResourceId) -> Result<String> {
    let resource = graph.require(contact)?;
    let name = match resource.kind {
        ResourceKind::Contact => full_name(&resource),
        _ => resource.text(props::NAME).to_string(),
    };
    if !name.is_empty() {
        return Ok(name);
    }
    for account in graph.outgoing(contact, &graph.schema().account)? {
        let email = graph.text(account, props::EMAIL)?;
        if !email.is_empty() {
            return Ok(email);
        }
    }
    Ok(String::new())
}

/// The contact a name record is bound to.
pub fn base_contact<S: Storage>(graph: &ResourceGraph<S>, name: ResourceId) -> Result<ResourceId> {
    graph
        .outgoing(name, &graph.schema().base_contact)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            ContactsError::consistency(format!("Contact name {} has no base contact", name))
        })
}

/// Account a name record was seen with, if any.
pub fn name_account<S: Storage>(
    graph: &ResourceGraph<S>,
    name: ResourceId,
) -> Result<Option<ResourceId>> {
    Ok(graph
        .outgoing(name, &graph.schema().name_account)?
        .into_iter()
        .next())
}

/// Name records bound to `contact`.
pub fn names_of<S: Storage>(
    graph: &ResourceGraph<S>,
    contact: ResourceId,
) -> Result<Vec<ResourceId>> {
    graph.incoming(contact, &graph.schema().base_contact)
}

/// True when any correspondence still refers to the name record.
pub fn is_referenced<S: Storage>(graph: &ResourceGraph<S>, name: ResourceId) -> Result<bool> {
    for role in Role::ALL {
        if !graph.incoming(name, graph.schema().name_link(role))?.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Live name records on `contact` with exactly this text and account.
pub fn matching_names<S: Storage>(
    graph: &ResourceGraph<S>,
    contact: ResourceId,
    text: &str,
    account: Option<ResourceId>,
) -> Result<Vec<ResourceId>> {
    let candidates = match account {
        Some(account) => graph.incoming(account, &graph.schema().name_account)?,
        None => names_of(graph, contact)?,
    };

    let mut found = Vec::new();
    for name in candidates {
        let Some(record) = graph.get(name)? else {
            continue;
        };
        if record.text(props::NAME) != text || record.flag(props::FOLDED) {
            continue;
        }
        if name_account(graph, name)? != account {
            continue;
        }
        if graph.outgoing(name, &graph.schema().base_contact)?.first() == Some(&contact) {
            found.push(name);
        }
    }
    Ok(found)
}

/// Reuse the name record for (`contact`, `text`, `account`) or create it.
pub fn find_or_create_name<S: Storage>(
    graph: &ResourceGraph<S>,
    contact: ResourceId,
    text: &str,
    account: Option<ResourceId>,
) -> Result<ResourceId> {
    let existing = matching_names(graph, contact, text, account)?;
    if existing.len() > 1 {
        log::warn!(
            "{} duplicate names '{}' on contact {}, using the first",
            existing.len(),
            text,
            contact
        );
    }
    if let Some(name) = existing.first() {
        return Ok(*name);
    }

    let name = graph.create(ResourceKind::ContactName)?.id;
    graph.set_prop(name, props::NAME, text)?;
    graph.add_link(name, contact, &graph.schema().base_contact)?;
    if let Some(account) = account {
        graph.add_link(name, account, &graph.schema().name_account)?;
    }
    Ok(name)
}

/// Point every correspondence that uses `duplicate` at `survivor` instead,
/// then delete `duplicate`.
pub fn fold_name<S: Storage>(
    graph: &ResourceGraph<S>,
    duplicate: ResourceId,
    survivor: ResourceId,
) -> Result<()> {
    for role in Role::ALL {
        let link = graph.schema().name_link(role).clone();
        for item in graph.incoming(duplicate, &link)? {
            graph.add_link(item, survivor, &link)?;
        }
    }
    graph.delete(duplicate)
}

/// Point every correspondence that uses `duplicate` at `survivor`, but keep
/// `duplicate` as an unreferenced record marked folded. A snapshot taken
/// before the fold still refers to it, so a split can take it back.
pub fn retire_name<S: Storage>(
    graph: &ResourceGraph<S>,
    duplicate: ResourceId,
    survivor: ResourceId,
) -> Result<()> {
    for role in Role::ALL {
        let link = graph.schema().name_link(role).clone();
        for item in graph.incoming(duplicate, &link)? {
            graph.add_link(item, survivor, &link)?;
            graph.remove_link(item, duplicate, &link)?;
        }
    }
    graph.set_prop(duplicate, props::FOLDED, true)
}

/// True for a name record retired into another one on merge.
pub fn is_folded<S: Storage>(graph: &ResourceGraph<S>, name: ResourceId) -> Result<bool> {
    Ok(graph.get(name)?.is_some_and(|r| r.flag(props::FOLDED)))
}
