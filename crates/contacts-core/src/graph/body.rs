use crate::schema::props;
use crate::types::{Resource, ResourceKind};

/// Name parts of a contact joined the way they are displayed.
pub fn full_name(contact: &Resource) -> String {
    [
        props::TITLE,
        props::FIRST_NAME,
        props::MIDDLE_NAME,
        props::LAST_NAME,
        props::SUFFIX,
    ]
    .iter()
    .map(|key| contact.text(key).trim())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Text the search index holds for a resource. Re-indexing is requested
/// whenever this changes across an update scope.
pub fn searchable_body(resource: &Resource) -> String {
    let keys: &[&str] = match resource.kind {
        ResourceKind::Contact => &[
            props::COMPANY,
            props::JOB_TITLE,
            props::ADDRESS,
            props::DESCRIPTION,
        ],
        ResourceKind::EmailAccount => &[props::EMAIL],
        ResourceKind::ContactName | ResourceKind::Category | ResourceKind::MailingList => {
            &[props::NAME]
        }
        ResourceKind::Correspondence => &[props::SUBJECT],
        ResourceKind::Phone | ResourceKind::SnapshotKeeper => &[],
    };

    let mut parts = Vec::new();
    if resource.kind == ResourceKind::Contact {
        parts.push(full_name(resource));
    }
    parts.extend(keys.iter().map(|k| resource.text(k).to_string()));
    parts.retain(|p| !p.is_empty());
    parts.join("\n")
}
