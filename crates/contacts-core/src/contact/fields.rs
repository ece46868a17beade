use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::schema::props;
use crate::storage::Storage;
use crate::types::{Resource, ResourceId, ResourceKind};
use chrono::{DateTime, Utc};

/// Free-text fields that accumulate distinct values on merge.
const ACCUMULATED_FIELDS: [&str; 4] = [
    props::ADDRESS,
    props::COMPANY,
    props::JOB_TITLE,
    props::DESCRIPTION,
];

/// Folds one contact's native fields into another.
pub struct FieldMerger<'a, S: Storage> {
    graph: &'a ResourceGraph<S>,
    separator: &'a str,
}

impl<'a, S: Storage> FieldMerger<'a, S> {
    pub fn new(graph: &'a ResourceGraph<S>, separator: &'a str) -> Self {
        Self { graph, separator }
    }

    /// Merge `source`'s native fields and phones into `target`. Only
    /// `target` is written.
    pub fn merge_fields(&self, source: ResourceId, target: ResourceId) -> Result<()> {
        let src = self.graph.require_kind(source, &[ResourceKind::Contact])?;
        let tgt = self
            .graph
            .require_kind(target, &[ResourceKind::Contact, ResourceKind::MailingList])?;

        self.graph.begin_update(target)?;
        let result = self.merge_into(&src, &tgt);
        self.graph.end_update(target)?;
        result
    }

    fn merge_into(&self, src: &Resource, tgt: &Resource) -> Result<()> {
        for key in ACCUMULATED_FIELDS {
            if let Some(merged) = merge_text(tgt.text(key), src.text(key), self.separator) {
                self.graph.set_prop(tgt.id, key, merged)?;
            }
        }

        let src_date = src.date(props::LAST_CORRESPONDENCE);
        let tgt_date = tgt.date(props::LAST_CORRESPONDENCE);

        let src_home = src.text(props::HOME_PAGE);
        let replace_home = tgt.text(props::HOME_PAGE).is_empty() || is_later(src_date, tgt_date);
        if !src_home.is_empty() && replace_home {
            self.graph.set_prop(tgt.id, props::HOME_PAGE, src_home)?;
        }

        if let Some(date) = src_date {
            if is_later(src_date, tgt_date) {
                self.graph.set_prop(tgt.id, props::LAST_CORRESPONDENCE, date)?;
            }
        }

        self.merge_phones(src.id, tgt.id)
    }

    fn merge_phones(&self, source: ResourceId, target: ResourceId) -> Result<()> {
        let target_phones = self.phones(target)?;
        let mut added: Vec<PhoneEntry> = Vec::new();

        for phone in self.phones(source)? {
            let existing: Vec<&PhoneEntry> = target_phones.iter().chain(added.iter()).collect();

            let name = match existing.iter().find(|p| p.name == phone.name) {
                None => phone.name.clone(),
                Some(same_name) => {
                    let digits = normalize_phone(&phone.number);
                    if normalize_phone(&same_name.number) == digits {
                        continue;
                    }
                    // Already carried under a suffixed variant of the name
                    if existing.iter().any(|p| {
                        is_variant_of(&p.name, &phone.name) && normalize_phone(&p.number) == digits
                    }) {
                        continue;
                    }
                    next_free_name(&phone.name, existing.iter().map(|p| p.name.as_str()))
                }
            };

            let id = self.graph.create(ResourceKind::Phone)?.id;
            self.graph.set_prop(id, props::PHONE_NAME, name.as_str())?;
            self.graph.set_prop(id, props::PHONE_NUMBER, phone.number.as_str())?;
            self.graph.add_link(target, id, &self.graph.schema().phone)?;
            added.push(PhoneEntry {
                name,
                number: phone.number,
            });
        }
        Ok(())
    }

    fn phones(&self, contact: ResourceId) -> Result<Vec<PhoneEntry>> {
        let mut phones = Vec::new();
        for id in self.graph.outgoing(contact, &self.graph.schema().phone)? {
            if let Some(phone) = self.graph.get(id)? {
                phones.push(PhoneEntry {
                    name: phone.text(props::PHONE_NAME).to_string(),
                    number: phone.text(props::PHONE_NUMBER).to_string(),
                });
            }
        }
        Ok(phones)
    }
}

#[derive(Debug, Clone)]
struct PhoneEntry {
    name: String,
    number: String,
}

/// New value for an accumulated text field, or `None` to leave it alone.
pub fn merge_text(target: &str, source: &str, separator: &str) -> Option<String> {
    let source = source.trim();
    if source.is_empty() {
        return None;
    }
    if target.trim().is_empty() {
        return Some(source.to_string());
    }
    if target.split(';').any(|segment| segment.contains(source)) {
        return None;
    }
    Some(format!("{}{}{}", target, separator, source))
}

/// Digits only.
pub fn normalize_phone(number: &str) -> String {
    number.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn is_later(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a > b,
        (Some(_), None) => true,
        _ => false,
    }
}

fn is_variant_of(candidate: &str, base: &str) -> bool {
    candidate == base
        || candidate
            .strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(')'))
            .is_some_and(|n| n.parse::<u32>().is_ok())
}

fn next_free_name<'n>(base: &str, taken: impl Iterator<Item = &'n str>) -> String {
    let taken: Vec<&str> = taken.collect();
    (2u32..)
        .map(|n| format!("{}({})", base, n))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}
