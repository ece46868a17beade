//! Registered property names and link types.
//!
//! A [`ContactSchema`] is built once and passed by reference into every
//! operation. It answers the classification questions the merge and split
//! engines ask: which properties are native contact fields, which link types
//! are major (from/to/cc), and which are the parallel name and account links.

use crate::error::{ContactsError, Result};
use crate::types::LinkType;
use std::collections::HashMap;

/// Property names.
pub mod props {
    // Native contact fields
    pub const TITLE: &str = "title";
    pub const FIRST_NAME: &str = "first_name";
    pub const MIDDLE_NAME: &str = "middle_name";
    pub const LAST_NAME: &str = "last_name";
    pub const SUFFIX: &str = "suffix";
    pub const COMPANY: &str = "company";
    pub const JOB_TITLE: &str = "job_title";
    pub const ADDRESS: &str = "address";
    pub const DESCRIPTION: &str = "description";
    pub const HOME_PAGE: &str = "home_page";
    pub const BIRTHDAY: &str = "birthday";
    pub const LAST_CORRESPONDENCE: &str = "last_correspondence";
    pub const MYSELF: &str = "myself";
    pub const IMPORTED: &str = "imported";

    // Other kinds
    pub const EMAIL: &str = "email";
    pub const PERSONAL: &str = "personal";
    pub const NAME: &str = "name";
    pub const FOLDED: &str = "folded";
    pub const PHONE_NAME: &str = "phone_name";
    pub const PHONE_NUMBER: &str = "phone_number";
    pub const SNAPSHOT: &str = "snapshot";
    pub const SUBJECT: &str = "subject";
    pub const DATE: &str = "date";
}

/// Properties and links that belong to the contact itself and are merged
/// field by field instead of being passed through.
pub const NATIVE_CONTACT_FIELDS: &[&str] = &[
    props::TITLE,
    props::FIRST_NAME,
    props::MIDDLE_NAME,
    props::LAST_NAME,
    props::SUFFIX,
    props::COMPANY,
    props::JOB_TITLE,
    props::ADDRESS,
    props::DESCRIPTION,
    props::HOME_PAGE,
    props::BIRTHDAY,
    props::LAST_CORRESPONDENCE,
    props::MYSELF,
    props::IMPORTED,
];

/// Participant role of a contact on a piece of correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    From,
    To,
    Cc,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::From, Role::To, Role::Cc];
}

/// Store-level behaviour of a link type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSpec {
    pub directed: bool,
    /// Maximum number of links of this type leaving one resource.
    pub max_outgoing: Option<usize>,
}

impl LinkSpec {
    pub fn directed() -> Self {
        Self {
            directed: true,
            max_outgoing: None,
        }
    }

    pub fn undirected() -> Self {
        Self {
            directed: false,
            max_outgoing: None,
        }
    }

    pub fn at_most(mut self, max: usize) -> Self {
        self.max_outgoing = Some(max);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ContactSchema {
    majors: [LinkType; 3],
    names: [LinkType; 3],
    accounts: [LinkType; 3],
    pub base_contact: LinkType,
    pub name_account: LinkType,
    pub account: LinkType,
    pub category: LinkType,
    pub phone: LinkType,
    pub holds_snapshot: LinkType,
    pub related: LinkType,
    specs: HashMap<LinkType, LinkSpec>,
}

fn lt(name: &str) -> LinkType {
    // Only called with the literals below.
    LinkType::new(name).unwrap_or_else(|e| panic!("built-in link type: {}", e))
}

impl Default for ContactSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactSchema {
    pub fn new() -> Self {
        let mut schema = ContactSchema {
            majors: [lt("from"), lt("to"), lt("cc")],
            names: [lt("name_from"), lt("name_to"), lt("name_cc")],
            accounts: [lt("account_from"), lt("account_to"), lt("account_cc")],
            base_contact: lt("base_contact"),
            name_account: lt("name_account"),
            account: lt("account"),
            category: lt("category"),
            phone: lt("phone"),
            holds_snapshot: lt("holds_snapshot"),
            related: lt("related"),
            specs: HashMap::new(),
        };

        // correspondence -> contact; one sender per item
        let majors = schema.majors.clone();
        schema.specs.insert(majors[0].clone(), LinkSpec::directed().at_most(1));
        schema.specs.insert(majors[1].clone(), LinkSpec::directed());
        schema.specs.insert(majors[2].clone(), LinkSpec::directed());
        // correspondence -> contact name / account
        for t in schema.names.clone().into_iter().chain(schema.accounts.clone()) {
            schema.specs.insert(t, LinkSpec::directed());
        }
        // contact name -> contact, contact name -> account
        schema
            .specs
            .insert(schema.base_contact.clone(), LinkSpec::directed().at_most(1));
        schema
            .specs
            .insert(schema.name_account.clone(), LinkSpec::directed().at_most(1));
        // contact -> account / category / phone / keeper
        for t in [
            schema.account.clone(),
            schema.category.clone(),
            schema.phone.clone(),
            schema.holds_snapshot.clone(),
        ] {
            schema.specs.insert(t, LinkSpec::directed());
        }
        schema
            .specs
            .insert(schema.related.clone(), LinkSpec::undirected());
        schema
    }

    /// Register an application-defined link type. Such links are passed
    /// through to the survivor when contacts merge.
    pub fn register_link(&mut self, name: &str, spec: LinkSpec) -> Result<LinkType> {
        let link_type = LinkType::new(name).map_err(ContactsError::Validation)?;
        if let Some(existing) = self.specs.get(&link_type) {
            if *existing != spec {
                return Err(ContactsError::Validation(format!(
                    "Link type '{}' is already registered with a different spec",
                    name
                )));
            }
        }
        self.specs.insert(link_type.clone(), spec);
        Ok(link_type)
    }

    pub fn link_spec(&self, link_type: &LinkType) -> Option<&LinkSpec> {
        self.specs.get(link_type)
    }

    pub fn is_directed(&self, link_type: &LinkType) -> bool {
        self.specs.get(link_type).map(|s| s.directed).unwrap_or(true)
    }

    pub fn major(&self, role: Role) -> &LinkType {
        &self.majors[role as usize]
    }

    pub fn name_link(&self, role: Role) -> &LinkType {
        &self.names[role as usize]
    }

    pub fn account_link(&self, role: Role) -> &LinkType {
        &self.accounts[role as usize]
    }

    pub fn major_links(&self) -> &[LinkType; 3] {
        &self.majors
    }

    pub fn major_role(&self, link_type: &LinkType) -> Option<Role> {
        Role::ALL.into_iter().find(|r| self.major(*r) == link_type)
    }

    pub fn is_major(&self, link_type: &LinkType) -> bool {
        self.major_role(link_type).is_some()
    }

    pub fn is_native_field(&self, key: &str) -> bool {
        NATIVE_CONTACT_FIELDS.contains(&key)
    }

    /// Outgoing contact links that are merged field-wise, not passed through.
    pub fn is_native_link(&self, link_type: &LinkType) -> bool {
        *link_type == self.phone
    }
}
