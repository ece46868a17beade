use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Type alias for resource identifiers
pub type ResourceId = Uuid;

/// Type alias for link identifiers
pub type LinkId = Uuid;

/// A typed node in the personal-information graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    /// Unique identifier. UUIDv7 for time-sortability.
    pub id: ResourceId,

    /// What this node is. Checked once at the store boundary.
    pub kind: ResourceKind,

    /// Scalar properties keyed by property name.
    pub props: BTreeMap<String, PropValue>,

    /// When this resource was created.
    pub created_at: DateTime<Utc>,

    /// Last time any property was modified.
    pub updated_at: DateTime<Utc>,
}

/// Closed set of node kinds the contact engine understands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// A person. Carries the identity fields.
    Contact,

    /// An e-mail address. Unique by address string.
    EmailAccount,

    /// How a contact was addressed on particular correspondence.
    /// Bound to exactly one base contact.
    ContactName,

    /// A message, article or anything else with from/to/cc participants.
    Correspondence,

    /// A group address. May receive correspondence links like a contact.
    MailingList,

    /// A user-defined category.
    Category,

    /// A named phone number owned by one contact.
    Phone,

    /// Opaque blob holding the serialized image of a merged-away contact.
    SnapshotKeeper,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Contact,
        ResourceKind::EmailAccount,
        ResourceKind::ContactName,
        ResourceKind::Correspondence,
        ResourceKind::MailingList,
        ResourceKind::Category,
        ResourceKind::Phone,
        ResourceKind::SnapshotKeeper,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Contact => "contact",
            ResourceKind::EmailAccount => "email_account",
            ResourceKind::ContactName => "contact_name",
            ResourceKind::Correspondence => "correspondence",
            ResourceKind::MailingList => "mailing_list",
            ResourceKind::Category => "category",
            ResourceKind::Phone => "phone",
            ResourceKind::SnapshotKeeper => "snapshot_keeper",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ResourceKind::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a scalar property
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PropValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Date(DateTime<Utc>),
    Blob(Vec<u8>),
}

impl PropValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            PropValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            PropValue::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Text(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Text(s)
    }
}

impl From<DateTime<Utc>> for PropValue {
    fn from(d: DateTime<Utc>) -> Self {
        PropValue::Date(d)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

impl Resource {
    /// Create an empty resource of the given kind
    pub fn new(kind: ResourceKind) -> Self {
        let now = Utc::now();
        Resource {
            id: Uuid::now_v7(),
            kind,
            props: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Text property, or the empty string when missing.
    pub fn text(&self, key: &str) -> &str {
        self.props.get(key).and_then(PropValue::as_text).unwrap_or("")
    }

    pub fn date(&self, key: &str) -> Option<DateTime<Utc>> {
        self.props.get(key).and_then(PropValue::as_date)
    }

    /// Boolean marker, false when missing.
    pub fn flag(&self, key: &str) -> bool {
        self.props
            .get(key)
            .and_then(PropValue::as_bool)
            .unwrap_or(false)
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<PropValue>) {
        self.props.insert(key.to_string(), value.into());
        self.updated_at = Utc::now();
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        let old = self.props.remove(key);
        if old.is_some() {
            self.updated_at = Utc::now();
        }
        old
    }

    pub fn validate(&self) -> Result<(), String> {
        for key in self.props.keys() {
            if key.is_empty() || key.chars().count() > 64 {
                return Err(format!("Property name '{}' must be 1-64 characters", key));
            }
        }
        Ok(())
    }
}

/// Name of a link type. Lowercase ASCII, digits, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkType(String);

impl LinkType {
    pub fn new(name: &str) -> Result<Self, String> {
        if name.is_empty() || name.len() > 64 {
            return Err(format!("Link type '{}' must be 1-64 characters", name));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(format!(
                "Link type '{}' contains invalid characters (lowercase, digits, '_' and '-' only)",
                name
            ));
        }
        Ok(LinkType(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored edge. Undirected link types are stored once, with `from`
/// being whichever end created it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    /// Unique identifier. UUIDv7.
    pub id: LinkId,

    pub from: ResourceId,

    pub to: ResourceId,

    pub link_type: LinkType,

    pub created_at: DateTime<Utc>,
}

impl Link {
    pub fn new(from: ResourceId, to: ResourceId, link_type: LinkType) -> Self {
        Link {
            id: Uuid::now_v7(),
            from,
            to,
            link_type,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.from == self.to {
            return Err(format!(
                "Self-links are not allowed ({} on {})",
                self.link_type, self.from
            ));
        }
        Ok(())
    }

    /// The other end of the link as seen from `id`.
    pub fn peer_of(&self, id: ResourceId) -> Option<ResourceId> {
        if self.from == id {
            Some(self.to)
        } else if self.to == id {
            Some(self.from)
        } else {
            None
        }
    }
}

/// Direction of a link type as seen from one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkDirection {
    /// Directed links leaving the resource, and every undirected link.
    Outgoing,
    /// Directed links arriving at the resource.
    Incoming,
}
