use crate::error::{ContactsError, Result};
use crate::storage::filters::{ResourceFilter, StorageStats};
use crate::storage::traits::Storage;
use crate::types::{Link, LinkId, Resource, ResourceId};
use redb::{
    Database, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, TableDefinition,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Table definitions
const RESOURCES: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("resources");
const LINKS: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("links");

// Secondary indexes
const RESOURCES_BY_KIND: MultimapTableDefinition<&str, &[u8; 16]> =
    MultimapTableDefinition::new("resources_by_kind");
const LINKS_BY_FROM: IdIndex = MultimapTableDefinition::new("links_by_from");
const LINKS_BY_TO: IdIndex = MultimapTableDefinition::new("links_by_to");

/// Adjacency index: resource id -> link ids
type IdIndex = MultimapTableDefinition<'static, &'static [u8; 16], &'static [u8; 16]>;

// Metadata table
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;
const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Redb-based storage implementation
pub struct RedbStorage {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbStorage {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ContactsError::Validation(format!("Failed to create directory: {}", e))
            })?;
        }

        let is_new = !path.exists();
        let db = Database::create(&path)?;

        if !is_new {
            Self::check_schema_version(&db)?;
        }

        // Ensure tables exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RESOURCES)?;
            let _ = write_txn.open_table(LINKS)?;
            let _ = write_txn.open_multimap_table(RESOURCES_BY_KIND)?;
            let _ = write_txn.open_multimap_table(LINKS_BY_FROM)?;
            let _ = write_txn.open_multimap_table(LINKS_BY_TO)?;
            let mut meta = write_txn.open_table(META)?;
            if is_new {
                meta.insert(
                    SCHEMA_VERSION_KEY,
                    CURRENT_SCHEMA_VERSION.to_string().as_bytes(),
                )?;
            }
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Check schema version. Returns error if it does not match this build.
    fn check_schema_version(db: &Database) -> Result<()> {
        let read_txn = db.begin_read()?;
        let version = {
            let table = read_txn.open_table(META).ok();
            table
                .and_then(|t| {
                    t.get(SCHEMA_VERSION_KEY).ok().flatten().and_then(|v| {
                        std::str::from_utf8(v.value())
                            .ok()
                            .and_then(|s| s.parse::<u32>().ok())
                    })
                })
                .unwrap_or(CURRENT_SCHEMA_VERSION)
        };

        if version != CURRENT_SCHEMA_VERSION {
            return Err(ContactsError::Validation(format!(
                "Database schema v{} does not match supported v{}",
                version, CURRENT_SCHEMA_VERSION
            )));
        }
        Ok(())
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn uuid_to_bytes(id: &uuid::Uuid) -> [u8; 16] {
        *id.as_bytes()
    }

    fn bytes_to_uuid(bytes: &[u8; 16]) -> uuid::Uuid {
        uuid::Uuid::from_bytes(*bytes)
    }

    fn serialize_resource(resource: &Resource) -> Result<Vec<u8>> {
        bincode::serialize(resource).map_err(ContactsError::from)
    }

    fn deserialize_resource(bytes: &[u8]) -> Result<Resource> {
        bincode::deserialize(bytes).map_err(ContactsError::from)
    }

    fn serialize_link(link: &Link) -> Result<Vec<u8>> {
        bincode::serialize(link).map_err(ContactsError::from)
    }

    fn deserialize_link(bytes: &[u8]) -> Result<Link> {
        bincode::deserialize(bytes).map_err(ContactsError::from)
    }

    /// Remove a link from the main table and both indexes
    fn remove_link_in(txn: &redb::WriteTransaction, link: &Link) -> Result<()> {
        let link_id_bytes = Self::uuid_to_bytes(&link.id);
        {
            let mut from_table = txn.open_multimap_table(LINKS_BY_FROM)?;
            from_table.remove(&Self::uuid_to_bytes(&link.from), &link_id_bytes)?;
        }
        {
            let mut to_table = txn.open_multimap_table(LINKS_BY_TO)?;
            to_table.remove(&Self::uuid_to_bytes(&link.to), &link_id_bytes)?;
        }
        {
            let mut links_table = txn.open_table(LINKS)?;
            links_table.remove(&link_id_bytes)?;
        }
        Ok(())
    }

    /// Link ids listed under `id` in one of the adjacency indexes
    fn indexed_link_ids(
        txn: &redb::WriteTransaction,
        index: IdIndex,
        id: ResourceId,
    ) -> Result<Vec<LinkId>> {
        let table = txn.open_multimap_table(index)?;
        let raw: Vec<[u8; 16]> = table
            .get(&Self::uuid_to_bytes(&id))?
            .map(|r| r.map(|g| *g.value()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(raw.iter().map(Self::bytes_to_uuid).collect())
    }

    fn read_links(&self, index: IdIndex, id: ResourceId) -> Result<Vec<Link>> {
        let read_txn = self.db.begin_read()?;
        let links_table = read_txn.open_table(LINKS)?;
        let index_table = read_txn.open_multimap_table(index)?;

        let link_ids: Vec<LinkId> = index_table
            .get(&Self::uuid_to_bytes(&id))?
            .map(|result| result.map(|guard| Self::bytes_to_uuid(guard.value())))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut links = Vec::new();
        for link_id in link_ids {
            if let Some(bytes) = links_table.get(&Self::uuid_to_bytes(&link_id))? {
                links.push(Self::deserialize_link(bytes.value())?);
            }
        }
        // Index values are ordered by id bytes; UUIDv7 keeps that chronological
        Ok(links)
    }
}

impl Storage for RedbStorage {
    fn put_resource(&self, resource: &Resource) -> Result<()> {
        resource.validate().map_err(ContactsError::Validation)?;

        let id_bytes = Self::uuid_to_bytes(&resource.id);
        let bytes = Self::serialize_resource(resource)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RESOURCES)?;
            table.insert(&id_bytes, bytes.as_slice())?;
        }
        {
            // Kind never changes, so inserting again is a no-op for updates
            let mut kind_table = write_txn.open_multimap_table(RESOURCES_BY_KIND)?;
            kind_table.insert(resource.kind.as_str(), &id_bytes)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_resource(&self, id: ResourceId) -> Result<Option<Resource>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESOURCES)?;

        if let Some(bytes) = table.get(&Self::uuid_to_bytes(&id))? {
            Ok(Some(Self::deserialize_resource(bytes.value())?))
        } else {
            Ok(None)
        }
    }

    fn delete_resource(&self, id: ResourceId) -> Result<()> {
        let id_bytes = Self::uuid_to_bytes(&id);
        let write_txn = self.db.begin_write()?;

        let resource = {
            let table = write_txn.open_table(RESOURCES)?;
            let bytes = table.get(&id_bytes)?.map(|g| g.value().to_vec());
            bytes.map(|b| Self::deserialize_resource(&b)).transpose()?
        }
        .ok_or(ContactsError::NodeNotFound(id))?;

        // Cascade to every link touching the resource
        let mut link_ids = Self::indexed_link_ids(&write_txn, LINKS_BY_FROM, id)?;
        link_ids.extend(Self::indexed_link_ids(&write_txn, LINKS_BY_TO, id)?);
        for link_id in link_ids {
            let link = {
                let links_table = write_txn.open_table(LINKS)?;
                let bytes = links_table
                    .get(&Self::uuid_to_bytes(&link_id))?
                    .map(|g| g.value().to_vec());
                bytes.map(|b| Self::deserialize_link(&b)).transpose()?
            };
            if let Some(link) = link {
                Self::remove_link_in(&write_txn, &link)?;
            }
        }

        {
            let mut kind_table = write_txn.open_multimap_table(RESOURCES_BY_KIND)?;
            kind_table.remove(resource.kind.as_str(), &id_bytes)?;
        }
        {
            let mut table = write_txn.open_table(RESOURCES)?;
            table.remove(&id_bytes)?;
        }

        write_txn.commit()?;
        Ok(())
    }

    fn list_resources(&self, filter: ResourceFilter) -> Result<Vec<Resource>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESOURCES)?;

        let mut resources = Vec::new();

        // If we have a kind filter, use the index for efficiency
        if let Some(ref kinds) = filter.kinds {
            let kind_index = read_txn.open_multimap_table(RESOURCES_BY_KIND)?;

            for kind in kinds {
                let ids: Vec<ResourceId> = kind_index
                    .get(kind.as_str())?
                    .map(|result| result.map(|guard| Self::bytes_to_uuid(guard.value())))
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                for id in ids {
                    if let Some(bytes) = table.get(&Self::uuid_to_bytes(&id))? {
                        let resource = Self::deserialize_resource(bytes.value())?;
                        if filter.matches(&resource) {
                            resources.push(resource);
                        }
                    }
                }
            }
        } else {
            // Full table scan
            for item in table.iter()? {
                let (_, value) = item?;
                let resource = Self::deserialize_resource(value.value())?;
                if filter.matches(&resource) {
                    resources.push(resource);
                }
            }
        }

        resources.sort_by_key(|r| r.id);
        if let Some(limit) = filter.limit {
            resources.truncate(limit);
        }
        Ok(resources)
    }

    fn count_resources(&self, filter: ResourceFilter) -> Result<u64> {
        // Kind-only filters can be answered from the index
        if filter.text_equals.is_none() && filter.flag.is_none() && filter.limit.is_none() {
            if let Some(ref kinds) = filter.kinds {
                let read_txn = self.db.begin_read()?;
                let kind_index = read_txn.open_multimap_table(RESOURCES_BY_KIND)?;
                let mut count = 0u64;
                for kind in kinds {
                    count += kind_index.get(kind.as_str())?.count() as u64;
                }
                return Ok(count);
            }
        }
        Ok(self.list_resources(filter)?.len() as u64)
    }

    fn put_link(&self, link: &Link) -> Result<()> {
        link.validate()
            .map_err(|reason| ContactsError::InvalidLink { reason })?;

        let link_id_bytes = Self::uuid_to_bytes(&link.id);
        let from_bytes = Self::uuid_to_bytes(&link.from);
        let to_bytes = Self::uuid_to_bytes(&link.to);

        // Single write transaction: check endpoints, write, index
        let write_txn = self.db.begin_write()?;
        {
            let table = write_txn.open_table(RESOURCES)?;
            if table.get(&from_bytes)?.is_none() {
                return Err(ContactsError::NodeNotFound(link.from));
            }
            if table.get(&to_bytes)?.is_none() {
                return Err(ContactsError::NodeNotFound(link.to));
            }
        }

        let bytes = Self::serialize_link(link)?;
        {
            let mut links_table = write_txn.open_table(LINKS)?;
            links_table.insert(&link_id_bytes, bytes.as_slice())?;
        }
        {
            let mut from_table = write_txn.open_multimap_table(LINKS_BY_FROM)?;
            from_table.insert(&from_bytes, &link_id_bytes)?;
        }
        {
            let mut to_table = write_txn.open_multimap_table(LINKS_BY_TO)?;
            to_table.insert(&to_bytes, &link_id_bytes)?;
        }

        write_txn.commit()?;
        Ok(())
    }

    fn get_link(&self, id: LinkId) -> Result<Option<Link>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LINKS)?;

        if let Some(bytes) = table.get(&Self::uuid_to_bytes(&id))? {
            Ok(Some(Self::deserialize_link(bytes.value())?))
        } else {
            Ok(None)
        }
    }

    fn delete_link(&self, id: LinkId) -> Result<()> {
        let link = self.get_link(id)?.ok_or(ContactsError::LinkNotFound(id))?;

        let write_txn = self.db.begin_write()?;
        Self::remove_link_in(&write_txn, &link)?;
        write_txn.commit()?;
        Ok(())
    }

    fn links_from(&self, id: ResourceId) -> Result<Vec<Link>> {
        self.read_links(LINKS_BY_FROM, id)
    }

    fn links_to(&self, id: ResourceId) -> Result<Vec<Link>> {
        self.read_links(LINKS_BY_TO, id)
    }

    fn stats(&self) -> Result<StorageStats> {
        let read_txn = self.db.begin_read()?;
        let resources = read_txn.open_table(RESOURCES)?;
        let links = read_txn.open_table(LINKS)?;

        let mut stats = StorageStats::default();
        for item in resources.iter()? {
            let (_, value) = item?;
            let resource = Self::deserialize_resource(value.value())?;
            stats.resource_count += 1;
            *stats.resource_counts_by_kind.entry(resource.kind).or_insert(0) += 1;
        }
        for item in links.iter()? {
            let (_, value) = item?;
            let link = Self::deserialize_link(value.value())?;
            stats.link_count += 1;
            *stats.link_counts_by_type.entry(link.link_type).or_insert(0) += 1;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LinkType, ResourceKind};
    use tempfile::TempDir;

    fn open_temp() -> (RedbStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = RedbStorage::open(dir.path().join("contacts.redb")).unwrap();
        (storage, dir)
    }

    #[test]
    fn test_resource_round_trip() {
        let (storage, _dir) = open_temp();
        let mut contact = Resource::new(ResourceKind::Contact);
        contact.set("first_name", "Ada");
        storage.put_resource(&contact).unwrap();

        let loaded = storage.get_resource(contact.id).unwrap().unwrap();
        assert_eq!(loaded, contact);
        assert_eq!(
            storage
                .count_resources(ResourceFilter::new().of_kind(ResourceKind::Contact))
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_links_indexed_both_ways_and_cascade() {
        let (storage, _dir) = open_temp();
        let mail = Resource::new(ResourceKind::Correspondence);
        let contact = Resource::new(ResourceKind::Contact);
        storage.put_resource(&mail).unwrap();
        storage.put_resource(&contact).unwrap();

        let link = Link::new(mail.id, contact.id, LinkType::new("from").unwrap());
        storage.put_link(&link).unwrap();
        assert_eq!(storage.links_from(mail.id).unwrap(), vec![link.clone()]);
        assert_eq!(storage.links_to(contact.id).unwrap(), vec![link.clone()]);

        storage.delete_resource(contact.id).unwrap();
        assert!(storage.links_from(mail.id).unwrap().is_empty());
        assert!(storage.get_link(link.id).unwrap().is_none());
        assert_eq!(storage.stats().unwrap().resource_count, 1);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contacts.redb");
        let id = {
            let storage = RedbStorage::open(&path).unwrap();
            let r = Resource::new(ResourceKind::EmailAccount);
            storage.put_resource(&r).unwrap();
            r.id
        };
        let storage = RedbStorage::open(&path).unwrap();
        assert!(storage.get_resource(id).unwrap().is_some());
    }
}
