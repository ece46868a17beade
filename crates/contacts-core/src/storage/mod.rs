mod filters;
mod memory;
mod redb_storage;
mod traits;

pub use filters::{ResourceFilter, StorageStats};
pub use memory::MemoryStorage;
pub use redb_storage::{RedbStorage, CURRENT_SCHEMA_VERSION};
pub use traits::Storage;
