pub mod types;
pub mod schema;
pub mod storage;
pub mod error;
pub mod config;
pub mod graph;
pub mod snapshot;
pub mod services;
pub mod contact;
pub mod api;

pub use error::{ContactsError, Result};
pub use types::*;
pub use schema::{props, ContactSchema, LinkSpec, Role, NATIVE_CONTACT_FIELDS};
pub use storage::{
    MemoryStorage, RedbStorage, ResourceFilter, Storage, StorageStats, CURRENT_SCHEMA_VERSION,
};
pub use config::EngineConfig;
pub use graph::{GraphObserver, ResourceGraph};
pub use snapshot::{BincodeSnapshotCodec, LinkMaterializationPolicy, MaterializeAll, SnapshotCodec};
pub use services::{
    IndexScheduler, JobHandle, JobPriority, LogProgress, NoopIndexer, ProgressSink,
    QueuedIndexer, ResourceOwner,
};
pub use contact::{
    ContactManager, ContactMergeEngine, ContactSplitEngine, FieldMerger, LinkRelinker,
    MaintenanceReport, MyselfCache, NameParts, RelinkStats,
};
pub use api::{Contacts, LibraryConfig};
