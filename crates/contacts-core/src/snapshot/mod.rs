//! Reversible images of a resource subtree.
//!
//! Merge stores one image per merged-away contact in a
//! [`SnapshotKeeper`](crate::types::ResourceKind::SnapshotKeeper); split
//! materializes it again. The byte layout is private to the codec.

mod codec;

pub use codec::{BincodeSnapshotCodec, SNAPSHOT_FORMAT_VERSION};

use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::storage::Storage;
use crate::types::{LinkDirection, LinkType, ResourceId};

/// Decides, link by link, what a restore recreates.
pub trait LinkMaterializationPolicy {
    /// Called before the restored resource `parent` is linked to `peer`.
    /// `direction` is how the link runs as seen from `parent`.
    /// Return `false` to leave this link out.
    fn admit(
        &mut self,
        parent: ResourceId,
        peer: ResourceId,
        link_type: &LinkType,
        direction: LinkDirection,
    ) -> Result<bool>;
}

/// Recreates every link.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaterializeAll;

impl LinkMaterializationPolicy for MaterializeAll {
    fn admit(
        &mut self,
        _: ResourceId,
        _: ResourceId,
        _: &LinkType,
        _: LinkDirection,
    ) -> Result<bool> {
        Ok(true)
    }
}

/// Serializes a resource with its links into a blob and back.
pub trait SnapshotCodec: Send + Sync {
    fn serialize<S: Storage>(&self, graph: &ResourceGraph<S>, root: ResourceId) -> Result<Vec<u8>>;

    /// Materialize a fresh resource (new id) from `blob`. Links to peers
    /// that no longer exist are skipped.
    fn deserialize<S: Storage>(
        &self,
        graph: &ResourceGraph<S>,
        blob: &[u8],
        policy: &mut dyn LinkMaterializationPolicy,
    ) -> Result<ResourceId>;
}
