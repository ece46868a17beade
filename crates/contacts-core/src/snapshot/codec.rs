use crate::error::{ContactsError, Result};
use crate::graph::ResourceGraph;
use crate::snapshot::{LinkMaterializationPolicy, SnapshotCodec};
use crate::storage::Storage;
use crate::types::{LinkDirection, LinkType, PropValue, ResourceId, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bumped whenever the image layout changes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotImage {
    version: u32,
    root: ResourceImage,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResourceImage {
    original_id: ResourceId,
    kind: ResourceKind,
    props: BTreeMap<String, PropValue>,
    links: Vec<LinkImage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkImage {
    link_type: LinkType,
    direction: LinkDirection,
    peer: PeerImage,
}

#[derive(Debug, Serialize, Deserialize)]
enum PeerImage {
    /// Referenced by id; relinked only if it still exists on restore.
    Existing(ResourceId),
    /// Owned child; recreated with the parent.
    Owned(ResourceImage),
}

/// Bincode-encoded snapshot images.
///
/// Children reached over one of the `owned` link types (phone entries by
/// default) are embedded and recreated; everything else is a reference.
#[derive(Debug, Clone)]
pub struct BincodeSnapshotCodec {
    owned: Vec<LinkType>,
}

impl BincodeSnapshotCodec {
    pub fn new(owned: Vec<LinkType>) -> Self {
        Self { owned }
    }

    pub fn for_schema(schema: &crate::schema::ContactSchema) -> Self {
        Self::new(vec![schema.phone.clone()])
    }

    /// `parent` is the owner of an embedded child; the link back to it is
    /// recreated from the parent's side.
    fn image<S: Storage>(
        &self,
        graph: &ResourceGraph<S>,
        id: ResourceId,
        parent: Option<ResourceId>,
        depth: usize,
    ) -> Result<ResourceImage> {
        if depth > 8 {
            return Err(ContactsError::consistency(format!(
                "Owned subtree under {} is too deep (cycle?)",
                id
            )));
        }
        let resource = graph.require(id)?;
        let mut links = Vec::new();

        for link in graph.storage().links_from(id)? {
            if Some(link.to) == parent {
                continue;
            }
            let peer = if self.owned.contains(&link.link_type) {
                PeerImage::Owned(self.image(graph, link.to, Some(id), depth + 1)?)
            } else {
                PeerImage::Existing(link.to)
            };
            links.push(LinkImage {
                link_type: link.link_type,
                direction: LinkDirection::Outgoing,
                peer,
            });
        }
        for link in graph.storage().links_to(id)? {
            if Some(link.from) == parent {
                continue;
            }
            links.push(LinkImage {
                link_type: link.link_type,
                direction: LinkDirection::Incoming,
                peer: PeerImage::Existing(link.from),
            });
        }

        Ok(ResourceImage {
            original_id: id,
            kind: resource.kind,
            props: resource.props,
            links,
        })
    }

    fn materialize<S: Storage>(
        &self,
        graph: &ResourceGraph<S>,
        image: ResourceImage,
        policy: &mut dyn LinkMaterializationPolicy,
    ) -> Result<ResourceId> {
        let created = graph.create(image.kind)?;
        let id = created.id;
        let props = image.props;
        graph.update(id, |r| r.props = props)?;

        for link in image.links {
            let peer = match link.peer {
                PeerImage::Existing(peer) => {
                    if !graph.exists(peer)? {
                        log::debug!(
                            "Snapshot of {} refers to vanished {} over '{}', skipping",
                            image.original_id,
                            peer,
                            link.link_type
                        );
                        continue;
                    }
                    peer
                }
                PeerImage::Owned(child) => self.materialize(graph, child, policy)?,
            };

            if !policy.admit(id, peer, &link.link_type, link.direction)? {
                continue;
            }

            let (from, to) = match link.direction {
                LinkDirection::Outgoing => (id, peer),
                LinkDirection::Incoming => (peer, id),
            };
            match graph.add_link(from, to, &link.link_type) {
                Ok(_) => {}
                Err(ContactsError::LinkRestriction { .. }) => {
                    // The slot was taken by someone else since the snapshot.
                    log::warn!(
                        "Not restoring '{}' link {} -> {}: already taken",
                        link.link_type,
                        from,
                        to
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(id)
    }
}

impl SnapshotCodec for BincodeSnapshotCodec {
    fn serialize<S: Storage>(&self, graph: &ResourceGraph<S>, root: ResourceId) -> Result<Vec<u8>> {
        let image = SnapshotImage {
            version: SNAPSHOT_FORMAT_VERSION,
            root: self.image(graph, root, None, 0)?,
        };
        bincode::serialize(&image).map_err(ContactsError::from)
    }

    fn deserialize<S: Storage>(
        &self,
        graph: &ResourceGraph<S>,
        blob: &[u8],
        policy: &mut dyn LinkMaterializationPolicy,
    ) -> Result<ResourceId> {
        let image: SnapshotImage = bincode::deserialize(blob)?;
        if image.version != SNAPSHOT_FORMAT_VERSION {
            return Err(ContactsError::Validation(format!(
                "Snapshot format v{} is not supported (expected v{})",
                image.version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        self.materialize(graph, image.root, policy)
    }
}
