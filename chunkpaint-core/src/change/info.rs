//! # Change descriptions
//!
//! [`ChangeInfo`] is the only channel through which the core tells the outside
//! world what happened. Each record is self-sufficient - a consumer never has
//! to re-read mutable document state to interpret one - and the stream is
//! replayable: applying the same list twice to a fresh mirror yields the same
//! mirror.

use crate::chunk::AffectedArea;
use crate::graph::schema::{SocketValue, StructureRole};
use crate::graph::NodeId;
use crate::math::{IVec2, IntRect};
use crate::state::{ColorChannel, SymmetryAxis};

/// A tagged, side-effect-free description of one effect of applying or
/// reverting a change.
#[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub enum ChangeInfo {
    NodeCreated {
        node: NodeId,
        kind: String,
        position: (f32, f32),
    },
    NodeDeleted {
        node: NodeId,
    },
    NodeMoved {
        node: NodeId,
        position: (f32, f32),
    },
    PropertyConnected {
        from: NodeId,
        output: String,
        to: NodeId,
        input: String,
    },
    PropertyDisconnected {
        node: NodeId,
        input: String,
    },
    PropertyValueSet {
        node: NodeId,
        input: String,
        value: SocketValue,
    },
    MemberCreated {
        member: NodeId,
        role: StructureRole,
        /// None means the root level.
        parent: Option<NodeId>,
        index: usize,
    },
    MemberDeleted {
        member: NodeId,
    },
    MemberMoved {
        member: NodeId,
        parent: Option<NodeId>,
        index: usize,
    },
    OpacityChanged {
        member: NodeId,
        opacity: f32,
    },
    VisibilityChanged {
        member: NodeId,
        visible: bool,
    },
    /// Raster content of one layer changed within the given area.
    LayerChunksChanged {
        node: NodeId,
        area: AffectedArea,
    },
    CanvasResized {
        size: IVec2,
    },
    SymmetryChanged {
        axis: SymmetryAxis,
        position: Option<f64>,
    },
    SelectionChanged {
        rect: Option<IntRect>,
    },
    ChannelVisibilityChanged {
        channel: ColorChannel,
        visible: bool,
    },
}

/// Merge key: infos sharing a key describe the same mutable fact, so only the
/// latest matters (chunk areas instead accumulate).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum MergeKey {
    NodeMoved(NodeId),
    PropertyValueSet(NodeId, String),
    Opacity(NodeId),
    Visibility(NodeId),
    LayerChunks(NodeId),
    CanvasResized,
    Symmetry(SymmetryAxis),
    Selection,
    Channel(ColorChannel),
}
fn merge_key(info: &ChangeInfo) -> Option<MergeKey> {
    match info {
        ChangeInfo::NodeMoved { node, .. } => Some(MergeKey::NodeMoved(*node)),
        ChangeInfo::PropertyValueSet { node, input, .. } => {
            Some(MergeKey::PropertyValueSet(*node, input.clone()))
        }
        ChangeInfo::OpacityChanged { member, .. } => Some(MergeKey::Opacity(*member)),
        ChangeInfo::VisibilityChanged { member, .. } => Some(MergeKey::Visibility(*member)),
        ChangeInfo::LayerChunksChanged { node, .. } => Some(MergeKey::LayerChunks(*node)),
        ChangeInfo::CanvasResized { .. } => Some(MergeKey::CanvasResized),
        ChangeInfo::SymmetryChanged { axis, .. } => Some(MergeKey::Symmetry(*axis)),
        ChangeInfo::SelectionChanged { .. } => Some(MergeKey::Selection),
        ChangeInfo::ChannelVisibilityChanged { channel, .. } => {
            Some(MergeKey::Channel(*channel))
        }
        // Structural records are never merged - their order is their meaning.
        _ => None,
    }
}

/// Collapse redundant records: value-like infos keep only the latest value (in
/// the slot where the fact was first mentioned), chunk-dirty infos for the same
/// node merge their areas. Associative and idempotent -
/// `optimize(optimize(x)) == optimize(x)`.
#[must_use]
pub fn optimize(infos: Vec<ChangeInfo>) -> Vec<ChangeInfo> {
    let mut result: Vec<ChangeInfo> = Vec::with_capacity(infos.len());
    let mut slots: hashbrown::HashMap<MergeKey, usize> = hashbrown::HashMap::new();
    for info in infos {
        let Some(key) = merge_key(&info) else {
            result.push(info);
            continue;
        };
        match slots.entry(key) {
            hashbrown::hash_map::Entry::Occupied(slot) => {
                let index = *slot.get();
                match info {
                    ChangeInfo::LayerChunksChanged {
                        node,
                        area: incoming,
                    } => {
                        if let ChangeInfo::LayerChunksChanged { area, .. } = &mut result[index] {
                            area.union_with(&incoming);
                        } else {
                            // Key equality guarantees the slot variant matches;
                            // recover by overwriting anyway.
                            result[index] = ChangeInfo::LayerChunksChanged {
                                node,
                                area: incoming,
                            };
                        }
                    }
                    // Last write wins.
                    other => result[index] = other,
                }
            }
            hashbrown::hash_map::Entry::Vacant(slot) => {
                slot.insert(result.len());
                result.push(info);
            }
        }
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;

    fn opacity(member: NodeId, opacity: f32) -> ChangeInfo {
        ChangeInfo::OpacityChanged { member, opacity }
    }

    #[test]
    fn last_value_wins_in_first_slot() {
        let member = NodeId::new();
        let other = NodeId::new();
        let infos = vec![
            opacity(member, 0.1),
            ChangeInfo::MemberDeleted { member: other },
            opacity(member, 0.2),
            opacity(member, 0.5),
        ];
        let optimized = optimize(infos);
        assert_eq!(
            optimized,
            vec![
                opacity(member, 0.5),
                ChangeInfo::MemberDeleted { member: other },
            ]
        );
    }
    #[test]
    fn chunk_areas_union() {
        let node = NodeId::new();
        let infos = vec![
            ChangeInfo::LayerChunksChanged {
                node,
                area: AffectedArea::from_chunks([IVec2::ZERO]),
            },
            ChangeInfo::LayerChunksChanged {
                node,
                area: AffectedArea::from_chunks([IVec2::new(1, 1)]),
            },
        ];
        let optimized = optimize(infos);
        assert_eq!(optimized.len(), 1);
        let ChangeInfo::LayerChunksChanged { area, .. } = &optimized[0] else {
            panic!("wrong variant");
        };
        assert_eq!(area.chunks.len(), 2);
    }
    #[test]
    fn idempotent() {
        let member = NodeId::new();
        let node = NodeId::new();
        let infos = vec![
            opacity(member, 0.1),
            ChangeInfo::LayerChunksChanged {
                node,
                area: AffectedArea::from_chunks([IVec2::ZERO, IVec2::new(3, 2)]),
            },
            opacity(member, 0.9),
            ChangeInfo::MemberCreated {
                member,
                role: StructureRole::Layer,
                parent: None,
                index: 0,
            },
        ];
        let once = optimize(infos);
        let twice = optimize(once.clone());
        assert_eq!(once, twice);
    }
    #[test]
    fn structural_records_keep_order() {
        let a = NodeId::new();
        let infos = vec![
            ChangeInfo::MemberCreated {
                member: a,
                role: StructureRole::Folder,
                parent: None,
                index: 0,
            },
            ChangeInfo::MemberDeleted { member: a },
        ];
        // Create-then-delete must survive untouched; a mirror replaying the
        // stream needs both.
        assert_eq!(optimize(infos.clone()), infos);
    }
}
