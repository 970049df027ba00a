//! # Edit requests
//!
//! Hosts never construct [`crate::change::Change`] objects directly. They
//! submit plain-data [`EditRequest`]s, which a [`ChangeRegistry`] turns into
//! changes by kind. Keeping the request surface data-only means it is
//! serializable (macros, session logs, remote frontends) and the mapping from
//! request to behavior sits in one auditable table instead of scattered
//! constructors.

use crate::change::{drawing, graph, root, structure, Change};
use crate::graph::schema::SocketValue;
use crate::graph::NodeId;
use crate::math::{IVec2, IntRect};
use crate::state::{ColorChannel, SymmetryAxis};

/// Everything a host can ask of the document, edits and history traffic alike.
/// The meta requests (undo, redo, boundaries, history deletion) drive the
/// tracker directly and have no change builder.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, strum::EnumDiscriminants)]
#[strum_discriminants(name(EditRequestKind), derive(Hash))]
pub enum EditRequest {
    ConnectProperties {
        from: NodeId,
        output: String,
        to: NodeId,
        input: String,
    },
    DisconnectProperty {
        node: NodeId,
        input: String,
    },
    UpdateProperty {
        node: NodeId,
        input: String,
        value: SocketValue,
    },
    CreateNode {
        kind: String,
        name: String,
        position: (f32, f32),
    },
    DeleteNode {
        node: NodeId,
    },
    MoveNode {
        node: NodeId,
        to: (f32, f32),
    },
    CreateStructureMember {
        kind: String,
        name: String,
        parent: Option<NodeId>,
        index: usize,
    },
    DeleteStructureMember {
        member: NodeId,
    },
    MoveStructureMember {
        member: NodeId,
        parent: Option<NodeId>,
        index: usize,
    },
    DuplicateStructureMember {
        member: NodeId,
    },
    SetOpacity {
        member: NodeId,
        opacity: f32,
    },
    SetVisibility {
        member: NodeId,
        visible: bool,
    },
    PaintPixels {
        layer: NodeId,
        pixels: Vec<(IVec2, [u8; 4])>,
    },
    ResizeCanvas {
        size: IVec2,
    },
    SetSymmetry {
        axis: SymmetryAxis,
        position: Option<f64>,
    },
    SetSelection {
        rect: Option<IntRect>,
        ignore_in_undo: bool,
    },
    SetChannelVisibility {
        channel: ColorChannel,
        visible: bool,
    },

    Undo,
    Redo,
    /// Close the open undo packet: everything before the boundary undoes as
    /// one step, everything after starts a new one.
    ChangeBoundary,
    /// Drop all recorded history, keeping the document as-is.
    DeleteHistory,
}
impl EditRequest {
    /// Requests that steer the tracker rather than edit the document.
    #[must_use]
    pub fn is_meta(&self) -> bool {
        matches!(
            self,
            Self::Undo | Self::Redo | Self::ChangeBoundary | Self::DeleteHistory
        )
    }
}

/// Builds the change implementing one request kind, or `None` if handed a
/// request of the wrong kind.
pub type ChangeBuilder = fn(EditRequest) -> Option<Box<dyn Change>>;

/// Table mapping request kinds to change builders. Hosts extend it with their
/// own kinds the same way the built-ins are registered.
pub struct ChangeRegistry {
    builders: hashbrown::HashMap<EditRequestKind, ChangeBuilder>,
}
impl ChangeRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            builders: hashbrown::HashMap::new(),
        }
    }
    /// Register a builder. Returns the previous one if the kind was taken.
    pub fn register(&mut self, kind: EditRequestKind, builder: ChangeBuilder) -> Option<ChangeBuilder> {
        self.builders.insert(kind, builder)
    }
    /// Turn a request into its change. `None` for meta requests and
    /// unregistered kinds.
    #[must_use]
    pub fn build(&self, request: EditRequest) -> Option<Box<dyn Change>> {
        let builder = self.builders.get(&EditRequestKind::from(&request))?;
        builder(request)
    }
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(EditRequestKind::ConnectProperties, |request| {
            let EditRequest::ConnectProperties {
                from,
                output,
                to,
                input,
            } = request
            else {
                return None;
            };
            Some(Box::new(graph::ConnectProperties::new(from, output, to, input)))
        });
        registry.register(EditRequestKind::DisconnectProperty, |request| {
            let EditRequest::DisconnectProperty { node, input } = request else {
                return None;
            };
            Some(Box::new(graph::DisconnectProperty::new(node, input)))
        });
        registry.register(EditRequestKind::UpdateProperty, |request| {
            let EditRequest::UpdateProperty { node, input, value } = request else {
                return None;
            };
            Some(Box::new(graph::UpdateProperty::new(node, input, value)))
        });
        registry.register(EditRequestKind::CreateNode, |request| {
            let EditRequest::CreateNode {
                kind,
                name,
                position,
            } = request
            else {
                return None;
            };
            Some(Box::new(graph::CreateNode::new(kind, name, position)))
        });
        registry.register(EditRequestKind::DeleteNode, |request| {
            let EditRequest::DeleteNode { node } = request else {
                return None;
            };
            Some(Box::new(graph::DeleteNode::new(node)))
        });
        registry.register(EditRequestKind::MoveNode, |request| {
            let EditRequest::MoveNode { node, to } = request else {
                return None;
            };
            Some(Box::new(graph::MoveNode::new(node, to)))
        });
        registry.register(EditRequestKind::CreateStructureMember, |request| {
            let EditRequest::CreateStructureMember {
                kind,
                name,
                parent,
                index,
            } = request
            else {
                return None;
            };
            Some(Box::new(structure::CreateStructureMember::new(
                kind, name, parent, index,
            )))
        });
        registry.register(EditRequestKind::DeleteStructureMember, |request| {
            let EditRequest::DeleteStructureMember { member } = request else {
                return None;
            };
            Some(Box::new(structure::DeleteStructureMember::new(member)))
        });
        registry.register(EditRequestKind::MoveStructureMember, |request| {
            let EditRequest::MoveStructureMember {
                member,
                parent,
                index,
            } = request
            else {
                return None;
            };
            Some(Box::new(structure::MoveStructureMember::new(member, parent, index)))
        });
        registry.register(EditRequestKind::DuplicateStructureMember, |request| {
            let EditRequest::DuplicateStructureMember { member } = request else {
                return None;
            };
            Some(Box::new(structure::DuplicateStructureMember::new(member)))
        });
        registry.register(EditRequestKind::SetOpacity, |request| {
            let EditRequest::SetOpacity { member, opacity } = request else {
                return None;
            };
            Some(Box::new(structure::SetStructureOpacity::new(member, opacity)))
        });
        registry.register(EditRequestKind::SetVisibility, |request| {
            let EditRequest::SetVisibility { member, visible } = request else {
                return None;
            };
            Some(Box::new(structure::SetStructureVisibility::new(member, visible)))
        });
        registry.register(EditRequestKind::PaintPixels, |request| {
            let EditRequest::PaintPixels { layer, pixels } = request else {
                return None;
            };
            Some(Box::new(drawing::PaintPixels::new(layer, pixels)))
        });
        registry.register(EditRequestKind::ResizeCanvas, |request| {
            let EditRequest::ResizeCanvas { size } = request else {
                return None;
            };
            Some(Box::new(root::ResizeCanvas::new(size)))
        });
        registry.register(EditRequestKind::SetSymmetry, |request| {
            let EditRequest::SetSymmetry { axis, position } = request else {
                return None;
            };
            Some(Box::new(root::SetSymmetry::new(axis, position)))
        });
        registry.register(EditRequestKind::SetSelection, |request| {
            let EditRequest::SetSelection {
                rect,
                ignore_in_undo,
            } = request
            else {
                return None;
            };
            Some(Box::new(root::SetSelection::new(rect, ignore_in_undo)))
        });
        registry.register(EditRequestKind::SetChannelVisibility, |request| {
            let EditRequest::SetChannelVisibility { channel, visible } = request else {
                return None;
            };
            Some(Box::new(root::SetChannelVisibility::new(channel, visible)))
        });
        registry
    }
}
impl Default for ChangeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_matching_change() {
        let registry = ChangeRegistry::with_builtins();
        let change = registry
            .build(EditRequest::ResizeCanvas {
                size: IVec2::new(64, 64),
            })
            .unwrap();
        // The registry routed to the right implementation.
        assert!(change
            .as_any()
            .downcast_ref::<root::ResizeCanvas>()
            .is_some());
    }
    #[test]
    fn meta_requests_have_no_builder() {
        let registry = ChangeRegistry::with_builtins();
        assert!(registry.build(EditRequest::Undo).is_none());
        assert!(registry.build(EditRequest::ChangeBoundary).is_none());
    }
    #[test]
    fn requests_round_trip_serde() {
        let request = EditRequest::SetOpacity {
            member: NodeId::new(),
            opacity: 0.5,
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: EditRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(EditRequestKind::from(&back), EditRequestKind::SetOpacity);
    }
}
