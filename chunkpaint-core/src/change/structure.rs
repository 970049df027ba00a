//! Changes operating on the layer structure: creating, deleting, moving and
//! duplicating members, and the per-member opacity/visibility toggles. These
//! are graph edits underneath, but they maintain the chaining invariant as a
//! unit where raw socket edits would leave the chain torn.

use hashbrown::HashMap;

use crate::graph::schema::{self, SocketValue, StructureRole};
use crate::graph::{Node, NodeGraph, NodeId};
use crate::state::document::SurfaceHandle;
use crate::state::Document;

use super::info::ChangeInfo;
use super::{Applied, AppliedWithUndo, Change, ChangeError};

/// The member plus, for folders, every member chained inside it, recursively.
/// Top-down order, `member` first.
fn structure_subtree(graph: &NodeGraph, member: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![member];
    while let Some(id) = stack.pop() {
        out.push(id);
        let is_folder = graph
            .get(id)
            .is_some_and(|node| node.role() == Some(StructureRole::Folder));
        if is_folder {
            if let Ok(children) = graph.children_of(Some(id)) {
                stack.extend(children);
            }
        }
    }
    out
}

/// Create a new layer or folder and splice it into a container's chain.
#[derive(Debug)]
pub struct CreateStructureMember {
    pub kind: String,
    pub name: String,
    pub parent: Option<NodeId>,
    pub index: usize,
    id: Option<NodeId>,
    raster: Option<SurfaceHandle>,
}
impl CreateStructureMember {
    #[must_use]
    pub fn new(kind: String, name: String, parent: Option<NodeId>, index: usize) -> Self {
        Self {
            kind,
            name,
            parent,
            index,
            id: None,
            raster: None,
        }
    }
}
impl Change for CreateStructureMember {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let Some(spec) = document.registry().get(&self.kind) else {
            return false;
        };
        if spec.role.is_none() {
            return false;
        }
        // children_of doubles as "is this a valid container".
        document.graph().children_of(self.parent).is_ok()
    }
    fn apply(
        &mut self,
        document: &mut Document,
        first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        let id = *self.id.get_or_insert_with(NodeId::new);
        let spec = document
            .registry()
            .get(&self.kind)
            .ok_or(ChangeError::MismatchedState)?
            .clone();
        // Unwrap OK - validation required a structure role.
        let role = spec.role.unwrap();
        let node = Node::from_spec(&spec, id, self.name.clone(), (0.0, 0.0));
        document
            .graph_mut()
            .add_node(node)
            .map_err(|_| ChangeError::MismatchedState)?;
        let index = document
            .graph_mut()
            .insert_member(id, self.parent, self.index)
            .map_err(|_| ChangeError::MismatchedState)?;
        if role == StructureRole::Layer {
            if first_apply {
                self.raster = Some(document.create_raster(id));
            } else {
                // Unwrap OK - first apply stored it.
                document.attach_raster(id, self.raster.clone().unwrap());
            }
        }
        Ok(AppliedWithUndo {
            applied: ChangeInfo::MemberCreated {
                member: id,
                role,
                parent: self.parent,
                index,
            }
            .into(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - apply allocated it.
        let id = self.id.unwrap();
        document
            .graph_mut()
            .remove_member(id)
            .map_err(|_| ChangeError::MismatchedState)?;
        document.detach_raster(id);
        document
            .graph_mut()
            .remove_node(id)
            .map_err(|_| ChangeError::MismatchedState)?;
        Ok(ChangeInfo::MemberDeleted { member: id }.into())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Delete a member and, for folders, everything chained inside it. The whole
/// sub-tree (nodes, wiring, raster surfaces) is kept inside the change so
/// revert restores it bit-exact.
#[derive(Debug)]
pub struct DeleteStructureMember {
    pub member: NodeId,
    saved: Vec<Node>,
    rasters: HashMap<NodeId, SurfaceHandle>,
    location: Option<(Option<NodeId>, usize)>,
}
impl DeleteStructureMember {
    #[must_use]
    pub fn new(member: NodeId) -> Self {
        Self {
            member,
            saved: Vec::new(),
            rasters: HashMap::new(),
            location: None,
        }
    }
}
impl Change for DeleteStructureMember {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let graph = document.graph();
        let Some(location) = graph.member_location(self.member) else {
            return false;
        };
        self.location = Some(location);
        for id in structure_subtree(graph, self.member) {
            // Unwrap OK - subtree ids come from live chain walks.
            let mut node = graph.get(id).unwrap().clone();
            if id == self.member {
                // The chain splice re-establishes this on revert.
                if let Some(socket) = node.input_mut(schema::BACKGROUND) {
                    socket.connection = None;
                }
            }
            if let Some(raster) = document.raster(id) {
                self.rasters.insert(id, raster.clone());
            }
            self.saved.push(node);
        }
        true
    }
    fn apply(
        &mut self,
        document: &mut Document,
        _first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        document
            .graph_mut()
            .remove_member(self.member)
            .map_err(|_| ChangeError::MismatchedState)?;
        // Sever everything inside the sub-tree, then drop the nodes. All
        // remaining connections are internal, so this leaves no danglers.
        for node in &self.saved {
            for input in node.inputs() {
                if input.connection.is_some() {
                    document
                        .graph_mut()
                        .disconnect(node.id, &input.name)
                        .map_err(|_| ChangeError::MismatchedState)?;
                }
            }
        }
        for node in &self.saved {
            document.detach_raster(node.id);
            document
                .graph_mut()
                .remove_node(node.id)
                .map_err(|_| ChangeError::MismatchedState)?;
        }
        Ok(AppliedWithUndo {
            applied: ChangeInfo::MemberDeleted {
                member: self.member,
            }
            .into(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Saved clones keep their internal wiring, so re-adding restores the
        // sub-tree wholesale; only the outer splice needs redoing.
        for node in &self.saved {
            document
                .graph_mut()
                .add_node(node.clone())
                .map_err(|_| ChangeError::MismatchedState)?;
        }
        for (id, raster) in &self.rasters {
            document.attach_raster(*id, raster.clone());
        }
        // Unwrap OK - validation captured it.
        let (parent, index) = self.location.unwrap();
        let index = document
            .graph_mut()
            .insert_member(self.member, parent, index)
            .map_err(|_| ChangeError::MismatchedState)?;
        // Unwrap OK - members always carry a role.
        let role = self.saved[0].role().unwrap();
        Ok(ChangeInfo::MemberCreated {
            member: self.member,
            role,
            parent,
            index,
        }
        .into())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Re-home a member to a (possibly different) container and index.
#[derive(Debug)]
pub struct MoveStructureMember {
    pub member: NodeId,
    pub to_parent: Option<NodeId>,
    pub to_index: usize,
    from: Option<(Option<NodeId>, usize)>,
}
impl MoveStructureMember {
    #[must_use]
    pub fn new(member: NodeId, to_parent: Option<NodeId>, to_index: usize) -> Self {
        Self {
            member,
            to_parent,
            to_index,
            from: None,
        }
    }
}
impl Change for MoveStructureMember {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let graph = document.graph();
        let Some(from) = graph.member_location(self.member) else {
            return false;
        };
        if graph.children_of(self.to_parent).is_err() {
            return false;
        }
        // A folder cannot move into its own content.
        if let Some(target) = self.to_parent {
            if structure_subtree(graph, self.member).contains(&target) {
                return false;
            }
        }
        if from == (self.to_parent, self.to_index) {
            return false;
        }
        self.from = Some(from);
        true
    }
    fn apply(
        &mut self,
        document: &mut Document,
        _first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        let graph = document.graph_mut();
        graph
            .remove_member(self.member)
            .map_err(|_| ChangeError::MismatchedState)?;
        let index = graph
            .insert_member(self.member, self.to_parent, self.to_index)
            .map_err(|_| ChangeError::MismatchedState)?;
        Ok(AppliedWithUndo {
            applied: ChangeInfo::MemberMoved {
                member: self.member,
                parent: self.to_parent,
                index,
            }
            .into(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - validation captured it.
        let (parent, index) = self.from.unwrap();
        let graph = document.graph_mut();
        graph
            .remove_member(self.member)
            .map_err(|_| ChangeError::MismatchedState)?;
        let index = graph
            .insert_member(self.member, parent, index)
            .map_err(|_| ChangeError::MismatchedState)?;
        Ok(ChangeInfo::MemberMoved {
            member: self.member,
            parent,
            index,
        }
        .into())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Set a member's blend opacity, stored in its opacity socket.
#[derive(Debug)]
pub struct SetStructureOpacity {
    pub member: NodeId,
    pub opacity: f32,
    previous: Option<f32>,
}
impl SetStructureOpacity {
    #[must_use]
    pub fn new(member: NodeId, opacity: f32) -> Self {
        Self {
            member,
            opacity: opacity.clamp(0.0, 1.0),
            previous: None,
        }
    }
    fn set(document: &mut Document, member: NodeId, opacity: f32) -> Result<Applied, ChangeError> {
        let socket = document
            .graph_mut()
            .get_mut(member)
            .ok_or(ChangeError::MismatchedState)?
            .input_mut(schema::OPACITY)
            .ok_or(ChangeError::MismatchedState)?;
        socket.value = SocketValue::Scalar(opacity);
        Ok(ChangeInfo::OpacityChanged { member, opacity }.into())
    }
}
impl Change for SetStructureOpacity {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let Some(node) = document.graph().get(self.member) else {
            return false;
        };
        if !node.is_structure() {
            return false;
        }
        let Some(current) = node
            .input(schema::OPACITY)
            .and_then(|socket| socket.value.scalar())
        else {
            return false;
        };
        if current == self.opacity {
            return false;
        }
        self.previous = Some(current);
        true
    }
    fn apply(
        &mut self,
        document: &mut Document,
        _first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        Ok(AppliedWithUndo {
            applied: Self::set(document, self.member, self.opacity)?,
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - validation captured it.
        Self::set(document, self.member, self.previous.unwrap())
    }
    /// Slider drags arrive as a burst of these; they collapse to one undo step.
    fn is_mergeable_with(&self, other: &dyn Change) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other.member == self.member)
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Toggle a member's visibility, stored in its visible socket.
#[derive(Debug)]
pub struct SetStructureVisibility {
    pub member: NodeId,
    pub visible: bool,
    previous: Option<bool>,
}
impl SetStructureVisibility {
    #[must_use]
    pub fn new(member: NodeId, visible: bool) -> Self {
        Self {
            member,
            visible,
            previous: None,
        }
    }
    fn set(document: &mut Document, member: NodeId, visible: bool) -> Result<Applied, ChangeError> {
        let socket = document
            .graph_mut()
            .get_mut(member)
            .ok_or(ChangeError::MismatchedState)?
            .input_mut(schema::VISIBLE)
            .ok_or(ChangeError::MismatchedState)?;
        socket.value = SocketValue::Bool(visible);
        Ok(ChangeInfo::VisibilityChanged { member, visible }.into())
    }
}
impl Change for SetStructureVisibility {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let Some(node) = document.graph().get(self.member) else {
            return false;
        };
        if !node.is_structure() {
            return false;
        }
        let Some(current) = node
            .input(schema::VISIBLE)
            .and_then(|socket| socket.value.bool())
        else {
            return false;
        };
        if current == self.visible {
            return false;
        }
        self.previous = Some(current);
        true
    }
    fn apply(
        &mut self,
        document: &mut Document,
        _first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        Ok(AppliedWithUndo {
            applied: Self::set(document, self.member, self.visible)?,
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - validation captured it.
        Self::set(document, self.member, self.previous.unwrap())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Deep-copy a member (and, for folders, its content) and splice the copy in
/// directly above the original.
#[derive(Debug)]
pub struct DuplicateStructureMember {
    pub member: NodeId,
    clones: Vec<Node>,
    new_member: Option<NodeId>,
    /// Surfaces for the cloned layers, forked from the originals on first
    /// apply and reattached on redo.
    rasters: HashMap<NodeId, SurfaceHandle>,
    /// `(old layer id, new layer id)` pairs needing a forked surface.
    layer_map: Vec<(NodeId, NodeId)>,
    location: Option<(Option<NodeId>, usize)>,
}
impl DuplicateStructureMember {
    #[must_use]
    pub fn new(member: NodeId) -> Self {
        Self {
            member,
            clones: Vec::new(),
            new_member: None,
            rasters: HashMap::new(),
            layer_map: Vec::new(),
            location: None,
        }
    }
}
impl Change for DuplicateStructureMember {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let graph = document.graph();
        let Some(location) = graph.member_location(self.member) else {
            return false;
        };
        let Ok((clones, id_map)) = graph.clone_structure(self.member) else {
            return false;
        };
        self.location = Some(location);
        // Unwrap OK - the cloned member is in its own map.
        self.new_member = Some(*id_map.get(&self.member).unwrap());
        self.layer_map = id_map
            .iter()
            .filter(|(old, _)| document.raster(**old).is_some())
            .map(|(old, new)| (*old, *new))
            .collect();
        self.clones = clones;
        true
    }
    fn apply(
        &mut self,
        document: &mut Document,
        first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        for clone in &self.clones {
            document
                .graph_mut()
                .add_node(clone.clone())
                .map_err(|_| ChangeError::MismatchedState)?;
        }
        if first_apply {
            for (old, new) in &self.layer_map {
                let forked = document
                    .raster(*old)
                    .ok_or(ChangeError::MismatchedState)?
                    .read()
                    .fork();
                let handle: SurfaceHandle =
                    std::sync::Arc::new(parking_lot::RwLock::new(forked));
                self.rasters.insert(*new, handle);
            }
        }
        for (id, raster) in &self.rasters {
            document.attach_raster(*id, raster.clone());
        }
        // Unwraps OK - validation captured them. Duplicate lands above the
        // original, at the original's index.
        let (parent, index) = self.location.unwrap();
        let new_member = self.new_member.unwrap();
        let index = document
            .graph_mut()
            .insert_member(new_member, parent, index)
            .map_err(|_| ChangeError::MismatchedState)?;
        let role = self.clones[0].role().ok_or(ChangeError::MismatchedState)?;
        Ok(AppliedWithUndo {
            applied: ChangeInfo::MemberCreated {
                member: new_member,
                role,
                parent,
                index,
            }
            .into(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - validation captured it.
        let new_member = self.new_member.unwrap();
        document
            .graph_mut()
            .remove_member(new_member)
            .map_err(|_| ChangeError::MismatchedState)?;
        for clone in &self.clones {
            for input in clone.inputs() {
                if input.connection.is_some() {
                    document
                        .graph_mut()
                        .disconnect(clone.id, &input.name)
                        .map_err(|_| ChangeError::MismatchedState)?;
                }
            }
        }
        for clone in &self.clones {
            document.detach_raster(clone.id);
            document
                .graph_mut()
                .remove_node(clone.id)
                .map_err(|_| ChangeError::MismatchedState)?;
        }
        Ok(ChangeInfo::MemberDeleted { member: new_member }.into())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
