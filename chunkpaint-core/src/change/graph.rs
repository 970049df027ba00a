//! Changes operating on the raw node graph: wiring, property values, node
//! creation/removal. Structure-member edits (layers, folders) have their own
//! richer changes in [`super::structure`].

use crate::graph::schema::{self, SocketValue};
use crate::graph::{Connection, Node, NodeId};
use crate::state::Document;

use super::info::ChangeInfo;
use super::{Applied, AppliedWithUndo, Change, ChangeError};

/// Wire an output socket into an input socket, replacing whatever the input
/// held before.
#[derive(Debug)]
pub struct ConnectProperties {
    pub from: NodeId,
    pub output: String,
    pub to: NodeId,
    pub input: String,
    /// What the input held before, captured at validation.
    previous: Option<Connection>,
}
impl ConnectProperties {
    #[must_use]
    pub fn new(from: NodeId, output: String, to: NodeId, input: String) -> Self {
        Self {
            from,
            output,
            to,
            input,
            previous: None,
        }
    }
}
impl Change for ConnectProperties {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let graph = document.graph();
        if graph
            .check_connect(self.from, &self.output, self.to, &self.input)
            .is_err()
        {
            return false;
        }
        // Unwraps OK - check_connect verified node and socket.
        let current = graph
            .get(self.to)
            .unwrap()
            .input(&self.input)
            .unwrap()
            .connection
            .clone();
        if current
            .as_ref()
            .is_some_and(|connection| connection.node == self.from && connection.output == self.output)
        {
            // Already wired exactly so.
            return false;
        }
        self.previous = current;
        true
    }
    fn apply(
        &mut self,
        document: &mut Document,
        _first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        document
            .graph_mut()
            .connect(self.from, &self.output, self.to, &self.input)
            .map_err(|_| ChangeError::MismatchedState)?;
        Ok(AppliedWithUndo {
            applied: ChangeInfo::PropertyConnected {
                from: self.from,
                output: self.output.clone(),
                to: self.to,
                input: self.input.clone(),
            }
            .into(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        document
            .graph_mut()
            .disconnect(self.to, &self.input)
            .map_err(|_| ChangeError::MismatchedState)?;
        match &self.previous {
            Some(previous) => {
                document
                    .graph_mut()
                    .connect(previous.node, &previous.output, self.to, &self.input)
                    .map_err(|_| ChangeError::MismatchedState)?;
                Ok(ChangeInfo::PropertyConnected {
                    from: previous.node,
                    output: previous.output.clone(),
                    to: self.to,
                    input: self.input.clone(),
                }
                .into())
            }
            None => Ok(ChangeInfo::PropertyDisconnected {
                node: self.to,
                input: self.input.clone(),
            }
            .into()),
        }
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[derive(Debug)]
pub struct DisconnectProperty {
    pub node: NodeId,
    pub input: String,
    previous: Option<Connection>,
}
impl DisconnectProperty {
    #[must_use]
    pub fn new(node: NodeId, input: String) -> Self {
        Self {
            node,
            input,
            previous: None,
        }
    }
}
impl Change for DisconnectProperty {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let Some(node) = document.graph().get(self.node) else {
            return false;
        };
        let Some(socket) = node.input(&self.input) else {
            return false;
        };
        // Disconnecting nothing is a no-op.
        match &socket.connection {
            Some(connection) => {
                self.previous = Some(connection.clone());
                true
            }
            None => false,
        }
    }
    fn apply(
        &mut self,
        document: &mut Document,
        _first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        document
            .graph_mut()
            .disconnect(self.node, &self.input)
            .map_err(|_| ChangeError::MismatchedState)?;
        Ok(AppliedWithUndo {
            applied: ChangeInfo::PropertyDisconnected {
                node: self.node,
                input: self.input.clone(),
            }
            .into(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - validation captured it.
        let previous = self.previous.as_ref().unwrap();
        document
            .graph_mut()
            .connect(previous.node, &previous.output, self.node, &self.input)
            .map_err(|_| ChangeError::MismatchedState)?;
        Ok(ChangeInfo::PropertyConnected {
            from: previous.node,
            output: previous.output.clone(),
            to: self.node,
            input: self.input.clone(),
        }
        .into())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Set an input socket's inline value.
#[derive(Debug)]
pub struct UpdateProperty {
    pub node: NodeId,
    pub input: String,
    pub value: SocketValue,
    previous: Option<SocketValue>,
}
impl UpdateProperty {
    #[must_use]
    pub fn new(node: NodeId, input: String, value: SocketValue) -> Self {
        Self {
            node,
            input,
            value,
            previous: None,
        }
    }
    fn set(
        document: &mut Document,
        node: NodeId,
        input: &str,
        value: &SocketValue,
    ) -> Result<Applied, ChangeError> {
        let socket = document
            .graph_mut()
            .get_mut(node)
            .ok_or(ChangeError::MismatchedState)?
            .input_mut(input)
            .ok_or(ChangeError::MismatchedState)?;
        socket.value = value.clone();
        Ok(ChangeInfo::PropertyValueSet {
            node,
            input: input.to_owned(),
            value: value.clone(),
        }
        .into())
    }
}
impl Change for UpdateProperty {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let Some(node) = document.graph().get(self.node) else {
            return false;
        };
        let Some(socket) = node.input(&self.input) else {
            return false;
        };
        // Raster inputs carry no inline value, and the value type must match
        // the socket type exactly.
        if self.value.ty() != Some(socket.ty) {
            return false;
        }
        if socket.value == self.value {
            return false;
        }
        self.previous = Some(socket.value.clone());
        true
    }
    fn apply(
        &mut self,
        document: &mut Document,
        _first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        Ok(AppliedWithUndo {
            applied: Self::set(document, self.node, &self.input, &self.value)?,
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - validation captured it.
        let previous = self.previous.clone().unwrap();
        Self::set(document, self.node, &self.input, &previous)
    }
    fn is_mergeable_with(&self, other: &dyn Change) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other.node == self.node && other.input == self.input)
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Create a free-standing node of a registered kind. Structure members should
/// go through [`super::structure::CreateStructureMember`] instead, which also
/// splices them into a chain.
#[derive(Debug)]
pub struct CreateNode {
    pub kind: String,
    pub name: String,
    pub position: (f32, f32),
    /// Allocated on first apply, then reused so redo is id-stable.
    id: Option<NodeId>,
    raster: Option<crate::state::document::SurfaceHandle>,
}
impl CreateNode {
    #[must_use]
    pub fn new(kind: String, name: String, position: (f32, f32)) -> Self {
        Self {
            kind,
            name,
            position,
            id: None,
            raster: None,
        }
    }
}
impl Change for CreateNode {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        self.kind != schema::KIND_OUTPUT && document.registry().get(&self.kind).is_some()
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
        let node = Node::from_spec(&spec, id, self.name.clone(), self.position);
        let is_layer = node.role() == Some(schema::StructureRole::Layer);
        document
            .graph_mut()
            .add_node(node)
            .map_err(|_| ChangeError::MismatchedState)?;
        if is_layer {
            if first_apply {
                self.raster = Some(document.create_raster(id));
            } else {
                // Unwrap OK - first apply stored it.
                document.attach_raster(id, self.raster.clone().unwrap());
            }
        }
        Ok(AppliedWithUndo {
            applied: ChangeInfo::NodeCreated {
                node: id,
                kind: self.kind.clone(),
                position: self.position,
            }
            .into(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - apply allocated it.
        let id = self.id.unwrap();
        document.detach_raster(id);
        document
            .graph_mut()
            .remove_node(id)
            .map_err(|_| ChangeError::MismatchedState)?;
        Ok(ChangeInfo::NodeDeleted { node: id }.into())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Delete a free-standing node, first severing every connection touching it
/// (recorded, so revert rewires everything exactly).
#[derive(Debug)]
pub struct DeleteNode {
    pub node: NodeId,
    saved: Option<Node>,
    /// `(consumer, input name, our output name)` for every connection out of us.
    consumers: Vec<(NodeId, String, String)>,
    raster: Option<crate::state::document::SurfaceHandle>,
}
impl DeleteNode {
    #[must_use]
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            saved: None,
            consumers: Vec::new(),
            raster: None,
        }
    }
}
impl Change for DeleteNode {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let graph = document.graph();
        if self.node == graph.output_node() {
            return false;
        }
        let Some(node) = graph.get(self.node) else {
            return false;
        };
        // Members sitting in a structure chain need the bridging logic of
        // DeleteStructureMember; deleting them raw would orphan the chain.
        if node.is_structure() && graph.member_location(self.node).is_some() {
            return false;
        }
        self.saved = Some(node.clone());
        self.consumers = graph
            .consumers_of(self.node)
            .into_iter()
            .map(|(consumer, input)| {
                // Unwraps OK - consumers_of only reports live connections.
                let output = graph
                    .get(consumer)
                    .unwrap()
                    .input(&input)
                    .unwrap()
                    .connection
                    .as_ref()
                    .unwrap()
                    .output
                    .clone();
                (consumer, input, output)
            })
            .collect();
        true
    }
    fn apply(
        &mut self,
        document: &mut Document,
        _first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        let mut infos: Vec<ChangeInfo> = Vec::new();
        // Sever our own inputs...
        // Unwrap OK - validation captured it.
        for input in self.saved.as_ref().unwrap().inputs() {
            if input.connection.is_some() {
                document
                    .graph_mut()
                    .disconnect(self.node, &input.name)
                    .map_err(|_| ChangeError::MismatchedState)?;
            }
        }
        // ...and everything consuming us.
        for (consumer, input, _) in &self.consumers {
            document
                .graph_mut()
                .disconnect(*consumer, input)
                .map_err(|_| ChangeError::MismatchedState)?;
            infos.push(ChangeInfo::PropertyDisconnected {
                node: *consumer,
                input: input.clone(),
            });
        }
        self.raster = document.detach_raster(self.node);
        document
            .graph_mut()
            .remove_node(self.node)
            .map_err(|_| ChangeError::MismatchedState)?;
        infos.push(ChangeInfo::NodeDeleted { node: self.node });
        Ok(AppliedWithUndo {
            applied: infos.into_iter().collect(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - validation captured it. The clone keeps our own input
        // connections, so re-adding restores them wholesale.
        let saved = self.saved.clone().unwrap();
        let mut infos = vec![ChangeInfo::NodeCreated {
            node: saved.id,
            kind: saved.kind.to_owned(),
            position: saved.position,
        }];
        for input in saved.inputs() {
            if let Some(connection) = &input.connection {
                infos.push(ChangeInfo::PropertyConnected {
                    from: connection.node,
                    output: connection.output.clone(),
                    to: saved.id,
                    input: input.name.clone(),
                });
            }
        }
        document
            .graph_mut()
            .add_node(saved)
            .map_err(|_| ChangeError::MismatchedState)?;
        if let Some(raster) = &self.raster {
            document.attach_raster(self.node, raster.clone());
        }
        for (consumer, input, output) in &self.consumers {
            document
                .graph_mut()
                .connect(self.node, output, *consumer, input)
                .map_err(|_| ChangeError::MismatchedState)?;
            infos.push(ChangeInfo::PropertyConnected {
                from: self.node,
                output: output.clone(),
                to: *consumer,
                input: input.clone(),
            });
        }
        Ok(infos.into_iter().collect())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Move a node's display position. Pure UI state, but undoable like the rest.
#[derive(Debug)]
pub struct MoveNode {
    pub node: NodeId,
    pub to: (f32, f32),
    from: Option<(f32, f32)>,
}
impl MoveNode {
    #[must_use]
    pub fn new(node: NodeId, to: (f32, f32)) -> Self {
        Self {
            node,
            to,
            from: None,
        }
    }
    fn set(
        document: &mut Document,
        node: NodeId,
        position: (f32, f32),
    ) -> Result<Applied, ChangeError> {
        document
            .graph_mut()
            .get_mut(node)
            .ok_or(ChangeError::MismatchedState)?
            .position = position;
        Ok(ChangeInfo::NodeMoved { node, position }.into())
    }
}
impl Change for MoveNode {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let Some(node) = document.graph().get(self.node) else {
            return false;
        };
        if node.position == self.to {
            return false;
        }
        self.from = Some(node.position);
        true
    }
    fn apply(
        &mut self,
        document: &mut Document,
        _first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        Ok(AppliedWithUndo {
            applied: Self::set(document, self.node, self.to)?,
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - validation captured it.
        Self::set(document, self.node, self.from.unwrap())
    }
    fn is_mergeable_with(&self, other: &dyn Change) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other.node == self.node)
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
