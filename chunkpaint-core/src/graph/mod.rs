//! # Node graph
//!
//! The document renders through a DAG of typed nodes connected via input/output
//! sockets. An input holds at most one connection; an output may feed many
//! inputs. The graph owns structure and traversal only - undo semantics live in
//! [`crate::change`], rasterization lives outside the crate entirely.
//!
//! Layers and folders are "structure" nodes: members chain to the sibling below
//! through their [`schema::BACKGROUND`] input, and a container (a folder, or the
//! document's output node) hangs its top member off its [`schema::CONTENT`]
//! input. That makes folder content an internally chained sub-graph which can be
//! rendered as a unit and swapped wholesale.

pub mod schema;

use schema::{NodeSpec, SocketType, SocketValue, StructureRole, BACKGROUND, CONTENT, OUTPUT};

pub type NodeId = crate::Unique<Node>;

/// A reference to one output socket of one node.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct Connection {
    pub node: NodeId,
    pub output: String,
}

#[derive(Clone, Debug)]
pub struct InputSocket {
    pub name: String,
    pub ty: SocketType,
    /// Inline value used when unconnected. Always `None` for raster sockets.
    pub value: SocketValue,
    pub connection: Option<Connection>,
}
#[derive(Clone, Debug)]
pub struct OutputSocket {
    pub name: String,
    pub ty: SocketType,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: &'static str,
    /// User-facing name, irrelevant to rendering.
    pub name: String,
    /// Display position for graph editing UI, irrelevant to rendering.
    pub position: (f32, f32),
    role: Option<StructureRole>,
    inputs: Vec<InputSocket>,
    outputs: Vec<OutputSocket>,
}
impl Node {
    /// Instantiate a node of the given kind with default socket values.
    #[must_use]
    pub fn from_spec(spec: &NodeSpec, id: NodeId, name: String, position: (f32, f32)) -> Self {
        Self {
            id,
            kind: spec.kind,
            name,
            position,
            role: spec.role,
            inputs: spec
                .inputs
                .iter()
                .map(|input| InputSocket {
                    name: input.name.to_owned(),
                    ty: input.ty,
                    value: input.default.clone(),
                    connection: None,
                })
                .collect(),
            outputs: spec
                .outputs
                .iter()
                .map(|output| OutputSocket {
                    name: output.name.to_owned(),
                    ty: output.ty,
                })
                .collect(),
        }
    }
    #[must_use]
    pub fn role(&self) -> Option<StructureRole> {
        self.role
    }
    #[must_use]
    pub fn is_structure(&self) -> bool {
        self.role.is_some()
    }
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&InputSocket> {
        self.inputs.iter().find(|socket| socket.name == name)
    }
    pub(crate) fn input_mut(&mut self, name: &str) -> Option<&mut InputSocket> {
        self.inputs.iter_mut().find(|socket| socket.name == name)
    }
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputSocket> {
        self.outputs.iter().find(|socket| socket.name == name)
    }
    #[must_use]
    pub fn inputs(&self) -> &[InputSocket] {
        &self.inputs
    }
    #[must_use]
    pub fn outputs(&self) -> &[OutputSocket] {
        &self.outputs
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("node not found")]
    NodeNotFound,
    #[error("socket not found on node")]
    SocketNotFound,
    #[error("socket value types differ")]
    TypeMismatch,
    #[error("connection would create a cycle")]
    CycleDetected,
    #[error("node is still connected; detach before removal")]
    StillConnected,
    #[error("the output node cannot be removed")]
    OutputNodeImmutable,
    #[error("a node with this id already exists")]
    DuplicateNode,
}

/// Tri-state signal returned by traversal visitors.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Visit {
    Continue,
    /// Don't expand this node's neighbors; keep visiting other branches.
    PruneBranch,
    /// Stop the whole traversal.
    Abort,
}

/// The DAG of render nodes. Exactly one designated output node exists for the
/// graph's whole lifetime; its resolved value is the document's rendered result.
pub struct NodeGraph {
    nodes: hashbrown::HashMap<NodeId, Node>,
    /// Insertion order, so iteration and forward traversal are reproducible
    /// for a fixed graph. Kept in sync with `nodes`.
    order: Vec<NodeId>,
    output: NodeId,
}
impl NodeGraph {
    /// A graph containing only the designated output node.
    #[must_use]
    pub fn new(registry: &schema::SchemaRegistry) -> Self {
        let spec = registry
            .get(schema::KIND_OUTPUT)
            .expect("schema registry must provide the output kind");
        let id = NodeId::new();
        let node = Node::from_spec(spec, id, "Output".to_owned(), (0.0, 0.0));
        let mut nodes = hashbrown::HashMap::new();
        nodes.insert(id, node);
        Self {
            nodes,
            order: vec![id],
            output: id,
        }
    }
    #[must_use]
    pub fn output_node(&self) -> NodeId {
        self.output
    }
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }
    /// Number of nodes, the output node included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        // Never true - the output node is always present.
        self.order.is_empty()
    }
    /// Iterate all nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        // Unwrap OK - `order` only holds ids present in `nodes`.
        self.order.iter().map(|id| self.nodes.get(id).unwrap())
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode);
        }
        self.order.push(node.id);
        self.nodes.insert(node.id, node);
        Ok(())
    }
    /// Remove a fully detached node, returning it. Connections are *not*
    /// severed automatically - a still-wired node is an error, so that callers
    /// are forced to record the detachment where it can be undone.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        if id == self.output {
            return Err(GraphError::OutputNodeImmutable);
        }
        let node = self.nodes.get(&id).ok_or(GraphError::NodeNotFound)?;
        if node.inputs.iter().any(|input| input.connection.is_some())
            || !self.consumers_of(id).is_empty()
        {
            return Err(GraphError::StillConnected);
        }
        self.order.retain(|other| *other != id);
        // Unwrap OK - presence checked above.
        Ok(self.nodes.remove(&id).unwrap())
    }

    /// Every `(consumer, input name)` currently fed by any output of `id`,
    /// in insertion order.
    #[must_use]
    pub fn consumers_of(&self, id: NodeId) -> Vec<(NodeId, String)> {
        self.iter()
            .flat_map(|node| {
                node.inputs.iter().filter_map(move |input| {
                    input
                        .connection
                        .as_ref()
                        .filter(|connection| connection.node == id)
                        .map(|_| (node.id, input.name.clone()))
                })
            })
            .collect()
    }

    /// Validate a prospective connection without mutating anything.
    pub fn check_connect(
        &self,
        from: NodeId,
        output: &str,
        to: NodeId,
        input: &str,
    ) -> Result<(), GraphError> {
        let from_node = self.nodes.get(&from).ok_or(GraphError::NodeNotFound)?;
        let to_node = self.nodes.get(&to).ok_or(GraphError::NodeNotFound)?;
        let output_socket = from_node.output(output).ok_or(GraphError::SocketNotFound)?;
        let input_socket = to_node.input(input).ok_or(GraphError::SocketNotFound)?;
        if output_socket.ty != input_socket.ty {
            return Err(GraphError::TypeMismatch);
        }
        // Edge would run from -> to. A cycle exists exactly when `to` is already
        // reachable walking backward from `from`.
        if from == to {
            return Err(GraphError::CycleDetected);
        }
        let mut cyclic = false;
        self.traverse_backward(from, |node| {
            if node.id == to {
                cyclic = true;
                Visit::Abort
            } else {
                Visit::Continue
            }
        })?;
        if cyclic {
            return Err(GraphError::CycleDetected);
        }
        Ok(())
    }
    /// Connect an output to an input, replacing (and returning) any connection
    /// the input previously held.
    pub fn connect(
        &mut self,
        from: NodeId,
        output: &str,
        to: NodeId,
        input: &str,
    ) -> Result<Option<Connection>, GraphError> {
        self.check_connect(from, output, to, input)?;
        // Unwraps OK - existence checked by check_connect.
        let socket = self.nodes.get_mut(&to).unwrap().input_mut(input).unwrap();
        Ok(socket.connection.replace(Connection {
            node: from,
            output: output.to_owned(),
        }))
    }
    /// Sever an input's connection, returning what it held (None if unconnected).
    pub fn disconnect(
        &mut self,
        node: NodeId,
        input: &str,
    ) -> Result<Option<Connection>, GraphError> {
        let socket = self
            .nodes
            .get_mut(&node)
            .ok_or(GraphError::NodeNotFound)?
            .input_mut(input)
            .ok_or(GraphError::SocketNotFound)?;
        Ok(socket.connection.take())
    }

    /// Breadth-first walk against the data flow: from `start` through everything
    /// that (transitively) feeds it. Cycle-safe; each node is visited at most
    /// once even under diamond sharing. Returns `Ok(false)` if the visitor
    /// aborted, `Ok(true)` if the walk ran to completion.
    pub fn traverse_backward<F: FnMut(&Node) -> Visit>(
        &self,
        start: NodeId,
        visit: F,
    ) -> Result<bool, GraphError> {
        self.traverse(start, visit, |node| {
            node.inputs
                .iter()
                .filter_map(|input| input.connection.as_ref().map(|connection| connection.node))
                .collect()
        })
    }
    /// Breadth-first walk with the data flow: from `start` through everything
    /// that (transitively) consumes it.
    pub fn traverse_forward<F: FnMut(&Node) -> Visit>(
        &self,
        start: NodeId,
        visit: F,
    ) -> Result<bool, GraphError> {
        self.traverse(start, visit, |node| {
            self.consumers_of(node.id)
                .into_iter()
                .map(|(id, _)| id)
                .collect()
        })
    }
    fn traverse<F, N>(&self, start: NodeId, mut visit: F, neighbors: N) -> Result<bool, GraphError>
    where
        F: FnMut(&Node) -> Visit,
        N: Fn(&Node) -> Vec<NodeId>,
    {
        if !self.nodes.contains_key(&start) {
            return Err(GraphError::NodeNotFound);
        }
        let mut visited = hashbrown::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        visited.insert(start);
        queue.push_back(start);
        while let Some(id) = queue.pop_front() {
            // Unwrap OK - only known ids are enqueued.
            let node = self.nodes.get(&id).unwrap();
            match visit(node) {
                Visit::Abort => return Ok(false),
                Visit::PruneBranch => continue,
                Visit::Continue => (),
            }
            for neighbor in neighbors(node) {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        Ok(true)
    }
}

// Structure-chain operations. These keep the layer/folder chaining invariant:
// container CONTENT -> top member, member BACKGROUND -> member below.
impl NodeGraph {
    /// The structure members of a container, top first. `None` means the root
    /// level (the chain hanging off the output node).
    pub fn children_of(&self, parent: Option<NodeId>) -> Result<Vec<NodeId>, GraphError> {
        let container = parent.unwrap_or(self.output);
        let container_node = self.nodes.get(&container).ok_or(GraphError::NodeNotFound)?;
        if parent.is_some() && container_node.role() != Some(StructureRole::Folder) {
            return Err(GraphError::SocketNotFound);
        }
        let mut children = Vec::new();
        let mut cursor = container_node
            .input(CONTENT)
            .ok_or(GraphError::SocketNotFound)?
            .connection
            .as_ref()
            .map(|connection| connection.node);
        while let Some(id) = cursor {
            // A chain longer than the node count means the structure invariant
            // broke somewhere. Don't loop forever over it.
            if children.len() > self.nodes.len() {
                debug_assert!(false, "structure chain contains a cycle");
                return Err(GraphError::CycleDetected);
            }
            children.push(id);
            cursor = self
                .nodes
                .get(&id)
                .ok_or(GraphError::NodeNotFound)?
                .input(BACKGROUND)
                .and_then(|input| input.connection.as_ref())
                .map(|connection| connection.node);
        }
        Ok(children)
    }
    /// The `(container, input-name)` whose structure socket consumes this
    /// member's output, if the member sits in a chain.
    fn structure_consumer_of(&self, member: NodeId) -> Option<(NodeId, &'static str)> {
        for (consumer, input) in self.consumers_of(member) {
            if input == CONTENT {
                return Some((consumer, CONTENT));
            }
            if input == BACKGROUND {
                return Some((consumer, BACKGROUND));
            }
        }
        None
    }
    /// Where a member sits: `(parent, index)`, parent `None` for the root level,
    /// index counted from the top. `None` if the member is detached.
    #[must_use]
    pub fn member_location(&self, member: NodeId) -> Option<(Option<NodeId>, usize)> {
        let mut index = 0;
        let mut cursor = member;
        loop {
            let (consumer, input) = self.structure_consumer_of(cursor)?;
            if input == CONTENT {
                let parent = (consumer != self.output).then_some(consumer);
                return Some((parent, index));
            }
            index += 1;
            cursor = consumer;
            if index > self.nodes.len() {
                debug_assert!(false, "structure chain contains a cycle");
                return None;
            }
        }
    }
    /// Splice an already-added, detached member into a container's chain.
    /// Indices beyond the end clamp to the bottom. Returns the actual index.
    pub fn insert_member(
        &mut self,
        member: NodeId,
        parent: Option<NodeId>,
        index: usize,
    ) -> Result<usize, GraphError> {
        if !self
            .nodes
            .get(&member)
            .ok_or(GraphError::NodeNotFound)?
            .is_structure()
        {
            return Err(GraphError::SocketNotFound);
        }
        let children = self.children_of(parent)?;
        let index = index.min(children.len());
        let container = parent.unwrap_or(self.output);
        let (anchor, anchor_input) = if index == 0 {
            (container, CONTENT)
        } else {
            (children[index - 1], BACKGROUND)
        };
        // The member that will sit below, if any.
        let below = self.disconnect(anchor, anchor_input)?;
        self.connect(member, OUTPUT, anchor, anchor_input)?;
        if let Some(below) = below {
            self.connect(below.node, &below.output, member, BACKGROUND)?;
        }
        Ok(index)
    }
    /// Unsplice a member from its chain, bridging the gap. The member itself
    /// stays in the graph (detached); callers remove it separately so the
    /// detachment is recordable. Returns where it was.
    pub fn remove_member(&mut self, member: NodeId) -> Result<(Option<NodeId>, usize), GraphError> {
        let (parent, index) = self
            .member_location(member)
            .ok_or(GraphError::NodeNotFound)?;
        let (anchor, anchor_input) = self
            .structure_consumer_of(member)
            .ok_or(GraphError::NodeNotFound)?;
        let below = self.disconnect(member, BACKGROUND)?;
        self.disconnect(anchor, anchor_input)?;
        if let Some(below) = below {
            self.connect(below.node, &below.output, anchor, anchor_input)?;
        }
        Ok((parent, index))
    }
    /// Deep-copy a member and (for folders) its chained content, producing
    /// fresh nodes with remapped connections and an old-to-new id mapping
    /// table. Connections leaving the copied sub-graph (notably the member's
    /// own background) are dropped. The clones are *not* inserted.
    pub fn clone_structure(
        &self,
        member: NodeId,
    ) -> Result<(Vec<Node>, hashbrown::HashMap<NodeId, NodeId>), GraphError> {
        // Everything backward-reachable from the member, except through its own
        // background input (that leads to siblings, not content).
        let mut collected: Vec<NodeId> = Vec::new();
        let mut seen = hashbrown::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        seen.insert(member);
        queue.push_back(member);
        while let Some(id) = queue.pop_front() {
            collected.push(id);
            let node = self.nodes.get(&id).ok_or(GraphError::NodeNotFound)?;
            for input in &node.inputs {
                if id == member && input.name == BACKGROUND {
                    continue;
                }
                if let Some(connection) = &input.connection {
                    if seen.insert(connection.node) {
                        queue.push_back(connection.node);
                    }
                }
            }
        }
        let id_map: hashbrown::HashMap<NodeId, NodeId> = collected
            .iter()
            .map(|old| (*old, NodeId::new()))
            .collect();
        let clones = collected
            .iter()
            .map(|old| {
                // Unwraps OK - collected ids came straight out of the map.
                let mut clone = self.nodes.get(old).unwrap().clone();
                clone.id = *id_map.get(old).unwrap();
                for input in &mut clone.inputs {
                    input.connection = match input.connection.take() {
                        Some(connection) => {
                            id_map
                                .get(&connection.node)
                                .map(|remapped| Connection {
                                    node: *remapped,
                                    output: connection.output,
                                })
                            // None: connection left the sub-graph; drop it.
                        }
                        None => None,
                    };
                }
                clone
            })
            .collect();
        Ok((clones, id_map))
    }
}

#[cfg(test)]
mod test {
    use super::schema::{SchemaRegistry, KIND_FILTER, KIND_FOLDER, KIND_IMAGE_LAYER, OUTPUT};
    use super::*;

    fn graph() -> (SchemaRegistry, NodeGraph) {
        let registry = SchemaRegistry::with_builtins();
        let graph = NodeGraph::new(&registry);
        (registry, graph)
    }
    fn add_kind(registry: &SchemaRegistry, graph: &mut NodeGraph, kind: &str) -> NodeId {
        let node = Node::from_spec(
            registry.get(kind).unwrap(),
            NodeId::new(),
            kind.to_owned(),
            (0.0, 0.0),
        );
        let id = node.id;
        graph.add_node(node).unwrap();
        id
    }

    #[test]
    fn connect_type_mismatch() {
        let (registry, mut graph) = graph();
        let layer = add_kind(&registry, &mut graph, KIND_IMAGE_LAYER);
        let filter = add_kind(&registry, &mut graph, KIND_FILTER);
        // Raster output into a scalar input.
        assert_eq!(
            graph.connect(layer, OUTPUT, filter, "strength"),
            Err(GraphError::TypeMismatch)
        );
    }
    #[test]
    fn connect_rejects_cycles() {
        let (registry, mut graph) = graph();
        let a = add_kind(&registry, &mut graph, KIND_FILTER);
        let b = add_kind(&registry, &mut graph, KIND_FILTER);
        let c = add_kind(&registry, &mut graph, KIND_FILTER);
        graph.connect(a, OUTPUT, b, "input").unwrap();
        graph.connect(b, OUTPUT, c, "input").unwrap();
        // c -> a closes the loop.
        assert_eq!(
            graph.connect(c, OUTPUT, a, "input"),
            Err(GraphError::CycleDetected)
        );
        // Self loops too.
        assert_eq!(
            graph.connect(a, OUTPUT, a, "input"),
            Err(GraphError::CycleDetected)
        );
    }
    #[test]
    fn remove_requires_detach() {
        let (registry, mut graph) = graph();
        let a = add_kind(&registry, &mut graph, KIND_FILTER);
        let b = add_kind(&registry, &mut graph, KIND_FILTER);
        graph.connect(a, OUTPUT, b, "input").unwrap();
        assert!(matches!(
            graph.remove_node(a),
            Err(GraphError::StillConnected)
        ));
        assert!(matches!(
            graph.remove_node(b),
            Err(GraphError::StillConnected)
        ));
        graph.disconnect(b, "input").unwrap();
        assert!(graph.remove_node(a).is_ok());
        assert!(graph.remove_node(b).is_ok());
        // And never the output node.
        assert!(matches!(
            graph.remove_node(graph.output_node()),
            Err(GraphError::OutputNodeImmutable)
        ));
    }
    #[test]
    fn diamond_visits_once() {
        let (registry, mut graph) = graph();
        // top feeds left and right, both feed bottom.
        let top = add_kind(&registry, &mut graph, KIND_FILTER);
        let left = add_kind(&registry, &mut graph, KIND_FILTER);
        let right = add_kind(&registry, &mut graph, KIND_FILTER);
        let bottom = add_kind(&registry, &mut graph, KIND_FOLDER);
        graph.connect(top, OUTPUT, left, "input").unwrap();
        graph.connect(top, OUTPUT, right, "input").unwrap();
        graph.connect(left, OUTPUT, bottom, CONTENT).unwrap();
        graph.connect(right, OUTPUT, bottom, BACKGROUND).unwrap();

        let mut visits = Vec::new();
        let completed = graph
            .traverse_backward(bottom, |node| {
                visits.push(node.id);
                Visit::Continue
            })
            .unwrap();
        assert!(completed);
        assert_eq!(visits.len(), 4, "each node visited exactly once");
        assert_eq!(visits[0], bottom);
        assert_eq!(*visits.last().unwrap(), top);
    }
    #[test]
    fn traversal_prune_and_abort() {
        let (registry, mut graph) = graph();
        let top = add_kind(&registry, &mut graph, KIND_FILTER);
        let mid = add_kind(&registry, &mut graph, KIND_FILTER);
        let bottom = add_kind(&registry, &mut graph, KIND_FILTER);
        graph.connect(top, OUTPUT, mid, "input").unwrap();
        graph.connect(mid, OUTPUT, bottom, "input").unwrap();

        // Prune at mid: top never seen.
        let mut visits = Vec::new();
        let completed = graph
            .traverse_backward(bottom, |node| {
                visits.push(node.id);
                if node.id == mid {
                    Visit::PruneBranch
                } else {
                    Visit::Continue
                }
            })
            .unwrap();
        assert!(completed);
        assert_eq!(visits, vec![bottom, mid]);

        // Abort at the start node.
        let completed = graph.traverse_backward(bottom, |_| Visit::Abort).unwrap();
        assert!(!completed);

        // Forward from top reaches everything downstream.
        let mut forward = Vec::new();
        graph
            .traverse_forward(top, |node| {
                forward.push(node.id);
                Visit::Continue
            })
            .unwrap();
        assert_eq!(forward, vec![top, mid, bottom]);
    }
    #[test]
    fn structure_chain_splice() {
        let (registry, mut graph) = graph();
        let a = add_kind(&registry, &mut graph, KIND_IMAGE_LAYER);
        let b = add_kind(&registry, &mut graph, KIND_IMAGE_LAYER);
        let c = add_kind(&registry, &mut graph, KIND_IMAGE_LAYER);
        graph.insert_member(a, None, 0).unwrap();
        // Insert above a.
        graph.insert_member(b, None, 0).unwrap();
        // Clamped to the bottom.
        assert_eq!(graph.insert_member(c, None, 99).unwrap(), 2);
        assert_eq!(graph.children_of(None).unwrap(), vec![b, a, c]);
        assert_eq!(graph.member_location(a), Some((None, 1)));

        // Unsplice the middle; the chain bridges.
        assert_eq!(graph.remove_member(a).unwrap(), (None, 1));
        assert_eq!(graph.children_of(None).unwrap(), vec![b, c]);
        assert_eq!(graph.member_location(a), None);
    }
    #[test]
    fn folder_content_is_chained() {
        let (registry, mut graph) = graph();
        let folder = add_kind(&registry, &mut graph, KIND_FOLDER);
        let inner = add_kind(&registry, &mut graph, KIND_IMAGE_LAYER);
        graph.insert_member(folder, None, 0).unwrap();
        graph.insert_member(inner, Some(folder), 0).unwrap();
        assert_eq!(graph.children_of(Some(folder)).unwrap(), vec![inner]);
        assert_eq!(graph.member_location(inner), Some((Some(folder), 0)));
        // A layer is not a container.
        assert_eq!(
            graph.children_of(Some(inner)),
            Err(GraphError::SocketNotFound)
        );
    }
    #[test]
    fn clone_structure_remaps_ids() {
        let (registry, mut graph) = graph();
        let folder = add_kind(&registry, &mut graph, KIND_FOLDER);
        let inner = add_kind(&registry, &mut graph, KIND_IMAGE_LAYER);
        let sibling = add_kind(&registry, &mut graph, KIND_IMAGE_LAYER);
        graph.insert_member(folder, None, 0).unwrap();
        graph.insert_member(sibling, None, 1).unwrap();
        graph.insert_member(inner, Some(folder), 0).unwrap();

        let (clones, id_map) = graph.clone_structure(folder).unwrap();
        assert_eq!(clones.len(), 2, "folder and its content, not the sibling");
        assert_eq!(id_map.len(), 2);
        let folder_clone = clones
            .iter()
            .find(|node| node.id == *id_map.get(&folder).unwrap())
            .unwrap();
        // Content connection remapped onto the cloned inner layer.
        assert_eq!(
            folder_clone
                .input(CONTENT)
                .unwrap()
                .connection
                .as_ref()
                .map(|connection| connection.node),
            Some(*id_map.get(&inner).unwrap())
        );
        // Background left the sub-graph and was dropped.
        assert!(folder_clone.input(BACKGROUND).unwrap().connection.is_none());
    }
}
