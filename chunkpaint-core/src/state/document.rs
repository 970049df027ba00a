use std::sync::Arc;

use crate::chunk::ChunkSurface;
use crate::graph::{schema, NodeGraph, NodeId};
use crate::math::{IVec2, IntRect};

use super::{ChannelVisibility, Selection, Symmetry};

pub type DocumentId = crate::Unique<Document>;

/// Shared handle to one layer's raster tiles. Renderers hold clones of the
/// `Arc` and take read locks; only changes (and the render-instruction step)
/// take the write lock.
pub type SurfaceHandle = Arc<parking_lot::RwLock<ChunkSurface>>;

/// The mutable root. Owned exclusively by the
/// [`crate::tracker::DocumentChangeTracker`]; all mutation happens inside a
/// change's apply/revert, which is why the mutating accessors are crate-private.
pub struct Document {
    id: DocumentId,
    size: IVec2,
    graph: NodeGraph,
    rasters: hashbrown::HashMap<NodeId, SurfaceHandle>,
    selection: Selection,
    symmetry: Symmetry,
    channels: ChannelVisibility,
    registry: Arc<schema::SchemaRegistry>,
}
impl Document {
    /// A blank document of the given size, holding only the output node.
    #[must_use]
    pub fn new(size: IVec2, registry: Arc<schema::SchemaRegistry>) -> Self {
        Self {
            id: DocumentId::new(),
            size,
            graph: NodeGraph::new(&registry),
            rasters: hashbrown::HashMap::new(),
            selection: Selection::default(),
            symmetry: Symmetry::default(),
            channels: ChannelVisibility::default(),
            registry,
        }
    }
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }
    #[must_use]
    pub fn size(&self) -> IVec2 {
        self.size
    }
    /// The canvas as a pixel rect anchored at the origin.
    #[must_use]
    pub fn bounds(&self) -> IntRect {
        IntRect::from_origin_size(IVec2::ZERO, self.size)
    }
    #[must_use]
    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }
    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection
    }
    #[must_use]
    pub fn symmetry(&self) -> Symmetry {
        self.symmetry
    }
    #[must_use]
    pub fn channels(&self) -> ChannelVisibility {
        self.channels
    }
    #[must_use]
    pub fn registry(&self) -> &Arc<schema::SchemaRegistry> {
        &self.registry
    }
    /// The raster surface backing a layer node, if it has one.
    #[must_use]
    pub fn raster(&self, node: NodeId) -> Option<&SurfaceHandle> {
        self.rasters.get(&node)
    }
    /// Layer nodes that currently own raster surfaces, in arbitrary order.
    pub fn raster_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.rasters.keys().copied()
    }

    pub(crate) fn graph_mut(&mut self) -> &mut NodeGraph {
        &mut self.graph
    }
    pub(crate) fn set_size(&mut self, size: IVec2) {
        self.size = size;
    }
    pub(crate) fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }
    pub(crate) fn symmetry_mut(&mut self) -> &mut Symmetry {
        &mut self.symmetry
    }
    pub(crate) fn channels_mut(&mut self) -> &mut ChannelVisibility {
        &mut self.channels
    }
    /// Allocate a blank surface for a layer node. Reinserting an id is an
    /// invariant breach upstream, so the old surface is simply replaced.
    pub(crate) fn create_raster(&mut self, node: NodeId) -> SurfaceHandle {
        let handle: SurfaceHandle = Arc::new(parking_lot::RwLock::new(ChunkSurface::new()));
        self.rasters.insert(node, handle.clone());
        handle
    }
    /// Attach an existing surface handle (undo of a delete, redo of a
    /// duplicate - the handle outlives the node inside the change).
    pub(crate) fn attach_raster(&mut self, node: NodeId, handle: SurfaceHandle) {
        self.rasters.insert(node, handle);
    }
    pub(crate) fn detach_raster(&mut self, node: NodeId) -> Option<SurfaceHandle> {
        self.rasters.remove(&node)
    }
}
