//! Mapping change descriptions onto dirty canvas regions. The rules err
//! toward over-invalidation: a structural edit whose visual footprint is hard
//! to bound precisely marks the whole canvas rather than risk a stale tile.

use crate::change::info::ChangeInfo;
use crate::chunk::AffectedArea;
use crate::graph::schema::StructureRole;
use crate::graph::NodeId;
use crate::state::Document;

/// Where re-rendering is due after a batch.
#[derive(Default, Debug)]
pub struct DirtyAreas {
    /// Composite dirt: every tile whose final composed pixels may differ.
    pub global: AffectedArea,
    /// Per-layer dirt, for re-deriving that layer's resolution tiers.
    pub layers: hashbrown::HashMap<NodeId, AffectedArea>,
}
impl DirtyAreas {
    fn mark_layer(&mut self, layer: NodeId, area: &AffectedArea) {
        self.layers.entry(layer).or_default().union_with(area);
    }
}

/// The stored tiles of every raster layer inside a member (the member itself,
/// or its chained content for folders).
fn member_chunks(document: &Document, member: NodeId) -> AffectedArea {
    let graph = document.graph();
    let mut area = AffectedArea::default();
    let mut stack = vec![member];
    while let Some(id) = stack.pop() {
        if let Some(handle) = document.raster(id) {
            area.union_with(&AffectedArea::from_chunks(handle.read().coords()));
        }
        let is_folder = graph
            .get(id)
            .is_some_and(|node| node.role() == Some(StructureRole::Folder));
        if is_folder {
            if let Ok(children) = graph.children_of(Some(id)) {
                stack.extend(children);
            }
        }
    }
    area
}

/// Fold a batch's change descriptions into dirty areas, against the document
/// state *after* the batch applied.
#[must_use]
pub fn gather(document: &Document, infos: &[ChangeInfo]) -> DirtyAreas {
    let mut dirty = DirtyAreas::default();
    for info in infos {
        match info {
            ChangeInfo::LayerChunksChanged { node, area } => {
                dirty.global.union_with(area);
                dirty.mark_layer(*node, area);
            }
            // The member's pixels now compose differently, but only where the
            // member actually has pixels.
            ChangeInfo::OpacityChanged { member, .. }
            | ChangeInfo::VisibilityChanged { member, .. }
            | ChangeInfo::MemberMoved { member, .. }
            | ChangeInfo::MemberCreated { member, .. } => {
                let area = member_chunks(document, *member);
                for layer in area_layers(document, *member) {
                    dirty.mark_layer(layer, &member_chunks(document, layer));
                }
                dirty.global.union_with(&area);
            }
            // The deleted content is gone from the document, so its footprint
            // can't be recovered; invalidate everything. Same for re-wiring,
            // whose downstream effect is unbounded.
            ChangeInfo::MemberDeleted { .. }
            | ChangeInfo::NodeDeleted { .. }
            | ChangeInfo::PropertyConnected { .. }
            | ChangeInfo::PropertyDisconnected { .. }
            | ChangeInfo::PropertyValueSet { .. }
            | ChangeInfo::ChannelVisibilityChanged { .. } => {
                dirty.global.union_with(&AffectedArea::everything());
            }
            // A resize rewrote raster bytes on every layer (cropped tiles,
            // cleared edges), so each layer is dirty in full, not just the
            // composite.
            ChangeInfo::CanvasResized { .. } => {
                dirty.global.union_with(&AffectedArea::everything());
                for layer in document.raster_nodes() {
                    dirty.mark_layer(layer, &AffectedArea::everything());
                }
            }
            // A fresh node isn't wired to anything yet, and the rest is
            // overlay state the compositor draws separately.
            ChangeInfo::NodeCreated { .. }
            | ChangeInfo::NodeMoved { .. }
            | ChangeInfo::SymmetryChanged { .. }
            | ChangeInfo::SelectionChanged { .. } => {}
        }
    }
    dirty
}

/// Raster-bearing layers inside a member.
fn area_layers(document: &Document, member: NodeId) -> Vec<NodeId> {
    let graph = document.graph();
    let mut layers = Vec::new();
    let mut stack = vec![member];
    while let Some(id) = stack.pop() {
        if document.raster(id).is_some() {
            layers.push(id);
        }
        let is_folder = graph
            .get(id)
            .is_some_and(|node| node.role() == Some(StructureRole::Folder));
        if is_folder {
            if let Ok(children) = graph.children_of(Some(id)) {
                stack.extend(children);
            }
        }
    }
    layers
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::actions::{ChangeRegistry, EditRequest};
    use crate::graph::schema::{SchemaRegistry, KIND_FOLDER, KIND_IMAGE_LAYER};
    use crate::math::IVec2;
    use crate::tracker::{DocumentChangeTracker, TrackerOptions};

    use super::*;

    fn tracker() -> DocumentChangeTracker {
        DocumentChangeTracker::new(
            Document::new(IVec2::new(1024, 1024), Arc::new(SchemaRegistry::default())),
            ChangeRegistry::with_builtins(),
            TrackerOptions::default(),
        )
    }

    #[test]
    fn paint_dirt_is_local() {
        let mut tracker = tracker();
        let infos = tracker
            .process_requests([EditRequest::CreateStructureMember {
                kind: KIND_IMAGE_LAYER.to_owned(),
                name: "a".to_owned(),
                parent: None,
                index: 0,
            }])
            .unwrap();
        let layer = tracker.document().graph().children_of(None).unwrap()[0];
        // The creation itself dirties nothing - the layer is blank.
        let dirty = gather(tracker.document(), &infos);
        assert!(dirty.global.is_empty());

        let infos = tracker
            .process_requests([EditRequest::PaintPixels {
                layer,
                pixels: vec![(IVec2::new(300, 10), [1, 2, 3, 255])],
            }])
            .unwrap();
        let dirty = gather(tracker.document(), &infos);
        assert!(!dirty.global.everything);
        assert_eq!(
            dirty.global.chunks,
            [IVec2::new(1, 0)].into_iter().collect()
        );
        assert!(dirty.layers.contains_key(&layer));
    }
    #[test]
    fn opacity_dirt_covers_folder_content() {
        let mut tracker = tracker();
        tracker
            .process_requests([EditRequest::CreateStructureMember {
                kind: KIND_FOLDER.to_owned(),
                name: "group".to_owned(),
                parent: None,
                index: 0,
            }])
            .unwrap();
        let folder = tracker.document().graph().children_of(None).unwrap()[0];
        tracker
            .process_requests([EditRequest::CreateStructureMember {
                kind: KIND_IMAGE_LAYER.to_owned(),
                name: "inner".to_owned(),
                parent: Some(folder),
                index: 0,
            }])
            .unwrap();
        let inner = tracker
            .document()
            .graph()
            .children_of(Some(folder))
            .unwrap()[0];
        tracker
            .process_requests([EditRequest::PaintPixels {
                layer: inner,
                pixels: vec![(IVec2::new(5, 5), [9, 9, 9, 255])],
            }])
            .unwrap();

        let infos = tracker
            .process_requests([EditRequest::SetOpacity {
                member: folder,
                opacity: 0.5,
            }])
            .unwrap();
        let dirty = gather(tracker.document(), &infos);
        // The folder's opacity reaches exactly the tiles its content occupies.
        assert_eq!(dirty.global.chunks, [IVec2::ZERO].into_iter().collect());
    }
    #[test]
    fn structural_edits_invalidate_everything() {
        let mut tracker = tracker();
        tracker
            .process_requests([EditRequest::CreateStructureMember {
                kind: KIND_IMAGE_LAYER.to_owned(),
                name: "a".to_owned(),
                parent: None,
                index: 0,
            }])
            .unwrap();
        let layer = tracker.document().graph().children_of(None).unwrap()[0];
        let infos = tracker
            .process_requests([EditRequest::DeleteStructureMember { member: layer }])
            .unwrap();
        assert!(gather(tracker.document(), &infos).global.everything);

        let infos = tracker
            .process_requests([EditRequest::ResizeCanvas {
                size: IVec2::new(512, 512),
            }])
            .unwrap();
        assert!(gather(tracker.document(), &infos).global.everything);
    }
    #[test]
    fn resize_marks_every_layer() {
        let mut tracker = tracker();
        for name in ["a", "b"] {
            tracker
                .process_requests([EditRequest::CreateStructureMember {
                    kind: KIND_IMAGE_LAYER.to_owned(),
                    name: name.to_owned(),
                    parent: None,
                    index: 0,
                }])
                .unwrap();
        }
        let layers = tracker.document().graph().children_of(None).unwrap();
        let infos = tracker
            .process_requests([EditRequest::ResizeCanvas {
                size: IVec2::new(256, 256),
            }])
            .unwrap();
        let dirty = gather(tracker.document(), &infos);
        // Every layer's bytes were rewritten, so every layer is marked; the
        // revision bump downstream depends on these entries.
        for layer in layers {
            assert!(dirty.layers.get(&layer).is_some_and(|area| area.everything));
        }
    }
}
