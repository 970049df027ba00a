//! Raster edits. The only change here writes individual pixels; everything
//! fancier (lines, fills, brushes) is expected to arrive pre-rasterized as a
//! pixel list from the host's tools.

use crate::chunk::{chunk_of, AffectedArea, CommittedChunkStorage};
use crate::graph::NodeId;
use crate::math::IVec2;
use crate::state::Document;

use super::info::ChangeInfo;
use super::{Applied, AppliedWithUndo, Change, ChangeError};

/// Stamp a list of pixels onto one layer's surface. Pixels outside the canvas
/// are discarded at validation; a stamp that lands entirely outside is
/// rejected as a no-op.
///
/// Undo snapshots only the tiles the stamp touches, captured before the first
/// write. Consecutive stamps onto the same layer merge into one undo step, so
/// a drag reported as many small batches still undoes as one stroke.
#[derive(Debug)]
pub struct PaintPixels {
    pub layer: NodeId,
    pixels: Vec<(IVec2, [u8; 4])>,
    storage: CommittedChunkStorage,
}
impl PaintPixels {
    #[must_use]
    pub fn new(layer: NodeId, pixels: Vec<(IVec2, [u8; 4])>) -> Self {
        Self {
            layer,
            pixels,
            storage: CommittedChunkStorage::new(),
        }
    }
    fn touched_chunks(&self) -> impl Iterator<Item = IVec2> + '_ {
        self.pixels.iter().map(|(pixel, _)| chunk_of(*pixel))
    }
}
impl Change for PaintPixels {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        if document.raster(self.layer).is_none() {
            return false;
        }
        let bounds = document.bounds();
        self.pixels.retain(|(pixel, _)| bounds.contains(*pixel));
        !self.pixels.is_empty()
    }
    fn apply(
        &mut self,
        document: &mut Document,
        first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        let handle = document
            .raster(self.layer)
            .ok_or(ChangeError::MismatchedState)?
            .clone();
        {
            let mut surface = handle.write();
            if first_apply {
                let coords: Vec<IVec2> = self.touched_chunks().collect();
                self.storage.capture(&surface, coords);
            }
            for (pixel, color) in &self.pixels {
                surface.write_pixel(*pixel, *color);
            }
        }
        Ok(AppliedWithUndo {
            applied: ChangeInfo::LayerChunksChanged {
                node: self.layer,
                area: AffectedArea::from_chunks(self.touched_chunks()),
            }
            .into(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        let handle = document
            .raster(self.layer)
            .ok_or(ChangeError::MismatchedState)?
            .clone();
        self.storage.restore(&mut handle.write());
        Ok(ChangeInfo::LayerChunksChanged {
            node: self.layer,
            area: AffectedArea::from_chunks(self.storage.coords()),
        }
        .into())
    }
    fn is_mergeable_with(&self, other: &dyn Change) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other.layer == self.layer)
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::change::structure::CreateStructureMember;
    use crate::change::TrackedChange;
    use crate::graph::schema::{SchemaRegistry, KIND_IMAGE_LAYER};
    use crate::math::IVec2;
    use crate::state::Document;

    use super::*;

    fn document_with_layer() -> (Document, NodeId) {
        let mut document = Document::new(IVec2::new(512, 512), Arc::new(SchemaRegistry::default()));
        let mut create = TrackedChange::new(Box::new(CreateStructureMember::new(
            KIND_IMAGE_LAYER.to_owned(),
            "layer".to_owned(),
            None,
            0,
        )));
        assert!(create.initialize_and_validate(&document));
        create.apply(&mut document, true).unwrap();
        let layer = document.graph().children_of(None).unwrap()[0];
        (document, layer)
    }

    #[test]
    fn paint_clips_to_canvas() {
        let (document, layer) = document_with_layer();
        let mut paint = PaintPixels::new(
            layer,
            vec![
                (IVec2::new(10, 10), [255, 0, 0, 255]),
                (IVec2::new(-5, 10), [255, 0, 0, 255]),
                (IVec2::new(600, 10), [255, 0, 0, 255]),
            ],
        );
        assert!(paint.initialize_and_validate(&document));
        assert_eq!(paint.pixels.len(), 1);

        // All outside: rejected outright.
        let mut outside = PaintPixels::new(layer, vec![(IVec2::new(-1, -1), [1, 1, 1, 1])]);
        assert!(!outside.initialize_and_validate(&document));
    }
    #[test]
    fn paint_undo_restores_bytes() {
        let (mut document, layer) = document_with_layer();
        let mut paint = TrackedChange::new(Box::new(PaintPixels::new(
            layer,
            vec![(IVec2::new(10, 10), [255, 0, 0, 255])],
        )));
        assert!(paint.initialize_and_validate(&document));
        paint.apply(&mut document, true).unwrap();
        {
            let surface = document.raster(layer).unwrap().read();
            assert_eq!(surface.read_pixel(IVec2::new(10, 10)), [255, 0, 0, 255]);
            assert_eq!(surface.chunk_count(), 1);
        }
        paint.revert(&mut document).unwrap();
        {
            // The tile didn't exist before, so undo drops it entirely.
            let surface = document.raster(layer).unwrap().read();
            assert_eq!(surface.chunk_count(), 0);
        }
        // Redo replays without recapturing.
        paint.apply(&mut document, false).unwrap();
        let surface = document.raster(layer).unwrap().read();
        assert_eq!(surface.read_pixel(IVec2::new(10, 10)), [255, 0, 0, 255]);
    }
}
