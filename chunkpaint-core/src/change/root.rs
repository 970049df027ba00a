//! Changes to document-level state: canvas size, symmetry guides, selection,
//! channel visibility.

use hashbrown::HashMap;

use crate::chunk::{Chunk, CommittedChunkStorage, ChunkSurface, CHUNK_SIZE};
use crate::graph::NodeId;
use crate::math::{IVec2, IntRect};
use crate::state::{ColorChannel, Document, Selection, SymmetryAxis};

use super::info::ChangeInfo;
use super::{Applied, AppliedWithUndo, Change, ChangeError};

/// Resize the canvas. Shrinking crops every layer: tiles fully outside the new
/// bounds are dropped, boundary tiles get their out-of-bounds pixels cleared.
/// Cropped bytes are snapshotted per layer so undo restores them.
#[derive(Debug)]
pub struct ResizeCanvas {
    pub size: IVec2,
    previous: Option<IVec2>,
    previous_selection: Option<Selection>,
    saved: HashMap<NodeId, CommittedChunkStorage>,
}
impl ResizeCanvas {
    #[must_use]
    pub fn new(size: IVec2) -> Self {
        Self {
            size,
            previous: None,
            previous_selection: None,
            saved: HashMap::new(),
        }
    }
    /// Crop one surface to `bounds`, snapshotting every tile that loses
    /// content. Capture keeps only the first snapshot per tile, so re-running
    /// on redo is harmless.
    fn crop(storage: &mut CommittedChunkStorage, surface: &mut ChunkSurface, bounds: IntRect) {
        let doomed: Vec<IVec2> = surface
            .coords()
            .filter(|coord| {
                let tile = IntRect::from_origin_size(*coord * CHUNK_SIZE, IVec2::new(CHUNK_SIZE, CHUNK_SIZE));
                match tile.intersect(&bounds) {
                    None => true,
                    Some(overlap) => overlap != tile,
                }
            })
            .collect();
        storage.capture(surface, doomed.iter().copied());
        for coord in doomed {
            let origin = coord * CHUNK_SIZE;
            let tile = IntRect::from_origin_size(origin, IVec2::new(CHUNK_SIZE, CHUNK_SIZE));
            match tile.intersect(&bounds) {
                None => {
                    surface.remove(coord);
                }
                Some(_) => {
                    // Unwrap OK - doomed coords come from the surface.
                    let chunk = surface.get(coord).unwrap();
                    let mut cropped: Chunk = chunk.clone();
                    for local in
                        IntRect::from_origin_size(IVec2::ZERO, IVec2::new(CHUNK_SIZE, CHUNK_SIZE))
                            .iter_positions()
                    {
                        if !bounds.contains(origin + local) {
                            cropped.set_pixel(local, [0; 4]);
                        }
                    }
                    if cropped.is_blank() {
                        surface.remove(coord);
                    } else {
                        surface.insert(coord, cropped);
                    }
                }
            }
        }
    }
}
impl Change for ResizeCanvas {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        if self.size.x <= 0 || self.size.y <= 0 {
            return false;
        }
        if self.size == document.size() {
            return false;
        }
        self.previous = Some(document.size());
        self.previous_selection = Some(document.selection());
        true
    }
    fn apply(
        &mut self,
        document: &mut Document,
        _first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        let bounds = IntRect::from_origin_size(IVec2::ZERO, self.size);
        let layers: Vec<NodeId> = document.raster_nodes().collect();
        for layer in layers {
            let handle = document
                .raster(layer)
                .ok_or(ChangeError::MismatchedState)?
                .clone();
            let storage = self.saved.entry(layer).or_default();
            Self::crop(storage, &mut handle.write(), bounds);
        }
        document.set_size(self.size);
        let mut infos = vec![ChangeInfo::CanvasResized { size: self.size }];
        // A selection hanging off the edge shrinks with the canvas.
        let selection = document.selection();
        let clipped = Selection {
            rect: selection.rect.and_then(|rect| rect.intersect(&bounds)),
        };
        if clipped != selection {
            *document.selection_mut() = clipped;
            infos.push(ChangeInfo::SelectionChanged { rect: clipped.rect });
        }
        Ok(AppliedWithUndo {
            applied: infos.into_iter().collect(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwraps OK - validation captured them.
        let previous = self.previous.unwrap();
        let previous_selection = self.previous_selection.unwrap();
        document.set_size(previous);
        for (layer, storage) in &self.saved {
            let handle = document
                .raster(*layer)
                .ok_or(ChangeError::MismatchedState)?
                .clone();
            storage.restore(&mut handle.write());
        }
        let mut infos = vec![ChangeInfo::CanvasResized { size: previous }];
        if document.selection() != previous_selection {
            *document.selection_mut() = previous_selection;
            infos.push(ChangeInfo::SelectionChanged {
                rect: previous_selection.rect,
            });
        }
        Ok(infos.into_iter().collect())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Place, move or clear one symmetry guide.
#[derive(Debug)]
pub struct SetSymmetry {
    pub axis: SymmetryAxis,
    pub position: Option<f64>,
    previous: Option<Option<f64>>,
}
impl SetSymmetry {
    #[must_use]
    pub fn new(axis: SymmetryAxis, position: Option<f64>) -> Self {
        Self {
            axis,
            position,
            previous: None,
        }
    }
}
impl Change for SetSymmetry {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let current = document.symmetry().axis(self.axis);
        if current == self.position {
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
        document.symmetry_mut().set_axis(self.axis, self.position);
        Ok(AppliedWithUndo {
            applied: ChangeInfo::SymmetryChanged {
                axis: self.axis,
                position: self.position,
            }
            .into(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - validation captured it.
        let previous = self.previous.unwrap();
        document.symmetry_mut().set_axis(self.axis, previous);
        Ok(ChangeInfo::SymmetryChanged {
            axis: self.axis,
            position: previous,
        }
        .into())
    }
    /// Guide drags coalesce like slider drags.
    fn is_mergeable_with(&self, other: &dyn Change) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| other.axis == self.axis)
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Replace the selection rect. Marquee drags set `ignore_in_undo` so the
/// intermediate rects don't each occupy a history slot; the final rect at
/// mouse-up is sent without it.
#[derive(Debug)]
pub struct SetSelection {
    pub rect: Option<IntRect>,
    pub ignore_in_undo: bool,
    previous: Option<Option<IntRect>>,
}
impl SetSelection {
    #[must_use]
    pub fn new(rect: Option<IntRect>, ignore_in_undo: bool) -> Self {
        Self {
            rect,
            ignore_in_undo,
            previous: None,
        }
    }
}
impl Change for SetSelection {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        // An empty rect means no selection.
        if let Some(rect) = self.rect {
            if rect.is_empty() {
                self.rect = None;
            }
        }
        let current = document.selection().rect;
        if current == self.rect {
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
        document.selection_mut().rect = self.rect;
        Ok(AppliedWithUndo {
            applied: ChangeInfo::SelectionChanged { rect: self.rect }.into(),
            ignore_in_undo: self.ignore_in_undo,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - validation captured it.
        let previous = self.previous.unwrap();
        document.selection_mut().rect = previous;
        Ok(ChangeInfo::SelectionChanged { rect: previous }.into())
    }
    fn is_mergeable_with(&self, other: &dyn Change) -> bool {
        other.as_any().downcast_ref::<Self>().is_some()
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Show or hide one display color channel.
#[derive(Debug)]
pub struct SetChannelVisibility {
    pub channel: ColorChannel,
    pub visible: bool,
    previous: Option<bool>,
}
impl SetChannelVisibility {
    #[must_use]
    pub fn new(channel: ColorChannel, visible: bool) -> Self {
        Self {
            channel,
            visible,
            previous: None,
        }
    }
}
impl Change for SetChannelVisibility {
    fn initialize_and_validate(&mut self, document: &Document) -> bool {
        let current = document.channels().channel(self.channel);
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
        document.channels_mut().set_channel(self.channel, self.visible);
        Ok(AppliedWithUndo {
            applied: ChangeInfo::ChannelVisibilityChanged {
                channel: self.channel,
                visible: self.visible,
            }
            .into(),
            ignore_in_undo: false,
        })
    }
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        // Unwrap OK - validation captured it.
        let previous = self.previous.unwrap();
        document.channels_mut().set_channel(self.channel, previous);
        Ok(ChangeInfo::ChannelVisibilityChanged {
            channel: self.channel,
            visible: previous,
        }
        .into())
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

    use super::*;

    fn document_with_layer() -> (Document, NodeId) {
        let mut document = Document::new(IVec2::new(600, 600), Arc::new(SchemaRegistry::default()));
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
    fn resize_crops_and_restores() {
        let (mut document, layer) = document_with_layer();
        {
            let mut surface = document.raster(layer).unwrap().write();
            // One pixel that survives, one in a tile that gets cropped at the
            // boundary, one in a tile dropped entirely.
            surface.write_pixel(IVec2::new(10, 10), [1, 1, 1, 255]);
            surface.write_pixel(IVec2::new(300, 10), [2, 2, 2, 255]);
            surface.write_pixel(IVec2::new(520, 520), [3, 3, 3, 255]);
        }
        let mut resize = TrackedChange::new(Box::new(ResizeCanvas::new(IVec2::new(280, 600))));
        assert!(resize.initialize_and_validate(&document));
        resize.apply(&mut document, true).unwrap();
        assert_eq!(document.size(), IVec2::new(280, 600));
        {
            let surface = document.raster(layer).unwrap().read();
            assert_eq!(surface.read_pixel(IVec2::new(10, 10)), [1, 1, 1, 255]);
            // The (1, 0) tile straddles x = 280 but pixel 300 is past it.
            assert_eq!(surface.read_pixel(IVec2::new(300, 10)), [0, 0, 0, 0]);
            assert!(surface.get(IVec2::new(2, 2)).is_none());
        }
        resize.revert(&mut document).unwrap();
        assert_eq!(document.size(), IVec2::new(600, 600));
        let surface = document.raster(layer).unwrap().read();
        assert_eq!(surface.read_pixel(IVec2::new(300, 10)), [2, 2, 2, 255]);
        assert_eq!(surface.read_pixel(IVec2::new(520, 520)), [3, 3, 3, 255]);
    }
    #[test]
    fn resize_clips_selection() {
        let (mut document, _) = document_with_layer();
        let mut select = TrackedChange::new(Box::new(SetSelection::new(
            Some(IntRect::from_origin_size(IVec2::new(500, 500), IVec2::new(50, 50))),
            false,
        )));
        assert!(select.initialize_and_validate(&document));
        select.apply(&mut document, true).unwrap();

        let mut resize = TrackedChange::new(Box::new(ResizeCanvas::new(IVec2::new(100, 100))));
        assert!(resize.initialize_and_validate(&document));
        let result = resize.apply(&mut document, true).unwrap();
        // Selection fell entirely outside: cleared, and reported.
        assert_eq!(document.selection().rect, None);
        assert_eq!(result.applied.into_vec().len(), 2);
        resize.revert(&mut document).unwrap();
        assert_eq!(
            document.selection().rect,
            Some(IntRect::from_origin_size(IVec2::new(500, 500), IVec2::new(50, 50)))
        );
    }
    #[test]
    fn rejects_degenerate_sizes_and_noops() {
        let (document, _) = document_with_layer();
        assert!(!ResizeCanvas::new(IVec2::new(0, 100)).initialize_and_validate(&document));
        assert!(!ResizeCanvas::new(IVec2::new(600, 600)).initialize_and_validate(&document));
        assert!(!SetSymmetry::new(SymmetryAxis::Horizontal, None).initialize_and_validate(&document));
        assert!(!SetChannelVisibility::new(ColorChannel::Red, true).initialize_and_validate(&document));
        // Empty selection rect normalizes to "no selection", a no-op here.
        assert!(!SetSelection::new(
            Some(IntRect::from_origin_size(IVec2::ZERO, IVec2::ZERO)),
            false
        )
        .initialize_and_validate(&document));
    }
}
