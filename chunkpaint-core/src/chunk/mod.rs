//! # Chunks
//!
//! Rendered raster content is tiled into fixed-size chunks addressed by integer
//! tile coordinates. A chunk is the unit of both cache invalidation and undo
//! snapshotting: a change reports exactly the chunk coordinates it dirtied, and
//! saves exactly the pre-edit bytes of the chunks it overwrites so undo costs
//! O(touched area), never O(canvas).
//!
//! Content also exists at several fixed downsampled tiers so a renderer can pick
//! the coarsest tier that still meets the on-screen pixel density. Tile
//! coordinates are tier-independent - chunk (x, y) covers the same canvas region
//! at every tier, only its pixel count shrinks. The authoritative bytes live at
//! [`ChunkResolution::Full`]; coarser tiers are derived outside the core, which
//! only decides which tiles need re-deriving.

use crate::math::{IVec2, IntRect};

/// Side length, in pixels, of a full-resolution chunk.
pub const CHUNK_SIZE: i32 = 256;

/// One of the fixed downsampling tiers of the canvas.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    serde::Serialize,
    serde::Deserialize,
    strum::EnumIter,
)]
pub enum ChunkResolution {
    Full,
    Half,
    Quarter,
    Eighth,
}
impl ChunkResolution {
    /// How many full-resolution pixels one pixel of this tier covers.
    #[must_use]
    pub const fn multiplier(self) -> i32 {
        match self {
            Self::Full => 1,
            Self::Half => 2,
            Self::Quarter => 4,
            Self::Eighth => 8,
        }
    }
    /// Side length, in stored pixels, of a chunk at this tier.
    #[must_use]
    pub const fn pixel_size(self) -> i32 {
        CHUNK_SIZE / self.multiplier()
    }
    /// The coarsest tier that still supplies at least one stored pixel per
    /// on-screen pixel, for the given canvas-pixels-per-screen-pixel scale.
    /// Scales above 1 (zoomed in) always take full resolution.
    #[must_use]
    pub fn for_scale(scale: f64) -> Self {
        if scale > 0.5 {
            Self::Full
        } else if scale > 0.25 {
            Self::Half
        } else if scale > 0.125 {
            Self::Quarter
        } else {
            Self::Eighth
        }
    }
}

/// The chunk coordinate containing a full-resolution pixel position.
#[must_use]
pub fn chunk_of(pixel: IVec2) -> IVec2 {
    pixel.div_floor(CHUNK_SIZE)
}

/// An owned RGBA8 tile at full resolution. Freshly allocated chunks are
/// fully transparent.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    pixels: Box<[u8]>,
}
impl Default for Chunk {
    fn default() -> Self {
        Self {
            pixels: vec![0u8; (CHUNK_SIZE * CHUNK_SIZE * 4) as usize].into_boxed_slice(),
        }
    }
}
impl Chunk {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }
    /// View as RGBA quads.
    #[must_use]
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.pixels)
    }
    pub fn pixels_mut(&mut self) -> &mut [[u8; 4]] {
        bytemuck::cast_slice_mut(&mut self.pixels)
    }
    /// Fetch a pixel by position within the chunk. Panics on out-of-bounds
    /// coordinates - chunk-local positions are an internal invariant.
    #[must_use]
    pub fn pixel(&self, local: IVec2) -> [u8; 4] {
        debug_assert!(local.x >= 0 && local.x < CHUNK_SIZE && local.y >= 0 && local.y < CHUNK_SIZE);
        self.pixels()[(local.y * CHUNK_SIZE + local.x) as usize]
    }
    pub fn set_pixel(&mut self, local: IVec2, color: [u8; 4]) {
        debug_assert!(local.x >= 0 && local.x < CHUNK_SIZE && local.y >= 0 && local.y < CHUNK_SIZE);
        self.pixels_mut()[(local.y * CHUNK_SIZE + local.x) as usize] = color;
    }
    /// All pixels transparent? Used to drop empty tiles after a crop.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|byte| *byte == 0)
    }
}
impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chunk({CHUNK_SIZE}x{CHUNK_SIZE} rgba)")
    }
}

/// Sparse tile map backing one layer's raster content. Absent tiles are
/// transparent. Carries a revision counter the render-instruction step bumps
/// under exclusive lock, so hosts can detect stale reads.
#[derive(Default)]
pub struct ChunkSurface {
    chunks: hashbrown::HashMap<IVec2, Chunk>,
    revision: u64,
}
impl std::fmt::Debug for ChunkSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ChunkSurface({} chunks, revision {})",
            self.chunks.len(),
            self.revision
        )
    }
}
impl ChunkSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn get(&self, coord: IVec2) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }
    pub fn get_or_insert_blank(&mut self, coord: IVec2) -> &mut Chunk {
        self.chunks.entry(coord).or_default()
    }
    pub fn insert(&mut self, coord: IVec2, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(coord, chunk)
    }
    pub fn remove(&mut self, coord: IVec2) -> Option<Chunk> {
        self.chunks.remove(&coord)
    }
    /// Coordinates of every stored tile, in arbitrary order.
    pub fn coords(&self) -> impl Iterator<Item = IVec2> + '_ {
        self.chunks.keys().copied()
    }
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
    pub(crate) fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
    /// Write one full-resolution pixel, allocating its tile on demand.
    pub fn write_pixel(&mut self, pixel: IVec2, color: [u8; 4]) {
        let coord = chunk_of(pixel);
        let local = pixel - coord * CHUNK_SIZE;
        self.get_or_insert_blank(coord).set_pixel(local, color);
    }
    /// Read one full-resolution pixel; transparent where no tile exists.
    #[must_use]
    pub fn read_pixel(&self, pixel: IVec2) -> [u8; 4] {
        let coord = chunk_of(pixel);
        let local = pixel - coord * CHUNK_SIZE;
        self.get(coord).map_or([0; 4], |chunk| chunk.pixel(local))
    }
    /// Clone of this surface's tiles (revision not carried over).
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            chunks: self.chunks.clone(),
            revision: 0,
        }
    }
}

/// Pre-edit bytes of the chunks one change overwrote, keyed by coordinate.
/// `None` marks a tile that did not exist before the edit. Owned by the change
/// that captured it and dropped with it when the change leaves history.
#[derive(Default, Debug)]
pub struct CommittedChunkStorage {
    saved: hashbrown::HashMap<IVec2, Option<Chunk>>,
}
impl CommittedChunkStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Snapshot the listed tiles' current content. Only the first capture per
    /// coordinate sticks - the snapshot must stay "pre-edit" across repeated
    /// stamps onto the same tile.
    pub fn capture(&mut self, surface: &ChunkSurface, coords: impl IntoIterator<Item = IVec2>) {
        for coord in coords {
            self.saved
                .entry(coord)
                .or_insert_with(|| surface.get(coord).cloned());
        }
    }
    /// Put every captured tile back. The snapshot is retained so a later redo
    /// followed by another undo restores identically.
    pub fn restore(&self, surface: &mut ChunkSurface) {
        for (coord, saved) in &self.saved {
            match saved {
                Some(chunk) => {
                    surface.insert(*coord, chunk.clone());
                }
                None => {
                    surface.remove(*coord);
                }
            }
        }
    }
    /// Coordinates this storage holds.
    pub fn coords(&self) -> impl Iterator<Item = IVec2> + '_ {
        self.saved.keys().copied()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }
}

/// The set of chunks an effect dirtied, or the whole canvas for genuinely
/// global edits (the documented exception, e.g. a resize).
#[derive(Clone, PartialEq, Eq, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct AffectedArea {
    pub chunks: hashbrown::HashSet<IVec2>,
    pub everything: bool,
}
impl AffectedArea {
    #[must_use]
    pub fn from_chunks(chunks: impl IntoIterator<Item = IVec2>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
            everything: false,
        }
    }
    /// Global invalidation.
    #[must_use]
    pub fn everything() -> Self {
        Self {
            chunks: hashbrown::HashSet::new(),
            everything: true,
        }
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.everything && self.chunks.is_empty()
    }
    pub fn union_with(&mut self, other: &Self) {
        if other.everything {
            self.everything = true;
            self.chunks.clear();
        } else if !self.everything {
            self.chunks.extend(other.chunks.iter().copied());
        }
    }
    /// The dirty chunk coordinates visible within a chunk-coordinate rect.
    /// A global area yields every chunk of the rect.
    #[must_use]
    pub fn clip_to(&self, visible: IntRect) -> Vec<IVec2> {
        if self.everything {
            visible.iter_positions().collect()
        } else {
            let mut clipped: Vec<IVec2> = self
                .chunks
                .iter()
                .copied()
                .filter(|coord| visible.contains(*coord))
                .collect();
            // Stable output for reproducible instructions.
            clipped.sort_unstable_by_key(|coord| (coord.y, coord.x));
            clipped
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pixel_addressing_negative_space() {
        let mut surface = ChunkSurface::new();
        surface.write_pixel(IVec2::new(-1, -1), [1, 2, 3, 4]);
        assert_eq!(surface.read_pixel(IVec2::new(-1, -1)), [1, 2, 3, 4]);
        // Lives in the (-1, -1) tile, at its bottom-right corner.
        let chunk = surface.get(IVec2::new(-1, -1)).unwrap();
        assert_eq!(
            chunk.pixel(IVec2::new(CHUNK_SIZE - 1, CHUNK_SIZE - 1)),
            [1, 2, 3, 4]
        );
    }
    #[test]
    fn surface_debug_is_compact() {
        // Changes hold surface handles and derive Debug, so the surface must
        // format without dumping pixel buffers.
        let mut surface = ChunkSurface::new();
        surface.write_pixel(IVec2::ZERO, [1, 1, 1, 255]);
        let rendered = format!("{surface:?}");
        assert!(rendered.contains("ChunkSurface(1 chunks"));
    }
    #[test]
    fn committed_storage_round_trip() {
        let mut surface = ChunkSurface::new();
        surface.write_pixel(IVec2::new(10, 10), [9, 9, 9, 255]);

        let mut storage = CommittedChunkStorage::new();
        // Capture before overwriting: one existing tile, one absent tile.
        storage.capture(&surface, [IVec2::ZERO, IVec2::new(1, 0)]);
        surface.write_pixel(IVec2::new(10, 10), [1, 1, 1, 255]);
        surface.write_pixel(IVec2::new(300, 10), [2, 2, 2, 255]);

        storage.restore(&mut surface);
        assert_eq!(surface.read_pixel(IVec2::new(10, 10)), [9, 9, 9, 255]);
        // The absent tile was dropped again.
        assert!(surface.get(IVec2::new(1, 0)).is_none());
        // Restore is repeatable (undo after redo).
        storage.restore(&mut surface);
        assert_eq!(surface.read_pixel(IVec2::new(10, 10)), [9, 9, 9, 255]);
    }
    #[test]
    fn capture_keeps_first_snapshot() {
        let mut surface = ChunkSurface::new();
        surface.write_pixel(IVec2::ZERO, [5, 5, 5, 255]);
        let mut storage = CommittedChunkStorage::new();
        storage.capture(&surface, [IVec2::ZERO]);
        surface.write_pixel(IVec2::ZERO, [6, 6, 6, 255]);
        // Second capture of the same coord must not clobber the pre-edit bytes.
        storage.capture(&surface, [IVec2::ZERO]);
        storage.restore(&mut surface);
        assert_eq!(surface.read_pixel(IVec2::ZERO), [5, 5, 5, 255]);
    }
    #[test]
    fn resolution_tiers() {
        assert_eq!(ChunkResolution::Full.pixel_size(), 256);
        assert_eq!(ChunkResolution::Eighth.pixel_size(), 32);
        assert_eq!(ChunkResolution::for_scale(2.0), ChunkResolution::Full);
        assert_eq!(ChunkResolution::for_scale(0.3), ChunkResolution::Half);
        assert_eq!(ChunkResolution::for_scale(0.2), ChunkResolution::Quarter);
        assert_eq!(ChunkResolution::for_scale(0.01), ChunkResolution::Eighth);
    }
    #[test]
    fn affected_area_union_saturates() {
        let mut area = AffectedArea::from_chunks([IVec2::ZERO]);
        area.union_with(&AffectedArea::from_chunks([IVec2::new(1, 0)]));
        assert_eq!(area.chunks.len(), 2);
        area.union_with(&AffectedArea::everything());
        assert!(area.everything);
        // Everything absorbs later chunk sets.
        area.union_with(&AffectedArea::from_chunks([IVec2::new(5, 5)]));
        assert!(area.everything && area.chunks.is_empty());
    }
}
