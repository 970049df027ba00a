//! Integer geometry shared by the chunk model, the canvas, and viewport clipping.
//! Kept deliberately tiny - the core never does raster math, it only addresses
//! tiles and clips rectangles.

/// A pair of integers. Used both for pixel positions and for chunk coordinates.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
    bytemuck::Pod,
    bytemuck::Zeroable,
)]
#[repr(C)]
pub struct IVec2 {
    pub x: i32,
    pub y: i32,
}
impl IVec2 {
    pub const ZERO: Self = Self { x: 0, y: 0 };
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
    /// Component-wise floored division. Regular `/` truncates toward zero,
    /// which mis-addresses tiles for negative positions.
    #[must_use]
    pub const fn div_floor(self, divisor: i32) -> Self {
        Self {
            x: div_floor(self.x, divisor),
            y: div_floor(self.y, divisor),
        }
    }
}
impl std::ops::Add for IVec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}
impl std::ops::Sub for IVec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}
impl std::ops::Mul<i32> for IVec2 {
    type Output = Self;
    fn mul(self, rhs: i32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

#[must_use]
pub const fn div_floor(a: i32, b: i32) -> i32 {
    let d = a / b;
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) {
        d - 1
    } else {
        d
    }
}

/// An axis-aligned integer rectangle. `w`/`h` are never negative;
/// a zero-area rect is "empty" and intersects nothing.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct IntRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}
impl IntRect {
    #[must_use]
    pub const fn from_origin_size(origin: IVec2, size: IVec2) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            w: size.x,
            h: size.y,
        }
    }
    /// Construct from two corners, in any order.
    #[must_use]
    pub fn from_corners(a: IVec2, b: IVec2) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            w: a.x.max(b.x) - x,
            h: a.y.max(b.y) - y,
        }
    }
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.w
    }
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.h
    }
    #[must_use]
    pub const fn contains(&self, point: IVec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
    /// Intersection, or None if the rects don't overlap.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > x && bottom > y).then(|| Self {
            x,
            y,
            w: right - x,
            h: bottom - y,
        })
    }
    /// Smallest rect containing both. Empty rects are ignored.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self {
            x,
            y,
            w: self.right().max(other.right()) - x,
            h: self.bottom().max(other.bottom()) - y,
        }
    }
    #[must_use]
    pub fn translated(&self, by: IVec2) -> Self {
        Self {
            x: self.x + by.x,
            y: self.y + by.y,
            ..*self
        }
    }
    /// The rect of tile coordinates covering this pixel rect, for square tiles
    /// of side `tile_px`.
    #[must_use]
    pub fn tiles_covering(&self, tile_px: i32) -> Self {
        if self.is_empty() {
            return Self::default();
        }
        let min = IVec2::new(self.x, self.y).div_floor(tile_px);
        // Inclusive max corner, then +1 for exclusive extent.
        let max = IVec2::new(self.right() - 1, self.bottom() - 1).div_floor(tile_px);
        Self {
            x: min.x,
            y: min.y,
            w: max.x - min.x + 1,
            h: max.y - min.y + 1,
        }
    }
    /// Iterate every integer position inside the rect, row-major.
    pub fn iter_positions(&self) -> impl Iterator<Item = IVec2> + '_ {
        let this = *self;
        (this.y..this.bottom())
            .flat_map(move |y| (this.x..this.right()).map(move |x| IVec2::new(x, y)))
    }
}

#[cfg(test)]
mod test {
    use super::{div_floor, IVec2, IntRect};

    #[test]
    fn floored_division() {
        assert_eq!(div_floor(5, 4), 1);
        assert_eq!(div_floor(4, 4), 1);
        assert_eq!(div_floor(0, 4), 0);
        assert_eq!(div_floor(-1, 4), -1);
        assert_eq!(div_floor(-4, 4), -1);
        assert_eq!(div_floor(-5, 4), -2);
    }
    #[test]
    fn intersect() {
        let a = IntRect::from_corners(IVec2::new(0, 0), IVec2::new(10, 10));
        let b = IntRect::from_corners(IVec2::new(5, 5), IVec2::new(20, 20));
        assert_eq!(
            a.intersect(&b),
            Some(IntRect::from_corners(IVec2::new(5, 5), IVec2::new(10, 10)))
        );
        let far = IntRect::from_corners(IVec2::new(50, 50), IVec2::new(60, 60));
        assert_eq!(a.intersect(&far), None);
        // Touching edges don't intersect.
        let edge = IntRect::from_corners(IVec2::new(10, 0), IVec2::new(20, 10));
        assert_eq!(a.intersect(&edge), None);
    }
    #[test]
    fn tiles_covering() {
        // One pixel in one tile.
        let px = IntRect::from_origin_size(IVec2::new(3, 3), IVec2::new(1, 1));
        assert_eq!(
            px.tiles_covering(256),
            IntRect::from_origin_size(IVec2::ZERO, IVec2::new(1, 1))
        );
        // Straddling the origin needs four tiles.
        let straddle = IntRect::from_corners(IVec2::new(-1, -1), IVec2::new(1, 1));
        assert_eq!(
            straddle.tiles_covering(256),
            IntRect::from_origin_size(IVec2::new(-1, -1), IVec2::new(2, 2))
        );
        // An exact tile boundary covers exactly one tile.
        let exact = IntRect::from_origin_size(IVec2::new(256, 0), IVec2::new(256, 256));
        assert_eq!(
            exact.tiles_covering(256),
            IntRect::from_origin_size(IVec2::new(1, 0), IVec2::new(1, 1))
        );
    }
}
