//! # Document state
//!
//! The mutable root of everything the tracker owns: the canvas, the node graph,
//! per-layer raster surfaces, and the light-weight view state (selection,
//! symmetry guides, channel visibility). Mutation happens only inside a
//! [`crate::change::Change`]'s apply/revert; everyone else reads.

pub mod document;

pub use document::Document;

use crate::math::IntRect;

/// The selected region of the canvas, or nothing.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Selection {
    pub rect: Option<IntRect>,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum SymmetryAxis {
    Horizontal,
    Vertical,
}

/// Mirror-guide positions, in canvas pixels. `None` disables an axis.
#[derive(Copy, Clone, PartialEq, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Symmetry {
    pub horizontal: Option<f64>,
    pub vertical: Option<f64>,
}
impl Symmetry {
    #[must_use]
    pub fn axis(&self, axis: SymmetryAxis) -> Option<f64> {
        match axis {
            SymmetryAxis::Horizontal => self.horizontal,
            SymmetryAxis::Vertical => self.vertical,
        }
    }
    pub fn set_axis(&mut self, axis: SymmetryAxis, position: Option<f64>) {
        match axis {
            SymmetryAxis::Horizontal => self.horizontal = position,
            SymmetryAxis::Vertical => self.vertical = position,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
    Alpha,
}

/// Which color channels the host displays. Purely view state, but it travels
/// with the document so every viewport agrees.
#[derive(Copy, Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct ChannelVisibility {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    pub alpha: bool,
}
impl Default for ChannelVisibility {
    fn default() -> Self {
        Self {
            red: true,
            green: true,
            blue: true,
            alpha: true,
        }
    }
}
impl ChannelVisibility {
    #[must_use]
    pub fn channel(&self, channel: ColorChannel) -> bool {
        match channel {
            ColorChannel::Red => self.red,
            ColorChannel::Green => self.green,
            ColorChannel::Blue => self.blue,
            ColorChannel::Alpha => self.alpha,
        }
    }
    pub fn set_channel(&mut self, channel: ColorChannel, visible: bool) {
        match channel {
            ColorChannel::Red => self.red = visible,
            ColorChannel::Green => self.green = visible,
            ColorChannel::Blue => self.blue = visible,
            ColorChannel::Alpha => self.alpha = visible,
        }
    }
}
