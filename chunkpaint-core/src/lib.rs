//! # chunkpaint-core
//!
//! The document core of a pixel-art editor: an editable document represented as a
//! DAG of render nodes, edits applied as validated, reversible [`change::Change`]s
//! with grouped undo, and a chunked multi-resolution raster model that turns those
//! edits into minimal redraw work.
//!
//! The intended data flow: producers (tools, commands) build [`actions::EditRequest`]s
//! and hand them to an [`accumulator::ActionAccumulator`], which batches them through
//! the [`tracker::DocumentChangeTracker`] and emits [`change::info::ChangeInfo`]
//! streams plus per-viewport dirty-tile render instructions. Renderers and
//! view-models are external - they only ever see those read-only outputs.

pub mod accumulator;
pub mod actions;
pub mod change;
pub mod chunk;
pub mod graph;
pub mod id;
pub mod math;
pub mod state;
pub mod tracker;

pub use id::Unique;
