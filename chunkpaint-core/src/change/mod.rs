//! # Changes
//!
//! Every edit to the document is an atomic, reversible [`Change`]: validated
//! read-only against current state, then applied (mutating the document and
//! yielding [`info::ChangeInfo`] descriptions), revertible to the exact prior
//! state, and re-appliable for redo. Changes own whatever they need to reverse
//! themselves - captured pre-edit chunks, detached sub-graphs - and release it
//! when they drop out of history.

pub mod drawing;
pub mod graph;
pub mod info;
pub mod root;
pub mod structure;

use crate::state::Document;
use info::ChangeInfo;

/// What applying or reverting a change produced: an explicit three-case sum
/// instead of an ambiguous "maybe a list".
#[derive(Clone, Debug, Default)]
pub enum Applied {
    /// The change ran but nothing observable happened.
    #[default]
    Nothing,
    One(ChangeInfo),
    Many(smallvec::SmallVec<[ChangeInfo; 2]>),
}
impl Applied {
    pub fn push_into(self, sink: &mut Vec<ChangeInfo>) {
        match self {
            Self::Nothing => (),
            Self::One(info) => sink.push(info),
            Self::Many(infos) => sink.extend(infos),
        }
    }
    #[must_use]
    pub fn into_vec(self) -> Vec<ChangeInfo> {
        let mut sink = Vec::new();
        self.push_into(&mut sink);
        sink
    }
}
impl From<ChangeInfo> for Applied {
    fn from(info: ChangeInfo) -> Self {
        Self::One(info)
    }
}
impl FromIterator<ChangeInfo> for Applied {
    fn from_iter<I: IntoIterator<Item = ChangeInfo>>(iter: I) -> Self {
        let mut infos: smallvec::SmallVec<[ChangeInfo; 2]> = iter.into_iter().collect();
        match infos.len() {
            0 => Self::Nothing,
            1 => Self::One(infos.pop().unwrap()),
            _ => Self::Many(infos),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ChangeError {
    /// The target vanished or changed shape between validation and apply.
    /// Always a bug - the tracker never interleaves changes.
    #[error("target state inconsistent with validated snapshot")]
    MismatchedState,
    /// Apply/revert called out of lifecycle order.
    #[error("change used outside its lifecycle: {0}")]
    Phase(&'static str),
}

/// `apply` also reports whether to skip recording an undo entry - used for
/// idempotent corrections that shouldn't occupy a history slot.
pub struct AppliedWithUndo {
    pub applied: Applied,
    pub ignore_in_undo: bool,
}

/// An atomic, reversible edit. Implementations keep their request parameters
/// plus scratch captured at validation ("what was the value before").
///
/// `first_apply` distinguishes the original application - which allocates ids
/// and captures pre-edit snapshots - from a redo replay, which must reuse them
/// so repeated undo/redo is bit-exact.
pub trait Change: std::fmt::Debug + Send {
    /// Read-only check against current state. `false` rejects the change:
    /// target missing, wrong kind, or a no-op. A rejected change is discarded,
    /// the document untouched, and nothing reaches the undo stack.
    fn initialize_and_validate(&mut self, document: &Document) -> bool;
    fn apply(
        &mut self,
        document: &mut Document,
        first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError>;
    fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError>;
    /// May this change fold into `other`'s undo packet? (E.g. consecutive
    /// nudges of the same slider.) Implementations downcast via [`Change::as_any`].
    fn is_mergeable_with(&self, _other: &dyn Change) -> bool {
        false
    }
    fn as_any(&self) -> &dyn std::any::Any;
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Phase {
    Created,
    Validated,
    Applied,
    Reverted,
}

/// Lifecycle enforcement around a boxed change. The tracker only ever holds
/// these: misuse (reverting a change that isn't applied, applying twice) is a
/// programming error, asserted in debug and surfaced as a recoverable
/// [`ChangeError::Phase`] in release rather than corrupting the document.
pub struct TrackedChange {
    inner: Box<dyn Change>,
    phase: Phase,
}
impl TrackedChange {
    #[must_use]
    pub fn new(inner: Box<dyn Change>) -> Self {
        Self {
            inner,
            phase: Phase::Created,
        }
    }
    /// Validate. On `false` the change should be dropped.
    pub fn initialize_and_validate(&mut self, document: &Document) -> bool {
        debug_assert_eq!(self.phase, Phase::Created, "validated twice");
        let valid = self.inner.initialize_and_validate(document);
        if valid {
            self.phase = Phase::Validated;
        }
        valid
    }
    pub fn apply(
        &mut self,
        document: &mut Document,
        first_apply: bool,
    ) -> Result<AppliedWithUndo, ChangeError> {
        let expected = if first_apply {
            Phase::Validated
        } else {
            Phase::Reverted
        };
        if self.phase != expected {
            debug_assert!(false, "apply out of order: {:?}", self.phase);
            return Err(ChangeError::Phase("apply"));
        }
        let result = self.inner.apply(document, first_apply)?;
        self.phase = Phase::Applied;
        Ok(result)
    }
    pub fn revert(&mut self, document: &mut Document) -> Result<Applied, ChangeError> {
        if self.phase != Phase::Applied {
            debug_assert!(false, "revert out of order: {:?}", self.phase);
            return Err(ChangeError::Phase("revert"));
        }
        let result = self.inner.revert(document)?;
        self.phase = Phase::Reverted;
        Ok(result)
    }
    #[must_use]
    pub fn is_mergeable_with(&self, other: &Self) -> bool {
        self.inner.is_mergeable_with(other.inner.as_ref())
    }
}
impl std::fmt::Debug for TrackedChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({:?})", self.inner, self.phase)
    }
}
