//! # Change tracker
//!
//! Owns the [`Document`] and is the only thing that mutates it. Requests are
//! processed strictly one at a time, in order: build the change, validate it
//! read-only, apply it, record it. Applied changes group into *packets* -
//! everything between two boundaries undoes and redoes as one step - and the
//! packet stacks are bounded, evicting the oldest step (and its snapshots)
//! once the limit is reached.

use std::collections::VecDeque;

use crate::actions::{ChangeRegistry, EditRequest};
use crate::change::{ChangeError, TrackedChange};
use crate::change::info::ChangeInfo;
use crate::state::Document;

/// What to do with a request whose change fails validation. Rejection is a
/// normal outcome (stale ids from a racing frontend, no-op edits), never an
/// error - this only controls whether anyone hears about it.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum RejectionPolicy {
    /// Discard without a trace.
    #[default]
    Silent,
    /// Discard, noting the request at debug level.
    Log,
}

#[derive(Copy, Clone, Debug)]
pub struct TrackerOptions {
    /// Maximum number of undo steps retained.
    pub history_limit: usize,
    pub rejection_policy: RejectionPolicy,
}
impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            history_limit: 100,
            rejection_policy: RejectionPolicy::default(),
        }
    }
}

/// One undo step: the changes applied between two boundaries, in application
/// order. Undo reverts them back-to-front.
#[derive(Debug, Default)]
struct Packet {
    changes: Vec<TrackedChange>,
}

/// Snapshot of history availability, for host UI (menu enablement etc.).
#[derive(Copy, Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct HistoryState {
    pub can_undo: bool,
    pub can_redo: bool,
}

pub struct DocumentChangeTracker {
    document: Document,
    registry: ChangeRegistry,
    options: TrackerOptions,
    /// Completed steps, oldest at the front.
    undo: VecDeque<Packet>,
    redo: Vec<Packet>,
    /// The packet currently accepting changes, if a step is in progress.
    active: Option<Packet>,
}
impl DocumentChangeTracker {
    #[must_use]
    pub fn new(document: Document, registry: ChangeRegistry, options: TrackerOptions) -> Self {
        Self {
            document,
            registry,
            options,
            undo: VecDeque::new(),
            redo: Vec::new(),
            active: None,
        }
    }
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }
    #[must_use]
    pub fn history_state(&self) -> HistoryState {
        HistoryState {
            can_undo: self.active.is_some() || !self.undo.is_empty(),
            can_redo: !self.redo.is_empty(),
        }
    }

    /// Run a batch of requests in order, returning every [`ChangeInfo`] they
    /// produced. Errors only surface for internal inconsistencies (a change
    /// misbehaving); rejected requests are handled per the rejection policy.
    pub fn process_requests(
        &mut self,
        requests: impl IntoIterator<Item = EditRequest>,
    ) -> Result<Vec<ChangeInfo>, ChangeError> {
        let mut infos = Vec::new();
        for request in requests {
            match request {
                EditRequest::Undo => self.undo_step()?.push_into_vec(&mut infos),
                EditRequest::Redo => self.redo_step()?.push_into_vec(&mut infos),
                EditRequest::ChangeBoundary => self.change_boundary(),
                EditRequest::DeleteHistory => self.delete_history(),
                request => self.make_change(request, &mut infos)?,
            }
        }
        Ok(infos)
    }

    fn make_change(
        &mut self,
        request: EditRequest,
        infos: &mut Vec<ChangeInfo>,
    ) -> Result<(), ChangeError> {
        let Some(change) = self.registry.build(request.clone()) else {
            log::warn!("no change registered for request {request:?}");
            return Ok(());
        };
        let mut change = TrackedChange::new(change);
        if !change.initialize_and_validate(&self.document) {
            if self.options.rejection_policy == RejectionPolicy::Log {
                log::debug!("rejected request {request:?}");
            }
            return Ok(());
        }
        log::trace!("applying {change:?}");
        let applied = change.apply(&mut self.document, true)?;
        applied.applied.push_into(infos);
        if applied.ignore_in_undo {
            // Applied but deliberately unrecorded; the redo stack stays valid
            // because nothing new entered history.
            return Ok(());
        }
        self.redo.clear();
        self.active.get_or_insert_with(Packet::default).changes.push(change);
        Ok(())
    }

    /// Close the open packet. A single-change packet homologous with every
    /// change in the newest completed step is absorbed into that step instead;
    /// that is how a burst of slider nudges lands as one undo step even when
    /// boundaries fall between them.
    pub fn change_boundary(&mut self) {
        let Some(mut packet) = self.active.take() else {
            return;
        };
        if packet.changes.is_empty() {
            return;
        }
        let merge = packet.changes.len() == 1
            && self.undo.back().is_some_and(|previous| {
                !previous.changes.is_empty()
                    && previous
                        .changes
                        .iter()
                        .all(|prior| packet.changes[0].is_mergeable_with(prior))
            });
        if merge {
            // Unwraps OK - the merge check proved both sides non-empty.
            self.undo
                .back_mut()
                .unwrap()
                .changes
                .push(packet.changes.pop().unwrap());
            return;
        }
        if self.undo.len() >= self.options.history_limit {
            // Oldest step falls off; its snapshots drop with it.
            self.undo.pop_front();
        }
        self.undo.push_back(packet);
    }

    fn undo_step(&mut self) -> Result<StepInfos, ChangeError> {
        if self.active.is_some() {
            // A well-behaved host closes the step before asking for undo.
            debug_assert!(false, "undo requested mid-step");
            log::warn!("undo requested with a change packet still open; closing it");
            self.change_boundary();
        }
        let Some(mut packet) = self.undo.pop_back() else {
            return Ok(StepInfos::default());
        };
        let mut infos = Vec::new();
        for change in packet.changes.iter_mut().rev() {
            change.revert(&mut self.document)?.push_into(&mut infos);
        }
        self.redo.push(packet);
        Ok(StepInfos(infos))
    }
    fn redo_step(&mut self) -> Result<StepInfos, ChangeError> {
        let Some(mut packet) = self.redo.pop() else {
            return Ok(StepInfos::default());
        };
        let mut infos = Vec::new();
        for change in &mut packet.changes {
            change
                .apply(&mut self.document, false)?
                .applied
                .push_into(&mut infos);
        }
        self.undo.push_back(packet);
        Ok(StepInfos(infos))
    }
    /// Forget all recorded steps. The document keeps its current state.
    pub fn delete_history(&mut self) {
        self.active = None;
        self.undo.clear();
        self.redo.clear();
    }
}

#[derive(Default)]
struct StepInfos(Vec<ChangeInfo>);
impl StepInfos {
    fn push_into_vec(self, sink: &mut Vec<ChangeInfo>) {
        sink.extend(self.0);
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::graph::schema::{self, SchemaRegistry, KIND_FOLDER, KIND_IMAGE_LAYER};
    use crate::graph::NodeId;
    use crate::math::IVec2;

    use super::*;

    fn tracker() -> DocumentChangeTracker {
        let document = Document::new(IVec2::new(256, 256), Arc::new(SchemaRegistry::default()));
        DocumentChangeTracker::new(
            document,
            ChangeRegistry::with_builtins(),
            TrackerOptions::default(),
        )
    }
    fn member_from(infos: &[ChangeInfo]) -> NodeId {
        infos
            .iter()
            .find_map(|info| match info {
                ChangeInfo::MemberCreated { member, .. } => Some(*member),
                _ => None,
            })
            .expect("a member was created")
    }
    fn opacity_of(tracker: &DocumentChangeTracker, member: NodeId) -> f32 {
        tracker
            .document()
            .graph()
            .get(member)
            .unwrap()
            .input(schema::OPACITY)
            .unwrap()
            .value
            .scalar()
            .unwrap()
    }

    #[test]
    fn folder_layer_opacity_round_trip() {
        let mut tracker = tracker();
        let infos = tracker
            .process_requests([
                EditRequest::CreateStructureMember {
                    kind: KIND_FOLDER.to_owned(),
                    name: "group".to_owned(),
                    parent: None,
                    index: 0,
                },
                EditRequest::ChangeBoundary,
            ])
            .unwrap();
        let folder = member_from(&infos);
        let infos = tracker
            .process_requests([
                EditRequest::CreateStructureMember {
                    kind: KIND_IMAGE_LAYER.to_owned(),
                    name: "layer".to_owned(),
                    parent: Some(folder),
                    index: 0,
                },
                EditRequest::ChangeBoundary,
            ])
            .unwrap();
        let layer = member_from(&infos);
        tracker
            .process_requests([
                EditRequest::SetOpacity {
                    member: layer,
                    opacity: 0.25,
                },
                EditRequest::ChangeBoundary,
            ])
            .unwrap();
        assert_eq!(opacity_of(&tracker, layer), 0.25);

        // Three steps back unwinds everything in order.
        tracker.process_requests([EditRequest::Undo]).unwrap();
        assert_eq!(opacity_of(&tracker, layer), 1.0);
        tracker.process_requests([EditRequest::Undo]).unwrap();
        assert!(tracker.document().graph().get(layer).is_none());
        tracker.process_requests([EditRequest::Undo]).unwrap();
        assert!(tracker.document().graph().get(folder).is_none());
        assert_eq!(tracker.document().graph().len(), 1, "only the output node");
        assert!(!tracker.history_state().can_undo);

        // And three steps forward rebuilds it, same ids.
        tracker
            .process_requests([EditRequest::Redo, EditRequest::Redo, EditRequest::Redo])
            .unwrap();
        assert_eq!(opacity_of(&tracker, layer), 0.25);
        assert_eq!(
            tracker.document().graph().children_of(Some(folder)).unwrap(),
            vec![layer]
        );
        assert!(!tracker.history_state().can_redo);
    }
    #[test]
    fn packet_groups_changes_into_one_step() {
        let mut tracker = tracker();
        let infos = tracker
            .process_requests([EditRequest::CreateStructureMember {
                kind: KIND_IMAGE_LAYER.to_owned(),
                name: "a".to_owned(),
                parent: None,
                index: 0,
            }])
            .unwrap();
        let member = member_from(&infos);
        // No boundary yet: the visibility toggle joins the same step.
        tracker
            .process_requests([
                EditRequest::SetVisibility {
                    member,
                    visible: false,
                },
                EditRequest::ChangeBoundary,
                EditRequest::Undo,
            ])
            .unwrap();
        assert!(tracker.document().graph().get(member).is_none());
    }
    #[test]
    fn homologous_steps_merge() {
        let mut tracker = tracker();
        let infos = tracker
            .process_requests([
                EditRequest::CreateStructureMember {
                    kind: KIND_IMAGE_LAYER.to_owned(),
                    name: "a".to_owned(),
                    parent: None,
                    index: 0,
                },
                EditRequest::ChangeBoundary,
            ])
            .unwrap();
        let member = member_from(&infos);
        // A drag arrives as many single-change steps; one undo jumps over all
        // of them.
        for opacity in [0.9, 0.7, 0.4] {
            tracker
                .process_requests([
                    EditRequest::SetOpacity { member, opacity },
                    EditRequest::ChangeBoundary,
                ])
                .unwrap();
        }
        tracker.process_requests([EditRequest::Undo]).unwrap();
        assert_eq!(opacity_of(&tracker, member), 1.0);
    }
    #[test]
    fn rejected_requests_leave_no_trace() {
        let mut tracker = tracker();
        let infos = tracker
            .process_requests([
                // Unknown member id: validation fails.
                EditRequest::SetOpacity {
                    member: NodeId::new(),
                    opacity: 0.5,
                },
                // No-op resize: validation fails.
                EditRequest::ResizeCanvas {
                    size: IVec2::new(256, 256),
                },
            ])
            .unwrap();
        assert!(infos.is_empty());
        assert!(!tracker.history_state().can_undo);
    }
    #[test]
    fn ignored_changes_apply_without_history() {
        let mut tracker = tracker();
        tracker
            .process_requests([
                EditRequest::CreateStructureMember {
                    kind: KIND_IMAGE_LAYER.to_owned(),
                    name: "a".to_owned(),
                    parent: None,
                    index: 0,
                },
                EditRequest::ChangeBoundary,
                EditRequest::Undo,
            ])
            .unwrap();
        assert!(tracker.history_state().can_redo);
        // The marquee preview applies but neither records history nor
        // invalidates the pending redo.
        tracker
            .process_requests([EditRequest::SetSelection {
                rect: Some(crate::math::IntRect::from_origin_size(
                    IVec2::ZERO,
                    IVec2::new(10, 10),
                )),
                ignore_in_undo: true,
            }])
            .unwrap();
        assert!(tracker.document().selection().rect.is_some());
        assert!(tracker.history_state().can_redo);

        // A recorded change, by contrast, clears redo.
        tracker
            .process_requests([EditRequest::SetSymmetry {
                axis: crate::state::SymmetryAxis::Vertical,
                position: Some(128.0),
            }])
            .unwrap();
        assert!(!tracker.history_state().can_redo);
    }
    #[test]
    fn history_is_bounded() {
        let document = Document::new(IVec2::new(256, 256), Arc::new(SchemaRegistry::default()));
        let mut tracker = DocumentChangeTracker::new(
            document,
            ChangeRegistry::with_builtins(),
            TrackerOptions {
                history_limit: 2,
                rejection_policy: RejectionPolicy::Log,
            },
        );
        for index in 0..5 {
            tracker
                .process_requests([
                    EditRequest::CreateStructureMember {
                        kind: KIND_IMAGE_LAYER.to_owned(),
                        name: format!("layer {index}"),
                        parent: None,
                        index: 0,
                    },
                    EditRequest::ChangeBoundary,
                ])
                .unwrap();
        }
        // Only the two newest steps can unwind.
        tracker
            .process_requests([EditRequest::Undo, EditRequest::Undo, EditRequest::Undo])
            .unwrap();
        assert_eq!(tracker.document().graph().children_of(None).unwrap().len(), 3);
        assert!(!tracker.history_state().can_undo);
    }
    #[test]
    fn delete_history_keeps_document() {
        let mut tracker = tracker();
        let infos = tracker
            .process_requests([
                EditRequest::CreateStructureMember {
                    kind: KIND_IMAGE_LAYER.to_owned(),
                    name: "a".to_owned(),
                    parent: None,
                    index: 0,
                },
                EditRequest::ChangeBoundary,
                EditRequest::DeleteHistory,
            ])
            .unwrap();
        let member = member_from(&infos);
        assert!(tracker.document().graph().get(member).is_some());
        let state = tracker.history_state();
        assert!(!state.can_undo && !state.can_redo);
        // Undo after a wipe is a quiet no-op.
        let infos = tracker.process_requests([EditRequest::Undo]).unwrap();
        assert!(infos.is_empty());
        assert!(tracker.document().graph().get(member).is_some());
    }
}
