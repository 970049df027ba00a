//! # Action accumulator
//!
//! The front door for hosts. Requests from any thread land in a queue; one
//! pass at a time drains it through the [`DocumentChangeTracker`], coalesces
//! the resulting change descriptions, translates them into per-viewport
//! re-render instructions, and broadcasts the batch to subscribers. The
//! trailing-edge scheme means a flood of requests arriving mid-pass is picked
//! up by the running pass's drain loop rather than spawning a second pass -
//! the tracker never sees interleaved batches.

pub mod dirty;
pub mod viewport;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::actions::EditRequest;
use crate::change::info::{self, ChangeInfo};
use crate::change::ChangeError;
use crate::chunk::ChunkResolution;
use crate::math::IVec2;
use crate::state::Document;
use crate::tracker::{DocumentChangeTracker, HistoryState};

use viewport::{Viewport, ViewportId};

/// Tiles one viewport should re-render, at the tier it currently wants.
#[derive(Clone, PartialEq, Debug)]
pub struct RenderInstruction {
    pub viewport: ViewportId,
    pub resolution: ChunkResolution,
    /// Chunk coordinates, deduplicated and in stable order.
    pub chunks: Vec<IVec2>,
}

/// Everything one drained batch produced.
#[derive(Clone, Debug)]
pub struct BatchOutput {
    /// Coalesced change descriptions, for mirrors (layer panels, graph views).
    pub infos: Vec<ChangeInfo>,
    pub instructions: Vec<RenderInstruction>,
    pub history: HistoryState,
    /// Advisory: processing this batch took long enough that the host may
    /// want to show a busy indicator. Never affects processing.
    pub busy: bool,
}

pub struct ActionAccumulator {
    tracker: parking_lot::Mutex<DocumentChangeTracker>,
    queue: parking_lot::Mutex<Vec<EditRequest>>,
    /// True while some thread is draining. The drain loop re-checks the queue
    /// before clearing it, so a request enqueued mid-pass is never stranded.
    executing: AtomicBool,
    /// Passes currently inside the drain loop, and the highest count ever
    /// observed. The guard keeps the peak at one; it is tracked so the
    /// invariant is checkable from outside.
    passes_in_flight: AtomicUsize,
    peak_passes: AtomicUsize,
    viewports: parking_lot::RwLock<hashbrown::HashMap<ViewportId, Viewport>>,
    subscribers: parking_lot::Mutex<Vec<mpsc::Sender<BatchOutput>>>,
    busy_timeout: Duration,
}
impl ActionAccumulator {
    #[must_use]
    pub fn new(tracker: DocumentChangeTracker) -> Self {
        Self {
            tracker: parking_lot::Mutex::new(tracker),
            queue: parking_lot::Mutex::new(Vec::new()),
            executing: AtomicBool::new(false),
            passes_in_flight: AtomicUsize::new(0),
            peak_passes: AtomicUsize::new(0),
            viewports: parking_lot::RwLock::new(hashbrown::HashMap::new()),
            subscribers: parking_lot::Mutex::new(Vec::new()),
            busy_timeout: Duration::from_millis(100),
        }
    }
    /// Pass duration beyond which outputs carry the advisory busy flag.
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
    /// The most drain passes ever in flight at once. Stays at one - requests
    /// arriving mid-pass join the running drain instead of starting another.
    #[must_use]
    pub fn peak_concurrent_passes(&self) -> usize {
        self.peak_passes.load(Ordering::Acquire)
    }

    /// Register a batch-output listener. Dropped receivers are pruned on the
    /// next broadcast.
    pub fn subscribe(&self) -> mpsc::Receiver<BatchOutput> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.lock().push(sender);
        receiver
    }
    pub fn set_viewport(&self, id: ViewportId, viewport: Viewport) {
        self.viewports.write().insert(id, viewport);
    }
    pub fn remove_viewport(&self, id: ViewportId) {
        self.viewports.write().remove(&id);
    }
    /// Read the document under the tracker's lock. Keep the closure short.
    pub fn read_document<R>(&self, read: impl FnOnce(&Document) -> R) -> R {
        let tracker = self.tracker.lock();
        read(tracker.document())
    }

    /// Queue requests and, unless a pass is already running, drain the queue
    /// now on this thread. Returns any internal error the draining pass hit;
    /// `Ok` when the requests were handed off to a running pass.
    pub fn enqueue(
        &self,
        requests: impl IntoIterator<Item = EditRequest>,
    ) -> Result<(), ChangeError> {
        self.queue.lock().extend(requests);
        self.pump()
    }

    fn pump(&self) -> Result<(), ChangeError> {
        loop {
            if self
                .executing
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                // Another thread's drain loop will pick our requests up.
                return Ok(());
            }
            let depth = self.passes_in_flight.fetch_add(1, Ordering::AcqRel) + 1;
            self.peak_passes.fetch_max(depth, Ordering::AcqRel);
            let result = self.drain();
            self.passes_in_flight.fetch_sub(1, Ordering::AcqRel);
            self.executing.store(false, Ordering::Release);
            result?;
            // A request may have slipped in between the last drain and the
            // flag clearing. If so, take the pass again.
            if self.queue.lock().is_empty() {
                return Ok(());
            }
        }
    }
    fn drain(&self) -> Result<(), ChangeError> {
        loop {
            let batch: Vec<EditRequest> = std::mem::take(&mut *self.queue.lock());
            if batch.is_empty() {
                return Ok(());
            }
            self.run_batch(batch)?;
        }
    }
    fn run_batch(&self, batch: Vec<EditRequest>) -> Result<(), ChangeError> {
        let started = Instant::now();
        let (infos, history, instructions) = {
            let mut tracker = self.tracker.lock();
            let infos = info::optimize(tracker.process_requests(batch)?);
            let history = tracker.history_state();
            let dirty = dirty::gather(tracker.document(), &infos);
            // Mark every changed surface *before* any instruction goes out:
            // take the write lock, bump, release. A renderer that receives an
            // instruction and takes a read lock is then guaranteed to see the
            // post-batch revision, never a torn intermediate.
            for layer in dirty.layers.keys() {
                if let Some(handle) = tracker.document().raster(*layer) {
                    handle.write().bump_revision();
                }
            }
            let viewports = self.viewports.read();
            let instructions: Vec<RenderInstruction> = viewports
                .iter()
                .filter_map(|(id, viewport)| {
                    let chunks = dirty.global.clip_to(viewport.visible_chunks());
                    (!chunks.is_empty()).then(|| RenderInstruction {
                        viewport: *id,
                        resolution: viewport.preferred_resolution(),
                        chunks,
                    })
                })
                .collect();
            (infos, history, instructions)
        };
        let output = BatchOutput {
            infos,
            instructions,
            history,
            busy: started.elapsed() >= self.busy_timeout,
        };
        self.subscribers
            .lock()
            .retain(|sender| sender.send(output.clone()).is_ok());
        Ok(())
    }
}
