//! Worker pool that runs one batch of transforms per `submit`
//!
//! Exactly one long-lived thread per batch slot. All pool-wide control
//! state sits behind a single mutex with two condition variables: one that
//! wakes workers when a batch is submitted and one that wakes the controller
//! when workers report in. Everything else a worker touches (its staging
//! slot, its output slot, its plan) belongs to that worker alone.

use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use num_complex::Complex;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error, warn};

use super::buffer::SlotBuffer;
use crate::error::{Result, SpectrumError, UNKNOWN_API_STATUS};
use crate::spectrum::config::FrameLayout;
use crate::spectrum::windowing::prepare_frame;
use crate::spectrum::windows::WindowTable;
use crate::transform::{plan_lock, TransformBackend};

/// Staging and output storage handed to the pool at start-up
pub struct BatchBuffers {
    /// `batch_count × padded_frame_size` samples, zeroed
    pub staging: SlotBuffer<f32>,

    /// `batch_count × (bin_count + 1)` bins, zeroed
    pub output: SlotBuffer<Complex<f32>>,
}

impl BatchBuffers {
    pub fn allocate(layout: &FrameLayout) -> Result<Self> {
        Ok(Self {
            staging: SlotBuffer::new("input staging buffer", layout.batch_count, layout.padded_frame_size, 0.0)?,
            output: SlotBuffer::new(
                "output buffer",
                layout.batch_count,
                layout.output_slot_len(),
                Complex::new(0.0, 0.0),
            )?,
        })
    }
}

/// Borrowed samples of the batch currently being processed
///
/// Only valid while `submit` is blocked waiting for the workers.
#[derive(Clone, Copy)]
enum SubmittedBatch {
    /// One slice per slot
    Frames { frames: NonNull<&'static [i16]>, len: usize },

    /// `batch_count × frame_size` contiguous samples
    Flat { samples: NonNull<i16>, len: usize },
}

// The pointee outlives every use: `submit` does not return until all
// workers are done with it.
unsafe impl Send for SubmittedBatch {}

impl SubmittedBatch {
    fn frames(frames: &[&[i16]]) -> Self {
        SubmittedBatch::Frames {
            frames: NonNull::from(frames).cast(),
            len: frames.len(),
        }
    }

    fn flat(samples: &[i16]) -> Self {
        SubmittedBatch::Flat {
            samples: NonNull::from(samples).cast(),
            len: samples.len(),
        }
    }

    /// # Safety
    /// The batch must still be the one `submit` is waiting on.
    unsafe fn frame<'a>(&self, slot: usize, frame_size: usize) -> &'a [i16] {
        match *self {
            SubmittedBatch::Frames { frames, len } => {
                debug_assert!(slot < len);
                *frames.as_ptr().add(slot)
            }
            SubmittedBatch::Flat { samples, len } => {
                debug_assert!((slot + 1) * frame_size <= len);
                std::slice::from_raw_parts(samples.as_ptr().add(slot * frame_size), frame_size)
            }
        }
    }
}

struct Control {
    /// Present only while a batch is in flight
    batch: Option<SubmittedBatch>,

    /// Bumped on every submit so a worker never runs the same batch twice
    generation: u64,

    /// Workers that finished start-up
    ready: usize,

    /// Workers that finished the current batch
    completed: usize,

    /// First failure reported for the current batch
    failure: Option<SpectrumError>,

    shutdown: bool,
}

struct Shared {
    control: Mutex<Control>,
    work_ready: Condvar,
    batch_done: Condvar,
    staging: SlotBuffer<f32>,
    output: SlotBuffer<Complex<f32>>,
    window: WindowTable,
}

/// Fixed pool of slot-bound transform workers
pub struct BatchCoordinator<B: TransformBackend> {
    shared: Arc<Shared>,
    backend: Arc<B>,
    workers: Vec<JoinHandle<Option<B::Plan>>>,
    layout: FrameLayout,
}

impl<B: TransformBackend> std::fmt::Debug for BatchCoordinator<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("backend", &self.backend.name())
            .field("workers", &self.workers.len())
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl<B: TransformBackend> BatchCoordinator<B> {
    /// Create the plans, spawn one worker per slot and wait until every
    /// worker is parked and ready
    ///
    /// Any failure tears down whatever was already started; there is never
    /// a partial pool.
    pub fn start(backend: Arc<B>, layout: FrameLayout, window: WindowTable, buffers: BatchBuffers) -> Result<Self> {
        backend.open().map_err(|err| {
            error!("backend '{}' failed to open: {}", backend.name(), err);
            match err {
                SpectrumError::TransportCreate { .. } => err,
                other => SpectrumError::TransportCreate {
                    backend: backend.name(),
                    code: other.api_status(),
                },
            }
        })?;

        let plans = {
            let _guard = plan_lock();
            let mut plans = Vec::with_capacity(layout.batch_count);
            for _ in 0..layout.batch_count {
                plans.push(backend.create_plan(layout.padded_frame_size)?);
            }
            plans
        };

        if let Ok(parallelism) = thread::available_parallelism() {
            if layout.batch_count > parallelism.get() {
                warn!(
                    "batch count {} exceeds available parallelism {}; workers will time-share cores",
                    layout.batch_count, parallelism
                );
            }
        }

        let shared = Arc::new(Shared {
            control: Mutex::new(Control {
                batch: None,
                generation: 0,
                ready: 0,
                completed: 0,
                failure: None,
                shutdown: false,
            }),
            work_ready: Condvar::new(),
            batch_done: Condvar::new(),
            staging: buffers.staging,
            output: buffers.output,
            window,
        });

        let mut coordinator = Self {
            shared,
            backend,
            workers: Vec::with_capacity(layout.batch_count),
            layout,
        };

        let mut plans = plans.into_iter();
        for slot in 0..layout.batch_count {
            let Some(plan) = plans.next() else {
                break;
            };
            let shared = Arc::clone(&coordinator.shared);
            let backend = Arc::clone(&coordinator.backend);

            // The plan stays reachable from here until the worker takes it,
            // so a failed spawn still releases it under the plan lock.
            let handoff = Arc::new(Mutex::new(Some(plan)));
            let worker_handoff = Arc::clone(&handoff);

            let spawned = thread::Builder::new()
                .name(format!("spectrum-worker-{}", slot))
                .spawn(move || {
                    let plan = worker_handoff.lock().take();
                    plan.map(|plan| worker_loop(slot, shared, backend, plan))
                });

            match spawned {
                Ok(handle) => coordinator.workers.push(handle),
                Err(e) => {
                    error!("failed to spawn worker for slot {}: {}", slot, e);
                    drop(coordinator);
                    let _guard = plan_lock();
                    drop(handoff);
                    drop(plans);
                    return Err(SpectrumError::WorkerSpawn {
                        slot,
                        reason: e.to_string(),
                    });
                }
            }
        }

        {
            let mut control = coordinator.shared.control.lock();
            while control.ready < coordinator.workers.len() {
                coordinator.shared.batch_done.wait(&mut control);
            }
        }

        debug!(
            "started {} workers on '{}' (transform length {})",
            coordinator.workers.len(),
            coordinator.backend.name(),
            layout.padded_frame_size
        );

        Ok(coordinator)
    }

    /// Run one batch and block until every slot is transformed
    ///
    /// `frames` must hold exactly `batch_count` frames of exactly
    /// `frame_size` samples. On `Ok`, the output buffer holds the complete
    /// result of this batch.
    pub fn submit(&mut self, frames: &[&[i16]]) -> Result<()> {
        if frames.len() != self.layout.batch_count {
            return Err(SpectrumError::BatchLength {
                expected: self.layout.batch_count,
                found: frames.len(),
            });
        }
        if let Some(frame) = frames.iter().find(|f| f.len() != self.layout.frame_size) {
            return Err(SpectrumError::FrameLength {
                expected: self.layout.frame_size,
                found: frame.len(),
            });
        }

        self.dispatch(SubmittedBatch::frames(frames))
    }

    /// [`submit`](Self::submit) for one contiguous buffer
    ///
    /// Slot `k` reads `samples[k * frame_size..(k + 1) * frame_size]`.
    pub fn submit_flat(&mut self, samples: &[i16]) -> Result<()> {
        let expected = self.layout.batch_count * self.layout.frame_size;
        if samples.len() != expected {
            return Err(SpectrumError::FrameLength {
                expected,
                found: samples.len(),
            });
        }

        self.dispatch(SubmittedBatch::flat(samples))
    }

    fn dispatch(&mut self, batch: SubmittedBatch) -> Result<()> {
        let shared = &*self.shared;
        let mut control = shared.control.lock();

        control.batch = Some(batch);
        control.generation = control.generation.wrapping_add(1);
        control.completed = 0;
        control.failure = None;
        shared.work_ready.notify_all();

        // Re-check after every wake; one signal does not mean one worker
        while control.completed < self.workers.len() {
            shared.batch_done.wait(&mut control);
        }

        control.batch = None;
        match control.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Transform output of the last batch, `batch_count × (bin_count + 1)` bins
    pub fn output(&self) -> &[Complex<f32>] {
        // SAFETY: workers only touch the buffers inside `submit`, which
        // needs `&mut self`.
        unsafe { self.shared.output.as_slice() }
    }

    /// Windowed, zero-padded transform input of the last batch
    pub fn staging(&self) -> &[f32] {
        // SAFETY: as for `output`.
        unsafe { self.shared.staging.as_slice() }
    }

    pub fn window(&self) -> &WindowTable {
        &self.shared.window
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Stop and join every worker, then destroy the plans
    fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        self.shared.control.lock().shutdown = true;
        self.shared.work_ready.notify_all();

        let mut plans = Vec::with_capacity(self.workers.len());
        for handle in self.workers.drain(..) {
            match handle.join() {
                Ok(plan) => plans.extend(plan),
                Err(_) => warn!("spectrum worker exited by panic"),
            }
        }

        let _guard = plan_lock();
        drop(plans);
        debug!("worker pool stopped");
    }
}

impl<B: TransformBackend> Drop for BatchCoordinator<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<B: TransformBackend>(slot: usize, shared: Arc<Shared>, backend: Arc<B>, mut plan: B::Plan) -> B::Plan {
    let frame_size = shared.window.len();
    let mut seen = 0u64;

    let mut control = shared.control.lock();
    control.ready += 1;
    shared.batch_done.notify_one();

    loop {
        // Only a batch this worker has not run yet, or shutdown, ends the wait
        while !control.shutdown && (control.batch.is_none() || control.generation == seen) {
            shared.work_ready.wait(&mut control);
        }
        if control.shutdown {
            break;
        }
        let Some(batch) = control.batch else {
            continue;
        };
        seen = control.generation;

        let result = MutexGuard::unlocked(&mut control, || {
            panic::catch_unwind(AssertUnwindSafe(|| {
                // SAFETY: slot `slot` of each buffer is touched by this
                // worker only, and `submit` is blocked until we report back.
                let frame = unsafe { batch.frame(slot, frame_size) };
                let input = unsafe { shared.staging.slot_mut(slot) };
                let output = unsafe { shared.output.slot_mut(slot) };

                prepare_frame(frame, shared.window.values(), &mut input[..frame_size]);
                backend.run(&mut plan, input, output)
            }))
            .unwrap_or_else(|_| {
                Err(SpectrumError::Backend {
                    backend: backend.name(),
                    code: UNKNOWN_API_STATUS,
                })
            })
        });

        if let Err(err) = result {
            if control.failure.is_none() {
                control.failure = Some(err);
            }
        }

        control.completed += 1;
        shared.batch_done.notify_one();
    }

    drop(control);
    debug!("spectrum worker {} exiting", slot);
    plan
}
